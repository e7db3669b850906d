use std::path::Path;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use blink_verify::cli::{handle_config_action, list_cameras, Args, Command, RunArgs};
use blink_verify::config::Config;
use blink_verify::session::{
    CameraSession, ConsoleUi, IntervalScheduler, Outcome, ResultNavigator, Session,
    SessionController, SessionState, SystemClock, VerificationClient,
};

/// Exit code when the session is torn down before an outcome (SIGINT convention).
const EXIT_TORN_DOWN: i32 = 130;

/// Exit code for bad arguments or configuration.
const EXIT_USAGE: i32 = 2;

fn init_logging() {
    // RUST_LOG wins over the info default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    // .env is optional; existing environment variables take precedence
    let _ = dotenv::dotenv();
    init_logging();

    let args = Args::parse();

    match args.command {
        Some(Command::ListCameras) => list_cameras(),
        Some(Command::Config { action }) => handle_config_action(action, args.config.as_deref()),
        Some(Command::Run(run)) => std::process::exit(run_session(&run, args.config.as_deref())),
        None => std::process::exit(run_session(&args.run, args.config.as_deref())),
    }
}

/// Resolve settings: CLI args > environment > config file > built-in defaults.
fn load_config(run: &RunArgs, path: Option<&Path>) -> Result<Config, String> {
    let mut config = Config::load(path).map_err(|e| e.to_string())?;
    config.apply_env().map_err(|e| e.to_string())?;
    run.apply_to(&mut config);
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn run_session(run: &RunArgs, config_path: Option<&Path>) -> i32 {
    let config = match load_config(run, config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };
    let credentials = match run.credentials() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };
    let client = match VerificationClient::with_timeout(&config.endpoint.url, config.request_timeout())
    {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };
    let navigator = match ResultNavigator::new(&config.endpoint.result_url) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_USAGE;
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create async runtime: {}", e);
            return 1;
        }
    };

    let policy = config.policy();
    log::info!(
        "Verifying {} against {}",
        credentials.identity(),
        client.endpoint()
    );
    let mut session = Session::new(CameraSession::new(), credentials, policy);

    let teardown = CancellationToken::new();
    let handler_token = teardown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, releasing camera...");
        handler_token.cancel();
    }) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let (state, destination) = rt.block_on(async {
        let mut controller = SessionController::new(
            &mut session,
            client,
            IntervalScheduler::new(policy.frame_interval),
            SystemClock,
            ConsoleUi::new(),
            navigator,
        )
        .with_constraints(config.constraints())
        .with_teardown(teardown);

        let state = controller.run().await;
        (state, controller.navigator().destination().cloned())
    });

    if let Some(url) = destination {
        println!("{}", url);
    }

    match state {
        SessionState::Terminated(Outcome::Verified) => 0,
        SessionState::TornDown => EXIT_TORN_DOWN,
        _ => 1,
    }
}
