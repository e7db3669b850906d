//! Frame conversion and encoding utilities.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::error::{ParameterError, ParameterErrorKind};
use image::{ExtendedColorType, ImageEncoder, ImageError};
use nokhwa::pixel_format::RgbFormat;
use std::time::Instant;

use super::types::Frame;

/// MIME prefix of the data URLs sent to the verification endpoint.
const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Convert a nokhwa buffer to an RGB [`Frame`].
///
/// nokhwa decodes whatever the device delivers (MJPEG, YUYV, NV12, ...).
/// Returns `None` on unsupported or corrupt data.
pub fn convert_to_rgb(buffer: &nokhwa::Buffer) -> Option<Frame> {
    let decoded = buffer.decode_image::<RgbFormat>().ok()?;
    let resolution = buffer.resolution();

    Some(Frame {
        data: decoded.into_raw(),
        width: resolution.width(),
        height: resolution.height(),
        timestamp: Instant::now(),
    })
}

/// Mirror a frame horizontally (flip left-right) for selfie mode.
pub fn mirror_horizontal(frame: &mut Frame) {
    let width = frame.width as usize;
    let bpp = Frame::BYTES_PER_PIXEL;
    if width == 0 {
        return;
    }

    for row in frame.data.chunks_exact_mut(width * bpp) {
        for x in 0..width / 2 {
            let left = x * bpp;
            let right = (width - 1 - x) * bpp;
            for i in 0..bpp {
                row.swap(left + i, right + i);
            }
        }
    }
}

/// Encode a frame as a `data:image/jpeg;base64,...` URL.
///
/// `quality` is the JPEG quality in 1..=100.
pub fn encode_data_url(frame: &Frame, quality: u8) -> Result<String, ImageError> {
    let expected = frame.width as usize * frame.height as usize * Frame::BYTES_PER_PIXEL;
    if expected == 0 || frame.data.len() != expected {
        return Err(ImageError::Parameter(ParameterError::from_kind(
            ParameterErrorKind::DimensionMismatch,
        )));
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality).write_image(
        &frame.data,
        frame.width,
        frame.height,
        ExtendedColorType::Rgb8,
    )?;

    let mut url = String::with_capacity(JPEG_DATA_URL_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
    url.push_str(JPEG_DATA_URL_PREFIX);
    base64::engine::general_purpose::STANDARD.encode_string(&jpeg, &mut url);
    Ok(url)
}
