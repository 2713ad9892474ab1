//! Still image encoding.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::{ExtendedColorType, ImageFormat};
use tracing::debug;

use camera_ipc::StillFormat;

use crate::{EncoderError, EncoderResult};

fn image_format(format: StillFormat) -> ImageFormat {
    match format {
        StillFormat::Png => ImageFormat::Png,
        StillFormat::Bmp => ImageFormat::Bmp,
    }
}

/// Encode a packed RGB buffer into an in-memory image file.
pub fn encode_still(
    rgb: &[u8],
    width: u32,
    height: u32,
    format: StillFormat,
) -> EncoderResult<Vec<u8>> {
    let expected = width as usize * height as usize * 3;
    if width == 0 || height == 0 || rgb.len() != expected {
        return Err(EncoderError::InvalidInput(format!(
            "{}x{} RGB image needs {} bytes, got {}",
            width,
            height,
            expected,
            rgb.len()
        )));
    }

    let mut encoded = Vec::new();
    image::write_buffer_with_format(
        &mut Cursor::new(&mut encoded),
        rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
        image_format(format),
    )?;
    Ok(encoded)
}

/// Encode a packed RGB buffer and write it to `path`.
///
/// Nothing is written unless encoding succeeds.
pub fn save_still(
    path: &Path,
    rgb: &[u8],
    width: u32,
    height: u32,
    format: StillFormat,
) -> EncoderResult<()> {
    let encoded = encode_still(rgb, width, height, format)?;
    fs::write(path, &encoded)?;
    debug!(path = %path.display(), bytes = encoded.len(), "Still written");
    Ok(())
}
