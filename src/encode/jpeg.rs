use anyhow::Context;

use crate::foundation::error::{VideogenError, VideogenResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::frame::FrameRGBA;

/// JPEG quality used for uploaded frames.
const JPEG_QUALITY: u8 = 95;

/// Flatten premultiplied RGBA8 over an opaque background color into RGB8.
pub(crate) fn flatten_premul_to_rgb8(data: &[u8], bg: [u8; 3]) -> VideogenResult<Vec<u8>> {
    if !data.len().is_multiple_of(4) {
        return Err(VideogenError::render(
            "frame byte length is not a whole number of RGBA pixels",
        ));
    }
    let mut out = Vec::with_capacity(data.len() / 4 * 3);
    for px in data.chunks_exact(4) {
        let inv_a = 255 - px[3];
        out.push(px[0].saturating_add(mul_div255_u8(bg[0], inv_a)));
        out.push(px[1].saturating_add(mul_div255_u8(bg[1], inv_a)));
        out.push(px[2].saturating_add(mul_div255_u8(bg[2], inv_a)));
    }
    Ok(out)
}

/// Encode a rendered frame as a `data:image/jpeg;base64,` payload.
///
/// Transparent regions flatten over black, matching what a canvas export
/// produces, and the payload shape is exactly what the upload endpoint strips.
pub fn encode_frame_data_uri(frame: &FrameRGBA) -> VideogenResult<String> {
    if frame.data.len() != frame.expected_len() {
        return Err(VideogenError::render(format!(
            "frame buffer is {} bytes, expected {}",
            frame.data.len(),
            frame.expected_len()
        )));
    }

    let rgb = flatten_premul_to_rgb8(&frame.data, [0, 0, 0])?;

    let mut jpeg = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut jpeg);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    image::ImageEncoder::write_image(
        encoder,
        &rgb,
        frame.width,
        frame.height,
        image::ExtendedColorType::Rgb8,
    )
    .context("encode frame jpeg")?;

    Ok(format!("data:image/jpeg;base64,{}", base64::encode(&jpeg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(w: u32, h: u32, px: [u8; 4]) -> FrameRGBA {
        FrameRGBA {
            width: w,
            height: h,
            data: px.repeat((w * h) as usize),
        }
    }

    #[test]
    fn flatten_keeps_opaque_pixels() {
        let rgb = flatten_premul_to_rgb8(&[10, 20, 30, 255], [255, 255, 255]).unwrap();
        assert_eq!(rgb, vec![10, 20, 30]);
    }

    #[test]
    fn flatten_fills_transparent_pixels_with_background() {
        let rgb = flatten_premul_to_rgb8(&[0, 0, 0, 0], [7, 8, 9]).unwrap();
        assert_eq!(rgb, vec![7, 8, 9]);
    }

    #[test]
    fn flatten_rejects_ragged_buffers() {
        assert!(flatten_premul_to_rgb8(&[1, 2, 3], [0, 0, 0]).is_err());
    }

    #[test]
    fn data_uri_has_jpeg_prefix_and_decodes() {
        let frame = solid_frame(8, 4, [255, 0, 0, 255]);
        let uri = encode_frame_data_uri(&frame).unwrap();
        assert!(uri.starts_with("data:image/jpeg;base64,"));

        let b64 = &uri["data:image/jpeg;base64,".len()..];
        let jpeg = base64::decode(b64).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let mut frame = solid_frame(8, 4, [255, 0, 0, 255]);
        frame.data.truncate(16);
        assert!(encode_frame_data_uri(&frame).is_err());
    }
}
