use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::VideogenResult;
use crate::foundation::math::mul_div255_u16;

/// Decoded raster image in premultiplied RGBA8.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Pixel width.
    pub width: u32,
    /// Pixel height.
    pub height: u32,
    /// Premultiplied RGBA8 pixel data, row-major.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode encoded image bytes and convert to premultiplied RGBA8.
pub fn decode_image(bytes: &[u8]) -> VideogenResult<PreparedImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(rgba8_premul),
    })
}

pub(crate) fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[0] = 0;
            px[1] = 0;
            px[2] = 0;
            continue;
        }
        px[0] = mul_div255_u16(px[0] as u16, a) as u8;
        px[1] = mul_div255_u16(px[1] as u16, a) as u8;
        px[2] = mul_div255_u16(px[2] as u16, a) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_zero_alpha_clears_color() {
        let mut px = [200, 100, 50, 0];
        premultiply_rgba8_in_place(&mut px);
        assert_eq!(px, [0, 0, 0, 0]);
    }

    #[test]
    fn premultiply_half_alpha_scales_color() {
        let mut px = [200, 100, 50, 128];
        premultiply_rgba8_in_place(&mut px);
        assert_eq!(px[3], 128);
        assert_eq!(px[0], ((200u16 * 128 + 127) / 255) as u8);
    }

    #[test]
    fn decodes_a_png() {
        // 2x1 opaque red PNG built with the image crate itself.
        let img = image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 0, 0, 255]));
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();

        let prepared = decode_image(&bytes).unwrap();
        assert_eq!((prepared.width, prepared.height), (2, 1));
        assert_eq!(&prepared.rgba8_premul[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn garbage_bytes_fail() {
        assert!(decode_image(b"not an image").is_err());
    }
}
