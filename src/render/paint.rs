//! Conversions between decoded pixel buffers / geometry and `vello_cpu` paint
//! types.

use std::sync::Arc;

use kurbo::Shape;

use crate::foundation::error::{VideogenError, VideogenResult};

pub(crate) fn pixmap_from_premul_bytes(
    bytes: &[u8],
    width: u32,
    height: u32,
) -> VideogenResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| VideogenError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| VideogenError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(VideogenError::render("pixmap byte len mismatch"));
    }
    // Pixmap stores PremulRgba8; our bytes are already premultiplied.
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels, w, h, true,
    ))
}

pub(crate) fn rgba_premul_to_image(
    bytes_premul: &[u8],
    width: u32,
    height: u32,
) -> VideogenResult<vello_cpu::Image> {
    let pixmap = pixmap_from_premul_bytes(bytes_premul, width, height)?;
    Ok(vello_cpu::Image {
        image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
        sampler: vello_cpu::peniko::ImageSampler::default(),
    })
}

pub(crate) fn rgba_straight_to_image_premul(
    bytes_rgba: &[u8],
    width: u32,
    height: u32,
) -> VideogenResult<vello_cpu::Image> {
    let mut tmp = bytes_rgba.to_vec();
    crate::assets::decode::premultiply_rgba8_in_place(&mut tmp);
    rgba_premul_to_image(&tmp, width, height)
}

pub(crate) fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

/// Flatten an axis-aligned ellipse into a `vello_cpu` fill path.
pub(crate) fn ellipse_path(cx: f64, cy: f64, rx: f64, ry: f64) -> vello_cpu::kurbo::BezPath {
    let ell = kurbo::Ellipse::new((cx, cy), (rx, ry), 0.0);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for el in ell.path_elements(0.1) {
        match el {
            kurbo::PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            kurbo::PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            kurbo::PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            kurbo::PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            kurbo::PathEl::ClosePath => out.close_path(),
        }
    }
    // kurbo's flattened ellipse ends on its last segment without a close.
    if !matches!(
        out.elements().last(),
        Some(vello_cpu::kurbo::PathEl::ClosePath)
    ) {
        out.close_path();
    }
    out
}
