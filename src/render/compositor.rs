use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::store::{TextBrushRgba8, TextLayoutEngine};
use crate::foundation::error::{VideogenError, VideogenResult};
use crate::lyrics::{LyricLine, active_line};
use crate::render::background::BackgroundFrame;
use crate::render::color::hsla_to_rgba8;
use crate::render::frame::FrameRGBA;
use crate::render::paint::{affine_to_cpu, ellipse_path, rgba_premul_to_image};
use crate::spectrum::BarSet;

/// Disc column center.
const DISC_CX: f64 = 320.0;
const DISC_CY: f64 = RenderGeometry::LOGICAL_HEIGHT / 2.0;
const DISC_RADIUS: f64 = 200.0;
/// Bars start just outside the disc edge.
const BAR_BASE_RADIUS: f64 = DISC_RADIUS + 2.0;
const BAR_HALF_WIDTH: f64 = 0.75;
/// The spinning cover art circle inside the disc.
const COVER_RADIUS: f64 = DISC_RADIUS * 0.65;
/// Cover rotation speed in radians per second.
const COVER_SPIN_RATE: f64 = 0.4;

/// Left edge of the lyric column.
const LYRIC_X: f64 = 700.0;
/// Vertical distance between adjacent lyric lines.
const LYRIC_LINE_STEP: f64 = 65.0;
/// Lines drawn on each side of the current one.
const LYRIC_WINDOW: i64 = 4;

/// Canvas geometry: a fixed 1280x720 logical coordinate space rendered at a
/// caller-chosen scale.
///
/// The offline pipeline renders at 1.5x (1920x1080); the preview renders at
/// whatever scale its surface calls for. All drawing happens in logical
/// coordinates, so every scale produces the same picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderGeometry {
    scale: f64,
}

impl RenderGeometry {
    /// Logical canvas width.
    pub const LOGICAL_WIDTH: f64 = 1280.0;
    /// Logical canvas height.
    pub const LOGICAL_HEIGHT: f64 = 720.0;

    /// Geometry at a validated scale factor.
    pub fn new(scale: f64) -> VideogenResult<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(VideogenError::validation(
                "render scale must be finite and > 0",
            ));
        }
        let w = (Self::LOGICAL_WIDTH * scale).round();
        let h = (Self::LOGICAL_HEIGHT * scale).round();
        if w < 1.0 || h < 1.0 || w > f64::from(u16::MAX) || h > f64::from(u16::MAX) {
            return Err(VideogenError::validation(format!(
                "render scale {scale} produces an unsupported canvas size"
            )));
        }
        Ok(Self { scale })
    }

    /// The 1920x1080 geometry used for offline renders.
    pub fn offline() -> Self {
        Self { scale: 1.5 }
    }

    /// 1:1 logical-to-physical geometry.
    pub fn preview() -> Self {
        Self { scale: 1.0 }
    }

    /// Scale factor from logical to physical pixels.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Output width in physical pixels.
    pub fn physical_width(&self) -> u16 {
        (Self::LOGICAL_WIDTH * self.scale).round() as u16
    }

    /// Output height in physical pixels.
    pub fn physical_height(&self) -> u16 {
        (Self::LOGICAL_HEIGHT * self.scale).round() as u16
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct TextKey {
    text: String,
    size_px: u32,
    weight: u16,
}

struct FontAsset {
    bytes: Vec<u8>,
    data: vello_cpu::peniko::FontData,
}

/// Draws complete frames: background, bar ring, disc, lyrics, captions.
///
/// One compositor serves one geometry. Both render modes drive the same
/// `draw_frame`, which is what makes the offline output match the preview.
pub struct Compositor {
    geometry: RenderGeometry,
    ctx: Option<vello_cpu::RenderContext>,
    text_engine: TextLayoutEngine,
    font: Option<FontAsset>,
    layouts: HashMap<TextKey, Arc<parley::Layout<TextBrushRgba8>>>,
    disc_gradient: Option<(vello_cpu::Image, u32)>,
}

impl Compositor {
    /// Create a compositor for the given geometry.
    pub fn new(geometry: RenderGeometry) -> Self {
        Self {
            geometry,
            ctx: None,
            text_engine: TextLayoutEngine::new(),
            font: None,
            layouts: HashMap::new(),
            disc_gradient: None,
        }
    }

    /// The compositor's geometry.
    pub fn geometry(&self) -> RenderGeometry {
        self.geometry
    }

    /// Supply the font used for lyrics and captions.
    ///
    /// Without a font all text layers are skipped; the rest of the frame still
    /// renders.
    pub fn set_font(&mut self, font_bytes: Vec<u8>) {
        let data = vello_cpu::peniko::FontData::new(
            vello_cpu::peniko::Blob::from(font_bytes.clone()),
            0,
        );
        self.font = Some(FontAsset {
            bytes: font_bytes,
            data,
        });
        self.layouts.clear();
    }

    /// Render one frame at playback time `t` seconds.
    pub fn draw_frame(
        &mut self,
        t: f64,
        bars: &BarSet,
        background: Option<&BackgroundFrame>,
        lyrics: &[LyricLine],
        name: &str,
        artist: &str,
    ) -> VideogenResult<FrameRGBA> {
        let w = self.geometry.physical_width();
        let h = self.geometry.physical_height();
        let mut ctx = match self.ctx.take() {
            Some(c) if c.width() == w && c.height() == h => c,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();

        ctx.set_blend_mode(vello_cpu::peniko::BlendMode::default());
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let world = kurbo::Affine::scale(self.geometry.scale);

        self.draw_background(&mut ctx, world, t, background);
        self.draw_bar_ring(&mut ctx, world, bars);
        self.draw_disc(&mut ctx, world, t, background)?;

        if self.font.is_some() {
            self.draw_lyric_window(&mut ctx, world, t, lyrics)?;
            self.draw_captions(&mut ctx, world, name, artist)?;
        }

        ctx.flush();
        let mut pixmap = vello_cpu::Pixmap::new(w, h);
        ctx.render_to_pixmap(&mut pixmap);
        let data = pixmap.data_as_u8_slice().to_vec();
        self.ctx = Some(ctx);

        Ok(FrameRGBA {
            width: u32::from(w),
            height: u32::from(h),
            data,
        })
    }

    fn draw_background(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: kurbo::Affine,
        t: f64,
        background: Option<&BackgroundFrame>,
    ) {
        let Some(bg) = background else {
            return;
        };
        let (mw, mh) = (f64::from(bg.width), f64::from(bg.height));
        if mw <= 0.0 || mh <= 0.0 {
            return;
        }

        // Cover-fit the logical canvas, with a slow breathing zoom for still
        // artwork only. Video backgrounds animate on their own.
        let base_ratio =
            (RenderGeometry::LOGICAL_WIDTH / mw).max(RenderGeometry::LOGICAL_HEIGHT / mh);
        let ratio = if bg.animated {
            base_ratio
        } else {
            base_ratio * still_zoom(t)
        };
        let bg_w = mw * ratio;
        let bg_h = mh * ratio;
        let bg_x = (RenderGeometry::LOGICAL_WIDTH - bg_w) / 2.0;
        let bg_y = (RenderGeometry::LOGICAL_HEIGHT - bg_h) / 2.0;

        let tr = world * kurbo::Affine::translate((bg_x, bg_y)) * kurbo::Affine::scale(ratio);
        ctx.set_transform(affine_to_cpu(tr));
        ctx.set_paint(bg.paint.clone());
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, mw, mh));
    }

    fn draw_bar_ring(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: kurbo::Affine,
        bars: &BarSet,
    ) {
        let center = kurbo::Affine::translate((DISC_CX, DISC_CY));
        let count = bars.len();
        for (i, &bh) in bars.heights().iter().enumerate() {
            let angle =
                std::f64::consts::TAU * i as f64 / count as f64 - std::f64::consts::FRAC_PI_2;
            ctx.set_transform(affine_to_cpu(world * center * kurbo::Affine::rotate(angle)));

            let hue = i as f64 / count as f64 * 360.0;
            let c = hsla_to_rgba8(hue, 1.0, 0.65, 0.9);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(c[0], c[1], c[2], c[3]));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                -BAR_HALF_WIDTH,
                -(BAR_BASE_RADIUS + f64::from(bh)),
                BAR_HALF_WIDTH,
                -BAR_BASE_RADIUS,
            ));
        }
    }

    fn draw_disc(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: kurbo::Affine,
        t: f64,
        background: Option<&BackgroundFrame>,
    ) -> VideogenResult<()> {
        let center = kurbo::Affine::translate((DISC_CX, DISC_CY));

        // Faint rim: an underfill two units wider than the disc; the opaque
        // disc fill covers its inner half, leaving a thin ring.
        ctx.set_transform(affine_to_cpu(world * center));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 26));
        ctx.fill_path(&ellipse_path(
            0.0,
            0.0,
            DISC_RADIUS + 2.0,
            DISC_RADIUS + 2.0,
        ));

        // Disc body: radial gradient from #1a1a1a inside half radius out to
        // #111 at the edge.
        let (grad, side) = self.disc_gradient_paint()?;
        let side_f = f64::from(side);
        let tr = world
            * kurbo::Affine::translate((DISC_CX - DISC_RADIUS, DISC_CY - DISC_RADIUS))
            * kurbo::Affine::scale(DISC_RADIUS * 2.0 / side_f);
        ctx.set_transform(affine_to_cpu(tr));
        ctx.set_paint(grad);
        ctx.fill_path(&ellipse_path(
            side_f / 2.0,
            side_f / 2.0,
            side_f / 2.0,
            side_f / 2.0,
        ));

        // Spinning cover: the background artwork stretched into a circle.
        if let Some(bg) = background {
            let (mw, mh) = (f64::from(bg.width), f64::from(bg.height));
            if mw > 0.0 && mh > 0.0 {
                let tr = world
                    * center
                    * kurbo::Affine::rotate(t * COVER_SPIN_RATE)
                    * kurbo::Affine::translate((-COVER_RADIUS, -COVER_RADIUS))
                    * kurbo::Affine::scale_non_uniform(
                        COVER_RADIUS * 2.0 / mw,
                        COVER_RADIUS * 2.0 / mh,
                    );
                ctx.set_transform(affine_to_cpu(tr));
                ctx.set_paint(bg.paint.clone());
                ctx.fill_path(&ellipse_path(mw / 2.0, mh / 2.0, mw / 2.0, mh / 2.0));
            }
        }

        Ok(())
    }

    fn draw_lyric_window(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: kurbo::Affine,
        t: f64,
        lyrics: &[LyricLine],
    ) -> VideogenResult<()> {
        let active = active_line(lyrics, t).map(|i| i as i64).unwrap_or(-1);
        for offset in -LYRIC_WINDOW..=LYRIC_WINDOW {
            let idx = active + offset;
            if idx < 0 || idx as usize >= lyrics.len() {
                continue;
            }
            let text = &lyrics[idx as usize].text;
            let is_current = offset == 0;
            let y = DISC_CY + offset as f64 * LYRIC_LINE_STEP;
            let (size_px, weight) = if is_current { (36.0, 700.0) } else { (26.0, 600.0) };
            let color = if is_current {
                [255, 255, 255, 255]
            } else {
                [255, 255, 255, 217]
            };
            let shadow = if is_current { 2.0 } else { 1.0 };

            self.draw_text_run(
                ctx,
                world,
                text,
                size_px,
                weight,
                [0, 0, 0, 230],
                LYRIC_X + shadow,
                y + shadow,
                false,
            )?;
            self.draw_text_run(ctx, world, text, size_px, weight, color, LYRIC_X, y, false)?;
        }
        Ok(())
    }

    fn draw_captions(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: kurbo::Affine,
        name: &str,
        artist: &str,
    ) -> VideogenResult<()> {
        let name_y = RenderGeometry::LOGICAL_HEIGHT - 50.0;
        let artist_y = RenderGeometry::LOGICAL_HEIGHT - 20.0;

        if !name.is_empty() {
            self.draw_text_run(
                ctx,
                world,
                name,
                26.0,
                700.0,
                [0, 0, 0, 230],
                DISC_CX + 1.0,
                name_y + 1.0,
                true,
            )?;
            self.draw_text_run(
                ctx,
                world,
                name,
                26.0,
                700.0,
                [255, 255, 255, 255],
                DISC_CX,
                name_y,
                true,
            )?;
        }
        if !artist.is_empty() {
            self.draw_text_run(
                ctx,
                world,
                artist,
                18.0,
                400.0,
                [0, 0, 0, 230],
                DISC_CX + 1.0,
                artist_y + 1.0,
                true,
            )?;
            self.draw_text_run(
                ctx,
                world,
                artist,
                18.0,
                400.0,
                [255, 255, 255, 230],
                DISC_CX,
                artist_y,
                true,
            )?;
        }
        Ok(())
    }

    /// Lay out (with caching) and paint one line of text. `y` is the vertical
    /// center of the line, matching the preview's middle text baseline.
    #[allow(clippy::too_many_arguments)]
    fn draw_text_run(
        &mut self,
        ctx: &mut vello_cpu::RenderContext,
        world: kurbo::Affine,
        text: &str,
        size_px: f32,
        weight: f32,
        color: [u8; 4],
        x: f64,
        y: f64,
        centered: bool,
    ) -> VideogenResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        let font = self
            .font
            .as_ref()
            .ok_or_else(|| VideogenError::render("text drawn without a font"))?;

        let key = TextKey {
            text: text.to_owned(),
            size_px: size_px as u32,
            weight: weight as u16,
        };
        let layout = match self.layouts.get(&key) {
            Some(l) => l.clone(),
            None => {
                let brush = TextBrushRgba8 {
                    r: 255,
                    g: 255,
                    b: 255,
                    a: 255,
                };
                let l = Arc::new(self.text_engine.layout_line(
                    text,
                    &font.bytes,
                    size_px,
                    weight,
                    brush,
                )?);
                self.layouts.insert(key, l.clone());
                l
            }
        };

        let tx = if centered {
            x - f64::from(layout.width()) / 2.0
        } else {
            x
        };
        let ty = y - f64::from(layout.height()) / 2.0;

        ctx.set_transform(affine_to_cpu(world * kurbo::Affine::translate((tx, ty))));
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color[0], color[1], color[2], color[3],
        ));
        for line in layout.lines() {
            for item in line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(&font.data)
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
        Ok(())
    }

    fn disc_gradient_paint(&mut self) -> VideogenResult<(vello_cpu::Image, u32)> {
        if let Some((img, side)) = &self.disc_gradient {
            return Ok((img.clone(), *side));
        }

        let side = ((DISC_RADIUS * 2.0 * self.geometry.scale).ceil() as u32).max(2);
        let c0 = [26u8, 26, 26]; // #1a1a1a
        let c1 = [34u8, 34, 34]; // #222
        let c2 = [17u8, 17, 17]; // #111

        let mut bytes = vec![0u8; side as usize * side as usize * 4];
        let center = (f64::from(side) - 1.0) / 2.0;
        let radius = f64::from(side) / 2.0;
        for py in 0..side {
            for px in 0..side {
                let dx = f64::from(px) - center;
                let dy = f64::from(py) - center;
                let d = (dx * dx + dy * dy).sqrt() / radius;
                let rgb = if d <= 0.5 {
                    c0
                } else if d <= 0.75 {
                    lerp_rgb(c0, c1, (d - 0.5) / 0.25)
                } else if d <= 1.0 {
                    lerp_rgb(c1, c2, (d - 0.75) / 0.25)
                } else {
                    c2
                };
                let i = (py as usize * side as usize + px as usize) * 4;
                bytes[i] = rgb[0];
                bytes[i + 1] = rgb[1];
                bytes[i + 2] = rgb[2];
                bytes[i + 3] = 255;
            }
        }

        let img = rgba_premul_to_image(&bytes, side, side)?;
        self.disc_gradient = Some((img.clone(), side));
        Ok((img, side))
    }
}

fn lerp_rgb(a: [u8; 3], b: [u8; 3], t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (f64::from(x) + (f64::from(y) - f64::from(x)) * t).round() as u8;
    [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
}

/// Breathing zoom for still backgrounds: a 40 s ease-in-out cycle between
/// 1.0x and 1.1x.
fn still_zoom(t: f64) -> f64 {
    let cycle = 20.0;
    let progress = (t % (cycle * 2.0)) / cycle;
    let ease = if progress < 1.0 { progress } else { 2.0 - progress };
    1.0 + ease * ease * (3.0 - 2.0 * ease) * 0.1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::map_bars;

    #[test]
    fn geometry_scales() {
        let g = RenderGeometry::offline();
        assert_eq!((g.physical_width(), g.physical_height()), (1920, 1080));
        let g = RenderGeometry::preview();
        assert_eq!((g.physical_width(), g.physical_height()), (1280, 720));
        assert!(RenderGeometry::new(0.0).is_err());
        assert!(RenderGeometry::new(-1.0).is_err());
        assert!(RenderGeometry::new(f64::NAN).is_err());
        assert!(RenderGeometry::new(100.0).is_err());
    }

    #[test]
    fn zoom_cycle_breathes_and_repeats() {
        assert!((still_zoom(0.0) - 1.0).abs() < 1e-12);
        assert!((still_zoom(20.0) - 1.1).abs() < 1e-12);
        assert!((still_zoom(40.0) - 1.0).abs() < 1e-12);
        assert!((still_zoom(5.0) - still_zoom(45.0)).abs() < 1e-12);
        // Monotonic rise over the first half-cycle.
        assert!(still_zoom(10.0) > still_zoom(5.0));
    }

    #[test]
    fn lerp_rgb_endpoints() {
        assert_eq!(lerp_rgb([0, 0, 0], [255, 255, 255], 0.0), [0, 0, 0]);
        assert_eq!(lerp_rgb([0, 0, 0], [255, 255, 255], 1.0), [255, 255, 255]);
        assert_eq!(lerp_rgb([0, 100, 200], [100, 0, 200], 0.5), [50, 50, 200]);
    }

    #[test]
    fn draws_a_frame_without_font_or_background() {
        let geometry = RenderGeometry::new(0.05).unwrap();
        let mut comp = Compositor::new(geometry);
        let bars = map_bars(&[0u8; 128]);
        let frame = comp
            .draw_frame(0.0, &bars, None, &[], "Song", "Artist")
            .unwrap();
        assert_eq!(frame.width, 64);
        assert_eq!(frame.height, 36);
        assert_eq!(frame.data.len(), frame.expected_len());
    }

    #[test]
    fn identical_inputs_render_identical_frames() {
        let geometry = RenderGeometry::new(0.05).unwrap();
        let mut a = Compositor::new(geometry);
        let mut b = Compositor::new(geometry);
        let bars = map_bars(&[200u8; 128]);
        let fa = a.draw_frame(1.5, &bars, None, &[], "", "").unwrap();
        let fb = b.draw_frame(1.5, &bars, None, &[], "", "").unwrap();
        assert_eq!(fa.data, fb.data);
    }

    #[test]
    fn disc_area_is_painted() {
        // At full preview scale the disc center pixel carries the gradient's
        // inner color, regardless of bars or background.
        let mut comp = Compositor::new(RenderGeometry::preview());
        let bars = map_bars(&[0u8; 128]);
        let frame = comp.draw_frame(0.0, &bars, None, &[], "", "").unwrap();
        let idx = ((DISC_CY as usize) * frame.width as usize + DISC_CX as usize) * 4;
        let px = &frame.data[idx..idx + 4];
        assert_eq!(px[3], 255);
        assert!(px[0] >= 20 && px[0] <= 40, "unexpected disc color {px:?}");
    }
}
