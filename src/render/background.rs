use tracing::warn;

use crate::assets::decode::decode_image;
use crate::assets::media::{self, VideoSourceInfo};
use crate::foundation::error::VideogenResult;
use crate::model::BackgroundSource;
use crate::render::paint::{rgba_premul_to_image, rgba_straight_to_image_premul};

/// One background image ready to paint: the full artwork for still sources,
/// the frame at the requested time for video sources.
#[derive(Clone)]
pub struct BackgroundFrame {
    pub(crate) paint: vello_cpu::Image,
    /// Source width in pixels.
    pub width: u32,
    /// Source height in pixels.
    pub height: u32,
    /// Whether the source animates on its own (disables the still-image zoom).
    pub animated: bool,
}

enum Media {
    None,
    Image(BackgroundFrame),
    Video {
        info: VideoSourceInfo,
        /// Millisecond-resolution key of the cached frame.
        cached_ms: Option<i64>,
        cached: Option<BackgroundFrame>,
    },
}

/// Prepared background media with per-frame lookup.
///
/// Still images decode once. Videos decode one frame per lookup, looping over
/// the source duration; a failed decode keeps showing the last good frame
/// rather than aborting the render.
pub struct BackgroundMedia {
    media: Media,
}

impl BackgroundMedia {
    /// Decode or probe the background source.
    pub fn prepare(source: &BackgroundSource) -> VideogenResult<Self> {
        let media = match source {
            BackgroundSource::None => Media::None,
            BackgroundSource::Image(bytes) => {
                let img = decode_image(bytes)?;
                let paint = rgba_premul_to_image(&img.rgba8_premul, img.width, img.height)?;
                Media::Image(BackgroundFrame {
                    paint,
                    width: img.width,
                    height: img.height,
                    animated: false,
                })
            }
            BackgroundSource::VideoFile(path) => {
                let info = media::probe_video(path)?;
                Media::Video {
                    info,
                    cached_ms: None,
                    cached: None,
                }
            }
        };
        Ok(Self { media })
    }

    /// The background image for playback time `t` seconds, if there is one.
    pub fn frame_at(&mut self, t: f64) -> Option<BackgroundFrame> {
        match &mut self.media {
            Media::None => None,
            Media::Image(frame) => Some(frame.clone()),
            Media::Video {
                info,
                cached_ms,
                cached,
            } => {
                let looped = t.rem_euclid(info.duration_sec);
                let key_ms = (looped * 1000.0).round() as i64;
                if *cached_ms == Some(key_ms) {
                    return cached.clone();
                }
                match media::decode_video_frame_rgba8(info, looped) {
                    Ok(rgba) => match rgba_straight_to_image_premul(&rgba, info.width, info.height)
                    {
                        Ok(paint) => {
                            let frame = BackgroundFrame {
                                paint,
                                width: info.width,
                                height: info.height,
                                animated: true,
                            };
                            *cached_ms = Some(key_ms);
                            *cached = Some(frame.clone());
                            Some(frame)
                        }
                        Err(e) => {
                            warn!(time = looped, error = %e, "background frame convert failed, reusing last frame");
                            cached.clone()
                        }
                    },
                    // Stalls and seek failures are non-fatal: hold the last
                    // decoded frame for this tick.
                    Err(e) => {
                        warn!(time = looped, error = %e, "background frame decode failed, reusing last frame");
                        cached.clone()
                    }
                }
            }
        }
    }
}
