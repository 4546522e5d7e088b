/// One rendered frame in premultiplied RGBA8.
#[derive(Debug, Clone)]
pub struct FrameRGBA {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Premultiplied RGBA8 pixel data, row-major.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// Expected byte length for the frame dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}
