/// Multiply two 0..=255 channel values and divide by 255 with rounding.
#[inline]
pub(crate) fn mul_div255_u16(a: u16, b: u16) -> u16 {
    (a * b + 127) / 255
}

/// `mul_div255_u16` over `u8` channels.
#[inline]
pub(crate) fn mul_div255_u8(a: u8, b: u8) -> u8 {
    mul_div255_u16(a as u16, b as u16) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_edges() {
        assert_eq!(mul_div255_u8(0, 255), 0);
        assert_eq!(mul_div255_u8(255, 255), 255);
        assert_eq!(mul_div255_u8(255, 0), 0);
    }

    #[test]
    fn rounds_to_nearest() {
        assert_eq!(mul_div255_u8(128, 128), 64);
        assert_eq!(mul_div255_u8(1, 255), 1);
    }
}
