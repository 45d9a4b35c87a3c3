//! PPU status register ($2002).

use bitflags::bitflags;

bitflags! {
    /// PPUSTATUS flags. Only the top three bits are driven; the rest read
    /// back PPU open bus.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        /// More than 8 sprites matched on a scanline.
        const SPRITE_OVERFLOW = 1 << 5;
        /// Opaque sprite-0 pixel overlapped an opaque background pixel.
        const SPRITE_ZERO_HIT = 1 << 6;
        /// Vertical blank in progress. Cleared by reading $2002.
        const VBLANK = 1 << 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_positions() {
        assert_eq!(Status::SPRITE_OVERFLOW.bits(), 0x20);
        assert_eq!(Status::SPRITE_ZERO_HIT.bits(), 0x40);
        assert_eq!(Status::VBLANK.bits(), 0x80);
    }
}
