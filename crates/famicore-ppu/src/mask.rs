//! PPU mask register ($2001).

use bitflags::bitflags;

bitflags! {
    /// PPUMASK flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mask: u8 {
        /// Grayscale: palette entries are masked to the gray column.
        const GRAYSCALE = 1 << 0;
        /// Show background in the leftmost 8 pixel columns.
        const BG_LEFT = 1 << 1;
        /// Show sprites in the leftmost 8 pixel columns.
        const SPRITE_LEFT = 1 << 2;
        /// Background rendering enable.
        const SHOW_BG = 1 << 3;
        /// Sprite rendering enable.
        const SHOW_SPRITES = 1 << 4;
        /// Red emphasis.
        const EMPHASIZE_RED = 1 << 5;
        /// Green emphasis.
        const EMPHASIZE_GREEN = 1 << 6;
        /// Blue emphasis.
        const EMPHASIZE_BLUE = 1 << 7;
    }
}

impl Mask {
    /// True when either layer renders; gates the whole pipeline.
    #[inline]
    #[must_use]
    pub const fn rendering_enabled(self) -> bool {
        self.intersects(Self::SHOW_BG.union(Self::SHOW_SPRITES))
    }

    /// Emphasis bits packed into the low three positions (R=1, G=2, B=4).
    #[inline]
    #[must_use]
    pub const fn emphasis(self) -> u8 {
        self.bits() >> 5
    }
}
