//! PPU control register ($2000).
//!
//! ```text
//! 7  6  5  4  3  2  1  0
//! V  P  H  B  S  I  N  N
//! |  |  |  |  |  |  +--+-- Base nametable (0=$2000, 1=$2400, 2=$2800, 3=$2C00)
//! |  |  |  |  |  +-------- VRAM increment (0: +1 across, 1: +32 down)
//! |  |  |  |  +----------- Sprite pattern table for 8x8 sprites
//! |  |  |  +-------------- Background pattern table
//! |  |  +----------------- Sprite size (0: 8x8, 1: 8x16)
//! |  +-------------------- Master/slave select (unused here)
//! +----------------------- NMI at start of VBlank
//! ```

use bitflags::bitflags;

bitflags! {
    /// PPUCTRL flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Ctrl: u8 {
        /// Base nametable address bit 0.
        const NAMETABLE_LO = 1 << 0;
        /// Base nametable address bit 1.
        const NAMETABLE_HI = 1 << 1;
        /// VRAM address increment select.
        const INC32 = 1 << 2;
        /// Sprite pattern table select (8x8 mode only).
        const SPRITE_TABLE = 1 << 3;
        /// Background pattern table select.
        const BG_TABLE = 1 << 4;
        /// 8x16 sprite mode.
        const SPRITE_SIZE = 1 << 5;
        /// Master/slave select.
        const MASTER_SLAVE = 1 << 6;
        /// Generate NMI when VBlank begins.
        const NMI_ENABLE = 1 << 7;
    }
}

impl Ctrl {
    /// $2007 address increment: 1 or 32.
    #[inline]
    #[must_use]
    pub const fn vram_increment(self) -> u16 {
        if self.contains(Self::INC32) { 32 } else { 1 }
    }

    /// Pattern table base for background tiles.
    #[inline]
    #[must_use]
    pub const fn bg_table_addr(self) -> u16 {
        if self.contains(Self::BG_TABLE) { 0x1000 } else { 0x0000 }
    }

    /// Pattern table base for 8x8 sprites. 8x16 sprites select their table
    /// from tile bit 0 instead.
    #[inline]
    #[must_use]
    pub const fn sprite_table_addr(self) -> u16 {
        if self.contains(Self::SPRITE_TABLE) { 0x1000 } else { 0x0000 }
    }

    /// Sprite height in lines: 8 or 16.
    #[inline]
    #[must_use]
    pub const fn sprite_height(self) -> u16 {
        if self.contains(Self::SPRITE_SIZE) { 16 } else { 8 }
    }

    /// Whether VBlank raises NMI.
    #[inline]
    #[must_use]
    pub const fn nmi_enabled(self) -> bool {
        self.contains(Self::NMI_ENABLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vram_increment() {
        assert_eq!(Ctrl::empty().vram_increment(), 1);
        assert_eq!(Ctrl::INC32.vram_increment(), 32);
    }

    #[test]
    fn pattern_tables() {
        assert_eq!(Ctrl::empty().bg_table_addr(), 0x0000);
        assert_eq!(Ctrl::BG_TABLE.bg_table_addr(), 0x1000);
        assert_eq!(Ctrl::SPRITE_TABLE.sprite_table_addr(), 0x1000);
    }

    #[test]
    fn sprite_height() {
        assert_eq!(Ctrl::empty().sprite_height(), 8);
        assert_eq!(Ctrl::SPRITE_SIZE.sprite_height(), 16);
    }
}
