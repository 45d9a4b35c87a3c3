//! The `Mapper` trait and nametable mirroring modes.
//!
//! A mapper sits between both system buses and the cartridge: it translates
//! CPU accesses in $4020-$FFFF and PPU accesses in $0000-$1FFF to ROM/RAM
//! banks, owns the cartridge's RAM, controls nametable mirroring and may
//! raise an IRQ.

/// Nametable mirroring mode.
///
/// Selects how the 4 KiB logical nametable space maps onto the console's
/// 2 KiB of physical VRAM. Mappers may change this at any write; the bus
/// consults it on every nametable access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mirroring {
    /// $2000/$2400 share one bank, $2800/$2C00 the other.
    #[default]
    Horizontal,
    /// $2000/$2800 share one bank, $2400/$2C00 the other.
    Vertical,
    /// Every nametable maps to the first 1 KiB.
    SingleScreenLower,
    /// Every nametable maps to the second 1 KiB.
    SingleScreenUpper,
    /// Cartridge provides its own VRAM for four distinct nametables.
    FourScreen,
}

impl Mirroring {
    /// Encode for save states.
    #[must_use]
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            Self::Horizontal => 0,
            Self::Vertical => 1,
            Self::SingleScreenLower => 2,
            Self::SingleScreenUpper => 3,
            Self::FourScreen => 4,
        }
    }

    /// Decode from save states. Unknown values fall back to horizontal.
    #[must_use]
    pub(crate) fn from_byte(value: u8) -> Self {
        match value {
            1 => Self::Vertical,
            2 => Self::SingleScreenLower,
            3 => Self::SingleScreenUpper,
            4 => Self::FourScreen,
            _ => Self::Horizontal,
        }
    }
}

/// Cartridge mapper interface.
///
/// Out-of-range or otherwise meaningless writes are silently ignored: the
/// guest program is unprivileged and must not be able to fault the host.
pub trait Mapper: Send + Sync {
    /// Read from CPU address space ($4020-$FFFF; $6000-$7FFF is PRG-RAM).
    fn read_prg(&self, addr: u16) -> u8;

    /// Write to CPU address space. $8000-$FFFF hits mapper registers.
    fn write_prg(&mut self, addr: u16, value: u8);

    /// Read from PPU pattern space ($0000-$1FFF).
    fn read_chr(&self, addr: u16) -> u8;

    /// Write to PPU pattern space. Only effective with CHR-RAM.
    fn write_chr(&mut self, addr: u16, value: u8);

    /// Current nametable mirroring.
    fn mirroring(&self) -> Mirroring;

    /// Whether the mapper is asserting its IRQ line.
    fn irq_pending(&self) -> bool {
        false
    }

    /// Acknowledge and clear a pending IRQ.
    fn irq_acknowledge(&mut self) {}

    /// PPU address line 12 went from low to high.
    ///
    /// The PPU reports this for every video fetch; MMC3 clocks its scanline
    /// counter from it.
    fn on_a12_rise(&mut self) {}

    /// Return banking registers to their power-on configuration.
    fn reset(&mut self) {}

    /// iNES mapper number.
    fn mapper_number(&self) -> u16;

    /// Human-readable board name.
    fn mapper_name(&self) -> &'static str;

    /// Whether PRG-RAM is battery backed.
    fn has_battery(&self) -> bool {
        false
    }

    /// Battery-backed PRG-RAM contents, for writing a SRAM file.
    fn battery_ram(&self) -> Option<&[u8]> {
        None
    }

    /// Load a SRAM file into battery-backed PRG-RAM.
    fn set_battery_ram(&mut self, _data: &[u8]) {}

    /// Serialize mapper-private state (bank registers, PRG-RAM, CHR-RAM).
    fn state_bytes(&self) -> Vec<u8> {
        Vec::new()
    }

    /// Restore mapper-private state from [`Mapper::state_bytes`] output.
    /// Short or malformed buffers are ignored.
    fn restore_state(&mut self, _bytes: &[u8]) {}
}
