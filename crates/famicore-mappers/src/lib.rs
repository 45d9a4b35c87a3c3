//! NES cartridge mappers and iNES ROM parsing.
//!
//! A mapper translates CPU accesses in $4020-$FFFF and PPU accesses in
//! $0000-$1FFF into ROM/RAM banks, controls nametable mirroring, and may
//! raise an IRQ. This crate provides the [`Mapper`] trait, the iNES file
//! parser, and the six boards the emulator supports:
//!
//! | Mapper | Board | Banking |
//! |--------|-------|---------|
//! | 0 | NROM  | none |
//! | 1 | MMC1  | serial shift register, PRG 16/32K, CHR 4/8K, mirroring |
//! | 2 | UxROM | PRG 16K switch + fixed last |
//! | 3 | CNROM | CHR 8K switch |
//! | 4 | MMC3  | PRG 8K, CHR 1/2K, mirroring, A12 scanline IRQ |
//! | 7 | AxROM | PRG 32K switch + single-screen select |
//!
//! # Example
//!
//! ```no_run
//! use famicore_mappers::{create_mapper, Rom};
//!
//! let data = std::fs::read("game.nes").unwrap();
//! let rom = Rom::load(&data).unwrap();
//! let mapper = create_mapper(&rom).unwrap();
//! let first_opcode = mapper.read_prg(0x8000);
//! ```

mod axrom;
mod cnrom;
mod mapper;
mod mmc1;
mod mmc3;
mod nrom;
mod rom;
mod uxrom;

pub use axrom::Axrom;
pub use cnrom::Cnrom;
pub use mapper::{Mapper, Mirroring};
pub use mmc1::Mmc1;
pub use mmc3::Mmc3;
pub use nrom::Nrom;
pub use rom::{Rom, RomError, RomHeader};
pub use uxrom::Uxrom;

/// Instantiate the mapper a ROM asks for.
///
/// # Errors
///
/// `RomError::UnsupportedMapper` when the mapper number is not one of
/// {0, 1, 2, 3, 4, 7}.
pub fn create_mapper(rom: &Rom) -> Result<Box<dyn Mapper>, RomError> {
    match rom.header.mapper_number {
        0 => Ok(Box::new(Nrom::new(rom))),
        1 => Ok(Box::new(Mmc1::new(rom))),
        2 => Ok(Box::new(Uxrom::new(rom))),
        3 => Ok(Box::new(Cnrom::new(rom))),
        4 => Ok(Box::new(Mmc3::new(rom))),
        7 => Ok(Box::new(Axrom::new(rom))),
        n => Err(RomError::UnsupportedMapper(n)),
    }
}

/// Mapper numbers this crate implements.
#[must_use]
pub fn supported_mappers() -> &'static [u16] {
    &[0, 1, 2, 3, 4, 7]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rom(mapper: u16) -> Rom {
        Rom {
            header: RomHeader {
                prg_rom_size: 32768,
                chr_rom_size: 8192,
                mapper_number: mapper,
                submapper: 0,
                mirroring: Mirroring::Vertical,
                has_battery: false,
                has_trainer: false,
                nes2_format: false,
                chr_ram_size: 0,
            },
            prg_rom: vec![0; 32768],
            chr_rom: vec![0; 8192],
        }
    }

    #[test]
    fn factory_builds_supported_mappers() {
        for &number in supported_mappers() {
            let mapper = create_mapper(&test_rom(number)).unwrap();
            assert_eq!(mapper.mapper_number(), number);
        }
    }

    #[test]
    fn factory_rejects_unknown_mapper() {
        let result = create_mapper(&test_rom(66));
        assert!(matches!(result, Err(RomError::UnsupportedMapper(66))));
    }
}
