//! iNES ROM file parsing.
//!
//! Handles the 16-byte iNES header, the optional 512-byte trainer (skipped),
//! PRG-ROM and CHR-ROM payloads, and NES 2.0 detection with its extended
//! size encoding.
//!
//! ```text
//! Byte 0-3:  "NES" 0x1A
//! Byte 4:    PRG-ROM size in 16 KiB units
//! Byte 5:    CHR-ROM size in 8 KiB units (0 = cartridge has CHR-RAM)
//! Byte 6:    Flags 6 - mirroring, battery, trainer, four-screen, mapper low
//! Byte 7:    Flags 7 - NES 2.0 marker, mapper high
//! Byte 8-15: NES 2.0 extensions / zero padding
//! ```

use crate::mapper::Mirroring;

/// Errors raised while loading a ROM. Everything after a successful load is
/// infallible.
#[derive(Debug, thiserror::Error)]
pub enum RomError {
    /// Header shorter than 16 bytes or magic number mismatch.
    #[error("not an iNES file: bad or missing header")]
    BadHeader,

    /// File ends before header + trainer + PRG + CHR.
    #[error("ROM truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the header promised.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// Mapper number outside the supported set.
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u16),

    /// Host I/O failure while reading the file.
    #[error("I/O error reading ROM")]
    Io(#[from] std::io::Error),
}

/// Parsed iNES header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomHeader {
    /// PRG-ROM size in bytes (multiple of 16 KiB).
    pub prg_rom_size: usize,
    /// CHR-ROM size in bytes (multiple of 8 KiB; 0 means CHR-RAM).
    pub chr_rom_size: usize,
    /// Mapper number.
    pub mapper_number: u16,
    /// Submapper (NES 2.0 only, 0 otherwise).
    pub submapper: u8,
    /// Hard-wired nametable mirroring.
    pub mirroring: Mirroring,
    /// Battery-backed PRG-RAM present.
    pub has_battery: bool,
    /// 512-byte trainer precedes PRG-ROM.
    pub has_trainer: bool,
    /// NES 2.0 format detected.
    pub nes2_format: bool,
    /// CHR-RAM size in bytes when `chr_rom_size` is 0.
    pub chr_ram_size: usize,
}

impl RomHeader {
    const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];

    /// Parse the 16-byte header.
    pub fn parse(data: &[u8]) -> Result<Self, RomError> {
        if data.len() < 16 || data[0..4] != Self::MAGIC {
            return Err(RomError::BadHeader);
        }

        let nes2_format = data[7] & 0x0C == 0x08;

        let (mapper_number, submapper) = if nes2_format {
            let low = u16::from(data[6] >> 4);
            let mid = u16::from(data[7] & 0xF0);
            let high = u16::from(data[8] & 0x0F);
            ((high << 8) | mid | low, data[8] >> 4)
        } else {
            (u16::from((data[7] & 0xF0) | (data[6] >> 4)), 0)
        };

        let (prg_rom_size, chr_rom_size) = if nes2_format {
            (
                nes2_size(data[4], data[9] & 0x0F, 16384),
                nes2_size(data[5], data[9] >> 4, 8192),
            )
        } else {
            (data[4] as usize * 16384, data[5] as usize * 8192)
        };

        // A cartridge with no PRG-ROM cannot exist.
        if prg_rom_size == 0 {
            return Err(RomError::BadHeader);
        }

        let mirroring = if data[6] & 0x08 != 0 {
            Mirroring::FourScreen
        } else if data[6] & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let chr_ram_size = if chr_rom_size == 0 {
            if nes2_format && data[11] & 0x0F != 0 {
                64 << (data[11] & 0x0F)
            } else {
                8192
            }
        } else {
            0
        };

        Ok(Self {
            prg_rom_size,
            chr_rom_size,
            mapper_number,
            submapper,
            mirroring,
            has_battery: data[6] & 0x02 != 0,
            has_trainer: data[6] & 0x04 != 0,
            nes2_format,
            chr_ram_size,
        })
    }
}

/// NES 2.0 ROM size field: plain MSB extension, or exponent-multiplier form
/// when the MSB nibble is 0xF. Saturates rather than overflowing on absurd
/// exponents; the size check against the actual file length rejects them.
fn nes2_size(lsb: u8, msb: u8, unit: usize) -> usize {
    if msb == 0x0F {
        let exponent = u32::from(lsb >> 2);
        let multiplier = (lsb & 0x03) as usize * 2 + 1;
        multiplier.saturating_mul(1usize.checked_shl(exponent).unwrap_or(usize::MAX))
    } else {
        ((usize::from(msb) << 8) | usize::from(lsb)) * unit
    }
}

/// A loaded cartridge image.
#[derive(Debug, Clone)]
pub struct Rom {
    /// Parsed header.
    pub header: RomHeader,
    /// PRG-ROM payload.
    pub prg_rom: Vec<u8>,
    /// CHR-ROM payload; empty when the cartridge carries CHR-RAM instead.
    pub chr_rom: Vec<u8>,
}

impl Rom {
    /// Parse a complete ROM image from memory.
    pub fn load(data: &[u8]) -> Result<Self, RomError> {
        let header = RomHeader::parse(data)?;

        let mut offset: usize = 16;
        if header.has_trainer {
            // The trainer is legacy copier data; skip it.
            offset += 512;
        }

        let expected = offset
            .saturating_add(header.prg_rom_size)
            .saturating_add(header.chr_rom_size);
        if data.len() < expected {
            return Err(RomError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let prg_rom = data[offset..offset + header.prg_rom_size].to_vec();
        offset += header.prg_rom_size;
        let chr_rom = data[offset..offset + header.chr_rom_size].to_vec();

        log::debug!(
            "loaded ROM: mapper {}, PRG {} KiB, CHR {} KiB, {:?} mirroring{}",
            header.mapper_number,
            header.prg_rom_size / 1024,
            header.chr_rom_size / 1024,
            header.mirroring,
            if header.has_battery { ", battery" } else { "" },
        );

        Ok(Self {
            header,
            prg_rom,
            chr_rom,
        })
    }

    /// Read and parse a ROM file from disk.
    pub fn from_file(path: &std::path::Path) -> Result<Self, RomError> {
        let data = std::fs::read(path)?;
        Self::load(&data)
    }
}
