//! Mapper 3: CNROM.
//!
//! Fixed PRG-ROM (16 or 32 KiB) with a switchable 8 KiB CHR-ROM bank. Writes
//! to $8000-$FFFF select one of up to four CHR banks. Used by Gradius,
//! Arkanoid, Solomon's Key.

use crate::mapper::{Mapper, Mirroring};
use crate::rom::Rom;

/// CNROM mapper.
pub struct Cnrom {
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
    mirroring: Mirroring,
    chr_bank: u8,
    chr_banks: usize,
}

impl Cnrom {
    /// Build from a loaded ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let chr_rom = if rom.chr_rom.is_empty() {
            vec![0; 8192]
        } else {
            rom.chr_rom.clone()
        };
        let chr_banks = (chr_rom.len() / 8192).max(1);

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr_rom,
            mirroring: rom.header.mirroring,
            chr_bank: 0,
            chr_banks,
        }
    }
}

impl Mapper for Cnrom {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => {
                let offset = (addr - 0x8000) as usize % self.prg_rom.len();
                self.prg_rom[offset]
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, value: u8) {
        if addr >= 0x8000 {
            self.chr_bank = value & 0x03;
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        let bank = self.chr_bank as usize % self.chr_banks;
        self.chr_rom[bank * 8192 + (addr & 0x1FFF) as usize]
    }

    fn write_chr(&mut self, _addr: u16, _value: u8) {
        // CHR-ROM only; writes have no effect.
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_number(&self) -> u16 {
        3
    }

    fn mapper_name(&self) -> &'static str {
        "CNROM"
    }

    fn reset(&mut self) {
        self.chr_bank = 0;
    }

    fn state_bytes(&self) -> Vec<u8> {
        vec![self.chr_bank]
    }

    fn restore_state(&mut self, bytes: &[u8]) {
        if let Some(&bank) = bytes.first() {
            self.chr_bank = bank & 0x03;
        }
    }
}
