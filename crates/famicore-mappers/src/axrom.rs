//! Mapper 7: AxROM.
//!
//! 32 KiB PRG banking with single-screen mirroring control. A write anywhere
//! in $8000-$FFFF selects the PRG bank (bits 0-2) and which nametable screen
//! is mirrored everywhere (bit 4). 8 KiB CHR-RAM. Used by Battletoads and
//! most Rare titles.

use crate::mapper::{Mapper, Mirroring};
use crate::rom::Rom;

/// AxROM mapper.
pub struct Axrom {
    prg_rom: Vec<u8>,
    chr_ram: Vec<u8>,
    prg_bank: u8,
    prg_banks: usize,
    mirroring: Mirroring,
}

impl Axrom {
    /// Build from a loaded ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let chr_ram = if rom.chr_rom.is_empty() {
            vec![0; rom.header.chr_ram_size.max(8192)]
        } else {
            rom.chr_rom.clone()
        };

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr_ram,
            prg_bank: 0,
            prg_banks: (rom.prg_rom.len() / 32768).max(1),
            mirroring: Mirroring::SingleScreenLower,
        }
    }
}

impl Mapper for Axrom {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x8000..=0xFFFF => {
                let bank = self.prg_bank as usize % self.prg_banks;
                let offset = (addr - 0x8000) as usize;
                self.prg_rom[(bank * 32768 + offset) % self.prg_rom.len()]
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, value: u8) {
        if addr >= 0x8000 {
            self.prg_bank = value & 0x07;
            self.mirroring = if value & 0x10 != 0 {
                Mirroring::SingleScreenUpper
            } else {
                Mirroring::SingleScreenLower
            };
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr_ram[(addr & 0x1FFF) as usize % self.chr_ram.len()]
    }

    fn write_chr(&mut self, addr: u16, value: u8) {
        let len = self.chr_ram.len();
        self.chr_ram[(addr & 0x1FFF) as usize % len] = value;
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_number(&self) -> u16 {
        7
    }

    fn mapper_name(&self) -> &'static str {
        "AxROM"
    }

    fn reset(&mut self) {
        self.prg_bank = 0;
        self.mirroring = Mirroring::SingleScreenLower;
    }

    fn state_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.prg_bank, self.mirroring.to_byte()];
        out.extend_from_slice(&self.chr_ram);
        out
    }

    fn restore_state(&mut self, bytes: &[u8]) {
        if bytes.len() < 2 {
            return;
        }
        self.prg_bank = bytes[0] & 0x07;
        self.mirroring = Mirroring::from_byte(bytes[1]);
        if bytes.len() >= 2 + self.chr_ram.len() {
            let len = self.chr_ram.len();
            self.chr_ram.copy_from_slice(&bytes[2..2 + len]);
        }
    }
}
