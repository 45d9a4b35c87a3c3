//! Mapper 0: NROM.
//!
//! No bank switching at all. 16 KiB PRG-ROM mirrored across $8000-$FFFF, or
//! 32 KiB mapped directly; CHR is a single fixed 8 KiB bank. Used by the
//! earliest titles (Super Mario Bros., Donkey Kong, ...).

use crate::mapper::{Mapper, Mirroring};
use crate::rom::Rom;

/// NROM mapper.
pub struct Nrom {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    mirroring: Mirroring,
    has_battery: bool,
}

impl Nrom {
    /// Build from a loaded ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let chr_is_ram = rom.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0; rom.header.chr_ram_size.max(8192)]
        } else {
            rom.chr_rom.clone()
        };

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr,
            chr_is_ram,
            prg_ram: vec![0; 8192],
            mirroring: rom.header.mirroring,
            has_battery: rom.header.has_battery,
        }
    }
}

impl Mapper for Nrom {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => self.prg_ram[(addr - 0x6000) as usize],
            0x8000..=0xFFFF => {
                // A 16 KiB image mirrors into both halves.
                let offset = (addr - 0x8000) as usize % self.prg_rom.len();
                self.prg_rom[offset]
            }
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, value: u8) {
        if let 0x6000..=0x7FFF = addr {
            self.prg_ram[(addr - 0x6000) as usize] = value;
        }
        // ROM writes are ignored; NROM has no registers.
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr[(addr & 0x1FFF) as usize % self.chr.len()]
    }

    fn write_chr(&mut self, addr: u16, value: u8) {
        if self.chr_is_ram {
            let len = self.chr.len();
            self.chr[(addr & 0x1FFF) as usize % len] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn mapper_number(&self) -> u16 {
        0
    }

    fn mapper_name(&self) -> &'static str {
        "NROM"
    }

    fn has_battery(&self) -> bool {
        self.has_battery
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        self.has_battery.then_some(self.prg_ram.as_slice())
    }

    fn set_battery_ram(&mut self, data: &[u8]) {
        let len = data.len().min(self.prg_ram.len());
        self.prg_ram[..len].copy_from_slice(&data[..len]);
    }

    fn state_bytes(&self) -> Vec<u8> {
        let mut out = self.prg_ram.clone();
        if self.chr_is_ram {
            out.extend_from_slice(&self.chr);
        }
        out
    }

    fn restore_state(&mut self, bytes: &[u8]) {
        let prg_len = self.prg_ram.len();
        if bytes.len() < prg_len {
            return;
        }
        self.prg_ram.copy_from_slice(&bytes[..prg_len]);
        if self.chr_is_ram && bytes.len() >= prg_len + self.chr.len() {
            let chr_len = self.chr.len();
            self.chr.copy_from_slice(&bytes[prg_len..prg_len + chr_len]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomHeader;

    fn test_rom(prg_banks: usize, chr_banks: usize) -> Rom {
        Rom {
            header: RomHeader {
                prg_rom_size: prg_banks * 16384,
                chr_rom_size: chr_banks * 8192,
                mapper_number: 0,
                submapper: 0,
                mirroring: Mirroring::Vertical,
                has_battery: false,
                has_trainer: false,
                nes2_format: false,
                chr_ram_size: if chr_banks == 0 { 8192 } else { 0 },
            },
            prg_rom: (0..prg_banks * 16384).map(|i| (i >> 8) as u8).collect(),
            chr_rom: (0..chr_banks * 8192).map(|i| i as u8).collect(),
        }
    }

    #[test]
    fn prg_mirroring_16k() {
        let mapper = Nrom::new(&test_rom(1, 1));
        assert_eq!(mapper.read_prg(0x8000), mapper.read_prg(0xC000));
        assert_eq!(mapper.read_prg(0xBFFF), mapper.read_prg(0xFFFF));
    }

    #[test]
    fn prg_direct_32k() {
        let mapper = Nrom::new(&test_rom(2, 1));
        assert_eq!(mapper.read_prg(0x8000), 0x00);
        assert_eq!(mapper.read_prg(0xC000), 0x40);
    }

    #[test]
    fn prg_ram_read_write() {
        let mut mapper = Nrom::new(&test_rom(1, 1));
        mapper.write_prg(0x6000, 0x42);
        assert_eq!(mapper.read_prg(0x6000), 0x42);
    }

    #[test]
    fn rom_writes_ignored() {
        let mut mapper = Nrom::new(&test_rom(1, 1));
        let before = mapper.read_prg(0x8000);
        mapper.write_prg(0x8000, 0xFF);
        assert_eq!(mapper.read_prg(0x8000), before);
    }

    #[test]
    fn chr_ram_writable_chr_rom_not() {
        let mut ram_mapper = Nrom::new(&test_rom(1, 0));
        ram_mapper.write_chr(0x0000, 0x55);
        assert_eq!(ram_mapper.read_chr(0x0000), 0x55);

        let mut rom_mapper = Nrom::new(&test_rom(1, 1));
        let before = rom_mapper.read_chr(0x0000);
        rom_mapper.write_chr(0x0000, 0x55);
        assert_eq!(rom_mapper.read_chr(0x0000), before);
    }

    #[test]
    fn state_round_trip() {
        let mut mapper = Nrom::new(&test_rom(1, 0));
        mapper.write_prg(0x6123, 0xAB);
        mapper.write_chr(0x0456, 0xCD);
        let state = mapper.state_bytes();

        let mut restored = Nrom::new(&test_rom(1, 0));
        restored.restore_state(&state);
        assert_eq!(restored.read_prg(0x6123), 0xAB);
        assert_eq!(restored.read_chr(0x0456), 0xCD);
    }
}
