//! Mapper 4: MMC3 (TxROM).
//!
//! The most widely used NES mapper: fine-grained 8 KiB PRG and 1/2 KiB CHR
//! banking, mirroring control, PRG-RAM protection, and a scanline counter
//! IRQ clocked by rising edges of PPU address line A12. Used by Super Mario
//! Bros. 3, the later Mega Man games, Kirby's Adventure.
//!
//! Register pairs (even/odd address):
//! - $8000/$8001: bank select / bank data
//! - $A000/$A001: mirroring / PRG-RAM protect
//! - $C000/$C001: IRQ latch / IRQ reload
//! - $E000/$E001: IRQ disable+acknowledge / IRQ enable

use crate::mapper::{Mapper, Mirroring};
use crate::rom::Rom;

/// MMC3 mapper.
pub struct Mmc3 {
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    chr_is_ram: bool,
    prg_ram: Vec<u8>,
    prg_banks: usize,
    chr_banks: usize,

    // $8000: bank select
    bank_select: u8,
    prg_mode: bool,
    chr_inversion: bool,
    // R0-R7
    bank_regs: [u8; 8],

    mirroring: Mirroring,
    four_screen: bool,
    prg_ram_enabled: bool,
    prg_ram_protect: bool,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,

    has_battery: bool,
}

impl Mmc3 {
    /// Build from a loaded ROM.
    #[must_use]
    pub fn new(rom: &Rom) -> Self {
        let chr_is_ram = rom.chr_rom.is_empty();
        let chr = if chr_is_ram {
            vec![0; rom.header.chr_ram_size.max(8192)]
        } else {
            rom.chr_rom.clone()
        };
        let chr_banks = (chr.len() / 1024).max(1);

        Self {
            prg_rom: rom.prg_rom.clone(),
            chr,
            chr_is_ram,
            prg_ram: vec![0; 8192],
            prg_banks: (rom.prg_rom.len() / 8192).max(1),
            chr_banks,
            bank_select: 0,
            prg_mode: false,
            chr_inversion: false,
            bank_regs: [0, 2, 4, 5, 6, 7, 0, 1],
            mirroring: rom.header.mirroring,
            four_screen: rom.header.mirroring == Mirroring::FourScreen,
            prg_ram_enabled: true,
            prg_ram_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
            has_battery: rom.header.has_battery,
        }
    }

    fn prg_offset(&self, addr: u16) -> usize {
        let second_last = self.prg_banks.saturating_sub(2);
        let last = self.prg_banks.saturating_sub(1);

        let bank = match addr {
            0x8000..=0x9FFF => {
                if self.prg_mode {
                    second_last
                } else {
                    self.bank_regs[6] as usize
                }
            }
            0xA000..=0xBFFF => self.bank_regs[7] as usize,
            0xC000..=0xDFFF => {
                if self.prg_mode {
                    self.bank_regs[6] as usize
                } else {
                    second_last
                }
            }
            _ => last,
        };
        (bank % self.prg_banks) * 8192 + (addr & 0x1FFF) as usize
    }

    fn chr_offset(&self, addr: u16) -> usize {
        // With inversion, the 2 KiB slots move to $1000 and the 1 KiB slots
        // to $0000; addr XOR $1000 reduces both layouts to one.
        let addr = (addr & 0x1FFF) ^ if self.chr_inversion { 0x1000 } else { 0 };

        let (bank, offset) = match addr {
            0x0000..=0x07FF => ((self.bank_regs[0] & 0xFE) as usize, addr & 0x07FF),
            0x0800..=0x0FFF => ((self.bank_regs[1] & 0xFE) as usize, addr & 0x07FF),
            0x1000..=0x13FF => (self.bank_regs[2] as usize, addr & 0x03FF),
            0x1400..=0x17FF => (self.bank_regs[3] as usize, addr & 0x03FF),
            0x1800..=0x1BFF => (self.bank_regs[4] as usize, addr & 0x03FF),
            _ => (self.bank_regs[5] as usize, addr & 0x03FF),
        };
        (bank % self.chr_banks) * 1024 + offset as usize
    }
}

impl Mapper for Mmc3 {
    fn read_prg(&self, addr: u16) -> u8 {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled {
                    self.prg_ram[(addr - 0x6000) as usize]
                } else {
                    0
                }
            }
            0x8000..=0xFFFF => self.prg_rom[self.prg_offset(addr) % self.prg_rom.len()],
            _ => 0,
        }
    }

    fn write_prg(&mut self, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled && !self.prg_ram_protect {
                    self.prg_ram[(addr - 0x6000) as usize] = value;
                }
            }
            0x8000..=0x9FFF => {
                if addr & 1 == 0 {
                    self.bank_select = value & 0x07;
                    self.prg_mode = value & 0x40 != 0;
                    self.chr_inversion = value & 0x80 != 0;
                } else {
                    let slot = self.bank_select as usize;
                    // PRG registers only address 6 bits of bank space.
                    self.bank_regs[slot] = if slot >= 6 { value & 0x3F } else { value };
                }
            }
            0xA000..=0xBFFF => {
                if addr & 1 == 0 {
                    // Four-screen boards wire their own VRAM; the mirroring
                    // bit has no effect there.
                    if !self.four_screen {
                        self.mirroring = if value & 1 != 0 {
                            Mirroring::Horizontal
                        } else {
                            Mirroring::Vertical
                        };
                    }
                } else {
                    self.prg_ram_enabled = value & 0x80 != 0;
                    self.prg_ram_protect = value & 0x40 != 0;
                }
            }
            0xC000..=0xDFFF => {
                if addr & 1 == 0 {
                    self.irq_latch = value;
                } else {
                    self.irq_counter = 0;
                    self.irq_reload = true;
                }
            }
            0xE000..=0xFFFF => {
                if addr & 1 == 0 {
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
                }
            }
            _ => {}
        }
    }

    fn read_chr(&self, addr: u16) -> u8 {
        self.chr[self.chr_offset(addr)]
    }

    fn write_chr(&mut self, addr: u16, value: u8) {
        if self.chr_is_ram {
            let offset = self.chr_offset(addr);
            self.chr[offset] = value;
        }
    }

    fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    fn irq_pending(&self) -> bool {
        self.irq_pending
    }

    fn irq_acknowledge(&mut self) {
        self.irq_pending = false;
    }

    fn on_a12_rise(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }

    fn mapper_number(&self) -> u16 {
        4
    }

    fn mapper_name(&self) -> &'static str {
        "MMC3"
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

    fn reset(&mut self) {
        self.bank_select = 0;
        self.prg_mode = false;
        self.chr_inversion = false;
        self.bank_regs = [0, 2, 4, 5, 6, 7, 0, 1];
        self.irq_latch = 0;
        self.irq_counter = 0;
        self.irq_reload = false;
        self.irq_enabled = false;
        self.irq_pending = false;
    }

    fn state_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            self.bank_select,
            u8::from(self.prg_mode),
            u8::from(self.chr_inversion),
        ];
        out.extend_from_slice(&self.bank_regs);
        out.push(self.mirroring.to_byte());
        out.push(u8::from(self.prg_ram_enabled));
        out.push(u8::from(self.prg_ram_protect));
        out.push(self.irq_latch);
        out.push(self.irq_counter);
        out.push(u8::from(self.irq_reload));
        out.push(u8::from(self.irq_enabled));
        out.push(u8::from(self.irq_pending));
        out.extend_from_slice(&self.prg_ram);
        if self.chr_is_ram {
            out.extend_from_slice(&self.chr);
        }
        out
    }

    fn restore_state(&mut self, bytes: &[u8]) {
        const HEADER: usize = 19;
        if bytes.len() < HEADER + self.prg_ram.len() {
            return;
        }
        self.bank_select = bytes[0] & 0x07;
        self.prg_mode = bytes[1] != 0;
        self.chr_inversion = bytes[2] != 0;
        self.bank_regs.copy_from_slice(&bytes[3..11]);
        self.mirroring = Mirroring::from_byte(bytes[11]);
        self.prg_ram_enabled = bytes[12] != 0;
        self.prg_ram_protect = bytes[13] != 0;
        self.irq_latch = bytes[14];
        self.irq_counter = bytes[15];
        self.irq_reload = bytes[16] != 0;
        self.irq_enabled = bytes[17] != 0;
        self.irq_pending = bytes[18] != 0;

        let prg_len = self.prg_ram.len();
        self.prg_ram
            .copy_from_slice(&bytes[HEADER..HEADER + prg_len]);
        if self.chr_is_ram && bytes.len() >= HEADER + prg_len + self.chr.len() {
            let chr_len = self.chr.len();
            self.chr
                .copy_from_slice(&bytes[HEADER + prg_len..HEADER + prg_len + chr_len]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomHeader;

    fn test_rom(prg_8k_banks: usize, chr_1k_banks: usize) -> Rom {
        let mut prg_rom = vec![0u8; prg_8k_banks * 8192];
        for (bank, chunk) in prg_rom.chunks_mut(8192).enumerate() {
            chunk.fill(bank as u8);
        }
        let mut chr_rom = vec![0u8; chr_1k_banks * 1024];
        for (bank, chunk) in chr_rom.chunks_mut(1024).enumerate() {
            chunk.fill(bank as u8);
        }
        Rom {
            header: RomHeader {
                prg_rom_size: prg_8k_banks * 8192,
                chr_rom_size: chr_1k_banks * 1024,
                mapper_number: 4,
                submapper: 0,
                mirroring: Mirroring::Horizontal,
                has_battery: false,
                has_trainer: false,
                nes2_format: false,
                chr_ram_size: 0,
            },
            prg_rom,
            chr_rom,
        }
    }

    fn select_bank(mapper: &mut Mmc3, slot: u8, bank: u8) {
        mapper.write_prg(0x8000, slot);
        mapper.write_prg(0x8001, bank);
    }

    #[test]
    fn prg_mode_0_layout() {
        let mut mapper = Mmc3::new(&test_rom(16, 8));
        select_bank(&mut mapper, 6, 3);
        select_bank(&mut mapper, 7, 5);

        assert_eq!(mapper.read_prg(0x8000), 3); // R6
        assert_eq!(mapper.read_prg(0xA000), 5); // R7
        assert_eq!(mapper.read_prg(0xC000), 14); // second-to-last fixed
        assert_eq!(mapper.read_prg(0xE000), 15); // last fixed
    }

    #[test]
    fn prg_mode_1_swaps_windows() {
        let mut mapper = Mmc3::new(&test_rom(16, 8));
        mapper.write_prg(0x8000, 0x46); // PRG mode set, slot 6
        mapper.write_prg(0x8001, 3);

        assert_eq!(mapper.read_prg(0x8000), 14); // second-to-last fixed
        assert_eq!(mapper.read_prg(0xC000), 3); // R6 moved here
        assert_eq!(mapper.read_prg(0xE000), 15);
    }

    #[test]
    fn chr_banking_normal() {
        let mut mapper = Mmc3::new(&test_rom(8, 16));
        select_bank(&mut mapper, 0, 4); // 2K at $0000, low bit ignored
        select_bank(&mut mapper, 2, 9); // 1K at $1000

        assert_eq!(mapper.read_chr(0x0000), 4);
        assert_eq!(mapper.read_chr(0x0400), 5); // second half of the 2K bank
        assert_eq!(mapper.read_chr(0x1000), 9);
    }

    #[test]
    fn chr_inversion_swaps_pattern_tables() {
        let mut mapper = Mmc3::new(&test_rom(8, 16));
        select_bank(&mut mapper, 0, 4);
        select_bank(&mut mapper, 2, 9);

        // Set inversion, keeping the same registers.
        mapper.write_prg(0x8000, 0x80);
        assert_eq!(mapper.read_chr(0x1000), 4); // 2K slot moved up
        assert_eq!(mapper.read_chr(0x0000), 9); // 1K slot moved down
    }

    #[test]
    fn two_k_slots_ignore_low_bit() {
        let mut mapper = Mmc3::new(&test_rom(8, 16));
        select_bank(&mut mapper, 0, 5); // odd bank -> treated as 4
        assert_eq!(mapper.read_chr(0x0000), 4);
    }

    #[test]
    fn mirroring_register() {
        let mut mapper = Mmc3::new(&test_rom(8, 8));
        mapper.write_prg(0xA000, 0);
        assert_eq!(mapper.mirroring(), Mirroring::Vertical);
        mapper.write_prg(0xA000, 1);
        assert_eq!(mapper.mirroring(), Mirroring::Horizontal);
    }

    #[test]
    fn four_screen_ignores_mirroring_writes() {
        let mut rom = test_rom(8, 8);
        rom.header.mirroring = Mirroring::FourScreen;
        let mut mapper = Mmc3::new(&rom);
        mapper.write_prg(0xA000, 1);
        assert_eq!(mapper.mirroring(), Mirroring::FourScreen);
    }

    #[test]
    fn irq_counts_a12_rises() {
        let mut mapper = Mmc3::new(&test_rom(8, 8));
        mapper.write_prg(0xC000, 3); // latch
        mapper.write_prg(0xC001, 0); // schedule reload
        mapper.write_prg(0xE001, 0); // enable

        // First rise reloads to 3, next two count down, fourth hits zero.
        mapper.on_a12_rise();
        assert!(!mapper.irq_pending());
        mapper.on_a12_rise();
        mapper.on_a12_rise();
        assert!(!mapper.irq_pending());
        mapper.on_a12_rise();
        assert!(mapper.irq_pending());
    }

    #[test]
    fn irq_disable_acknowledges() {
        let mut mapper = Mmc3::new(&test_rom(8, 8));
        mapper.write_prg(0xC000, 0);
        mapper.write_prg(0xC001, 0);
        mapper.write_prg(0xE001, 0);
        mapper.on_a12_rise();
        assert!(mapper.irq_pending());

        mapper.write_prg(0xE000, 0);
        assert!(!mapper.irq_pending());

        // Disabled: counting continues but no IRQ is raised.
        mapper.on_a12_rise();
        assert!(!mapper.irq_pending());
    }

    #[test]
    fn prg_ram_protect() {
        let mut mapper = Mmc3::new(&test_rom(8, 8));
        mapper.write_prg(0xA001, 0x80); // enabled, writable
        mapper.write_prg(0x6000, 0x42);
        assert_eq!(mapper.read_prg(0x6000), 0x42);

        mapper.write_prg(0xA001, 0xC0); // write protect
        mapper.write_prg(0x6000, 0x99);
        assert_eq!(mapper.read_prg(0x6000), 0x42);
    }

    #[test]
    fn state_round_trip() {
        let mut mapper = Mmc3::new(&test_rom(16, 16));
        select_bank(&mut mapper, 6, 3);
        mapper.write_prg(0xC000, 8);
        mapper.write_prg(0xC001, 0);
        mapper.write_prg(0xE001, 0);
        mapper.write_prg(0x6010, 0x5A);
        mapper.on_a12_rise();

        let state = mapper.state_bytes();
        let mut restored = Mmc3::new(&test_rom(16, 16));
        restored.restore_state(&state);

        assert_eq!(restored.read_prg(0x8000), 3);
        assert_eq!(restored.read_prg(0x6010), 0x5A);
        assert_eq!(restored.irq_counter, 8);
        assert!(restored.irq_enabled);
    }
}
