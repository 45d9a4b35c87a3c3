//! The NES system bus.
//!
//! Multiplexes CPU memory accesses across internal RAM, the PPU register
//! file, APU and controller registers, OAM DMA and cartridge space, and
//! adapts the PPU's video bus onto the mapper (pattern tables) and console
//! VRAM (nametables, with the mapper's mirroring applied per access).
//!
//! CPU address map:
//!
//! ```text
//! $0000-$1FFF  2 KiB internal RAM, mirrored every 2 KiB
//! $2000-$3FFF  PPU registers, mirrored every 8 bytes
//! $4000-$4013  APU channel registers
//! $4014        OAM DMA trigger
//! $4015        APU status
//! $4016        controller 1 data / strobe
//! $4017        controller 2 data / APU frame counter
//! $4018-$401F  test registers (open bus)
//! $4020-$FFFF  cartridge (mapper)
//! ```

use famicore_apu::Apu;
use famicore_cpu::Bus;
use famicore_mappers::{Mapper, Mirroring};
use famicore_ppu::{Ppu, PpuBus};

use crate::input::Controller;

/// PPU video bus adapter: pattern fetches go to the mapper, nametable
/// fetches to CIRAM with the mapper's current mirroring, and A12 edges are
/// forwarded for scanline IRQs.
pub struct PpuMemory<'a> {
    mapper: &'a mut dyn Mapper,
    ciram: &'a mut [u8; 2048],
}

/// Fold a nametable address into the 2 KiB CIRAM under a mirroring mode.
fn ciram_index(mirroring: Mirroring, addr: u16) -> usize {
    let addr = addr & 0x0FFF;
    let offset = (addr & 0x03FF) as usize;
    let nametable = (addr >> 10) & 0x03;

    let bank = match mirroring {
        Mirroring::Horizontal => usize::from(nametable >= 2),
        // Four-screen boards carry their own VRAM for the back pair; the
        // console's 2 KiB covers the first two nametables.
        Mirroring::Vertical | Mirroring::FourScreen => usize::from(nametable & 1),
        Mirroring::SingleScreenLower => 0,
        Mirroring::SingleScreenUpper => 1,
    };
    bank * 0x400 + offset
}

impl PpuBus for PpuMemory<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => self.mapper.read_chr(addr & 0x1FFF),
            0x2000..=0x3EFF => self.ciram[ciram_index(self.mapper.mirroring(), addr)],
            // Palette range: the PPU handles palette RAM itself and only
            // reaches here to refill the $2007 buffer from the nametable
            // underneath.
            _ => self.ciram[ciram_index(self.mapper.mirroring(), addr - 0x1000)],
        }
    }

    fn write(&mut self, addr: u16, value: u8) {
        match addr & 0x3FFF {
            0x0000..=0x1FFF => self.mapper.write_chr(addr & 0x1FFF, value),
            0x2000..=0x3EFF => {
                self.ciram[ciram_index(self.mapper.mirroring(), addr)] = value;
            }
            _ => {}
        }
    }

    fn a12_rise(&mut self) {
        self.mapper.on_a12_rise();
    }
}

/// The system bus and every component on it except the CPU.
pub struct NesBus {
    /// 2 KiB internal RAM.
    pub ram: [u8; 2048],
    /// 2 KiB nametable VRAM (CIRAM).
    pub ciram: [u8; 2048],
    /// Picture processor.
    pub ppu: Ppu,
    /// Audio processor.
    pub apu: Apu,
    /// Cartridge mapper.
    pub mapper: Box<dyn Mapper>,
    /// Controller port 1.
    pub controller1: Controller,
    /// Controller port 2.
    pub controller2: Controller,

    /// Page latched by a $4014 write, pending transfer.
    oam_dma_page: Option<u8>,
    /// CPU stall cycles owed for a serviced DMC fetch.
    dmc_stall: u32,
    /// Last value seen on the data bus.
    open_bus: u8,
}

impl NesBus {
    /// Build a bus around a mapper.
    #[must_use]
    pub fn new(mapper: Box<dyn Mapper>) -> Self {
        Self {
            ram: [0; 2048],
            ciram: [0; 2048],
            ppu: Ppu::new(),
            apu: Apu::new(),
            mapper,
            controller1: Controller::new(),
            controller2: Controller::new(),
            oam_dma_page: None,
            dmc_stall: 0,
            open_bus: 0,
        }
    }

    /// Reset every component on the bus.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.mapper.reset();
        self.oam_dma_page = None;
        self.dmc_stall = 0;
        self.open_bus = 0;
    }

    /// Swap in a different cartridge.
    pub fn set_mapper(&mut self, mapper: Box<dyn Mapper>) {
        self.mapper = mapper;
    }

    /// A $4014 write is waiting to be serviced.
    #[must_use]
    pub fn oam_dma_pending(&self) -> bool {
        self.oam_dma_page.is_some()
    }

    /// Run the pending OAM DMA: copy the 256-byte page into PPU OAM.
    ///
    /// Returns the CPU cycles consumed: 513, or 514 when triggered on an odd
    /// CPU cycle.
    pub fn execute_oam_dma(&mut self, cpu_cycles: u64) -> u32 {
        let Some(page) = self.oam_dma_page.take() else {
            return 0;
        };

        let base = u16::from(page) << 8;
        let mut buffer = [0u8; 256];
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.read(base.wrapping_add(i as u16));
        }
        self.ppu.oam_dma(&buffer);

        if cpu_cycles % 2 == 1 { 514 } else { 513 }
    }

    /// Advance the PPU three dots (one CPU cycle's worth).
    ///
    /// Returns (frame completed, NMI requested).
    pub fn step_ppu(&mut self) -> (bool, bool) {
        let mut frame_complete = false;
        let mut nmi = false;
        for _ in 0..3 {
            let mut memory = PpuMemory {
                mapper: self.mapper.as_mut(),
                ciram: &mut self.ciram,
            };
            let result = self.ppu.step(&mut memory);
            frame_complete |= result.frame_complete;
            nmi |= result.nmi;
        }
        (frame_complete, nmi)
    }

    /// Advance the APU one CPU cycle, servicing DMC sample fetches.
    pub fn step_apu(&mut self) {
        self.apu.tick();

        if self.apu.dmc_needs_sample() {
            let addr = self.apu.dmc_sample_addr();
            let value = self.mapper.read_prg(addr);
            self.apu.dmc_fill_sample(value);
            // The fetch steals a flat 4 CPU cycles.
            self.dmc_stall += 4;
        }
    }

    /// Take the accumulated DMC stall cycles, clearing them.
    pub fn take_dmc_stall(&mut self) -> u32 {
        std::mem::take(&mut self.dmc_stall)
    }

    /// Level of the shared IRQ line (mapper and APU sources).
    #[must_use]
    pub fn irq_line(&self) -> bool {
        self.mapper.irq_pending() || self.apu.irq_pending()
    }

    /// Side-effect-free read for debuggers and the disassembler.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],
            0x2000..=0x3FFF => self.open_bus,
            0x4015 => self.apu.peek_status(),
            0x4000..=0x401F => self.open_bus,
            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        }
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize],

            0x2000..=0x3FFF => {
                let mut memory = PpuMemory {
                    mapper: self.mapper.as_mut(),
                    ciram: &mut self.ciram,
                };
                self.ppu.read_register(addr & 0x2007, &mut memory)
            }

            0x4015 => self.apu.read_status(),
            0x4016 => self.controller1.read(),
            0x4017 => self.controller2.read(),

            // Write-only and test registers read back the bus residue.
            0x4000..=0x401F => self.open_bus,

            0x4020..=0xFFFF => self.mapper.read_prg(addr),
        };

        self.open_bus = value;
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;

        match addr {
            0x0000..=0x1FFF => self.ram[(addr & 0x07FF) as usize] = value,

            0x2000..=0x3FFF => {
                let mut memory = PpuMemory {
                    mapper: self.mapper.as_mut(),
                    ciram: &mut self.ciram,
                };
                self.ppu.write_register(addr & 0x2007, value, &mut memory);
            }

            0x4014 => self.oam_dma_page = Some(value),
            0x4016 => {
                self.controller1.write_strobe(value);
                self.controller2.write_strobe(value);
            }
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, value),
            0x4018..=0x401F => {}

            0x4020..=0xFFFF => self.mapper.write_prg(addr, value),
        }
    }

    fn peek(&self, addr: u16) -> u8 {
        NesBus::peek(self, addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Button;
    use famicore_mappers::{Nrom, Rom, RomHeader};

    fn test_bus() -> NesBus {
        let rom = Rom {
            header: RomHeader {
                prg_rom_size: 32768,
                chr_rom_size: 8192,
                mapper_number: 0,
                submapper: 0,
                mirroring: Mirroring::Vertical,
                has_battery: false,
                has_trainer: false,
                nes2_format: false,
                chr_ram_size: 0,
            },
            prg_rom: vec![0xEA; 32768],
            chr_rom: vec![0; 8192],
        };
        NesBus::new(Box::new(Nrom::new(&rom)))
    }

    #[test]
    fn ram_mirroring() {
        let mut bus = test_bus();
        bus.write(0x0000, 0x42);
        assert_eq!(bus.read(0x0800), 0x42);
        assert_eq!(bus.read(0x1000), 0x42);
        assert_eq!(bus.read(0x1800), 0x42);

        bus.write(0x1234, 0xAB);
        assert_eq!(bus.read(0x0234), 0xAB);
    }

    #[test]
    fn ram_mirror_identity() {
        let mut bus = test_bus();
        for addr in (0x0000..0x2000).step_by(0x93) {
            bus.write(addr, addr as u8);
        }
        for addr in 0x0000..0x2000u16 {
            assert_eq!(bus.read(addr), bus.read(addr & 0x07FF));
        }
    }

    #[test]
    fn ppu_register_mirroring() {
        let mut bus = test_bus();
        // $2006/$2007 through a distant mirror.
        bus.write(0x3FF8 | 0x06, 0x21);
        bus.write(0x3FF8 | 0x06, 0x00);
        bus.write(0x3FF8 | 0x07, 0x5A);

        bus.write(0x2006, 0x21);
        bus.write(0x2006, 0x00);
        let _ = bus.read(0x2007); // buffered
        assert_eq!(bus.read(0x2007), 0x5A);
    }

    #[test]
    fn nametable_mirroring_vertical() {
        let mut bus = test_bus();
        bus.write(0x2006, 0x20);
        bus.write(0x2006, 0x00);
        bus.write(0x2007, 0x11);

        // $2800 aliases $2000 under vertical mirroring.
        bus.write(0x2006, 0x28);
        bus.write(0x2006, 0x00);
        let _ = bus.read(0x2007);
        assert_eq!(bus.read(0x2007), 0x11);
    }

    #[test]
    fn oam_dma_cycles_by_parity() {
        let mut bus = test_bus();
        for i in 0..256u16 {
            bus.write(0x0200 + i, i as u8);
        }

        bus.write(0x4014, 0x02);
        assert!(bus.oam_dma_pending());
        assert_eq!(bus.execute_oam_dma(100), 513);
        assert!(!bus.oam_dma_pending());

        bus.write(0x4014, 0x02);
        assert_eq!(bus.execute_oam_dma(101), 514);

        // The page landed in OAM.
        bus.write(0x2003, 0x00);
        assert_eq!(bus.read(0x2004), 0x00);
        bus.write(0x2003, 0x01);
        assert_eq!(bus.read(0x2004), 0x01);
    }

    #[test]
    fn controller_read_sequence() {
        let mut bus = test_bus();
        bus.controller1.set_button(Button::A, true);
        bus.controller1.set_button(Button::Start, true);

        bus.write(0x4016, 1);
        bus.write(0x4016, 0);

        let bits: Vec<u8> = (0..8).map(|_| bus.read(0x4016) & 1).collect();
        assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 0]);
        // Exhausted: 1s, with bit 6 open bus.
        assert_eq!(bus.read(0x4016) & 0x41, 0x41);
    }

    #[test]
    fn open_bus_on_write_only_registers() {
        let mut bus = test_bus();
        bus.write(0x0000, 0x37);
        let _ = bus.read(0x0000);
        assert_eq!(bus.read(0x4018), 0x37);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// RAM mirroring: any address in $0000-$1FFF reads the same cell
            /// as its fold into the 2 KiB window.
            #[test]
            fn ram_mirrors_fold(addr in 0x0000u16..0x2000, value: u8) {
                let mut bus = test_bus();
                bus.write(addr, value);
                prop_assert_eq!(bus.read(addr & 0x07FF), value);
                prop_assert_eq!(bus.read(addr), bus.read(addr & 0x07FF));
            }

            /// PPU registers mirror every 8 bytes: OAMADDR written through
            /// any mirror is visible through $2004 at the base address.
            #[test]
            fn ppu_register_mirrors_fold(mirror in 0u16..0x0400, value: u8) {
                let mut bus = test_bus();
                let oamaddr = 0x2000 + mirror * 8 + 3;
                // OAM address $10 is a sprite Y slot: no attribute masking.
                bus.write(oamaddr, 0x10);
                bus.write(0x2004, value);
                bus.write(0x2003, 0x10);
                prop_assert_eq!(bus.read(0x2004), value);
            }
        }
    }

    #[test]
    fn dmc_fetch_stalls() {
        let mut bus = test_bus();
        // Start a 1-byte DMC sample; the next APU tick services the fetch.
        bus.write(0x4012, 0x00);
        bus.write(0x4013, 0x00);
        bus.write(0x4015, 0x10);

        bus.step_apu();
        assert_eq!(bus.take_dmc_stall(), 4);
        assert_eq!(bus.take_dmc_stall(), 0);
    }
}
