//! The console: CPU + bus glued together with NTSC timing.
//!
//! The driver advances the machine one CPU instruction at a time; each CPU
//! cycle steps the PPU three dots and the APU once, so register writes are
//! observable by the very next dot of the target component. OAM DMA and DMC
//! fetch stalls are settled before the next opcode dispatches.

use famicore_apu::CPU_CLOCK_NTSC;
use famicore_cpu::{disassemble, Cpu};
use famicore_mappers::{create_mapper, Mapper, Rom, RomError};

use crate::bus::NesBus;
use crate::input::Button;
use crate::palette;
use crate::save_state::{SaveStateError, SAVE_STATE_MAGIC};

/// Screen width in pixels.
pub const SCREEN_WIDTH: usize = 256;
/// Screen height in pixels.
pub const SCREEN_HEIGHT: usize = 240;

/// Default audio output rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Errors surfaced by the console API.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// ROM loading failed.
    #[error(transparent)]
    Rom(#[from] RomError),

    /// Save-state loading failed.
    #[error(transparent)]
    SaveState(#[from] SaveStateError),
}

/// A complete NES.
pub struct Console {
    cpu: Cpu,
    bus: NesBus,
    /// RGBA framebuffer, refreshed at each frame boundary.
    framebuffer: Vec<u32>,
    /// Downsampled audio waiting for the host.
    audio_buffer: Vec<f32>,
    sample_rate: u32,
    cycles_per_sample: f32,
    sample_window: f32,
    sample_sum: f32,
    sample_count: u32,
    frame_ready: bool,
}

impl Console {
    /// Build a console from an iNES image and bring it to reset state.
    pub fn new(rom_bytes: &[u8]) -> Result<Self, ConsoleError> {
        let rom = Rom::load(rom_bytes)?;
        let mapper = create_mapper(&rom)?;
        Ok(Self::with_mapper(mapper))
    }

    /// Build a console around an already-constructed mapper.
    #[must_use]
    pub fn with_mapper(mapper: Box<dyn Mapper>) -> Self {
        let mut console = Self {
            cpu: Cpu::new(),
            bus: NesBus::new(mapper),
            framebuffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            audio_buffer: Vec::with_capacity(2048),
            sample_rate: DEFAULT_SAMPLE_RATE,
            cycles_per_sample: CPU_CLOCK_NTSC as f32 / DEFAULT_SAMPLE_RATE as f32,
            sample_window: 0.0,
            sample_sum: 0.0,
            sample_count: 0,
            frame_ready: false,
        };
        console.reset();
        console
    }

    /// Replace the cartridge with a new ROM image and reset.
    pub fn load_rom(&mut self, rom_bytes: &[u8]) -> Result<(), ConsoleError> {
        let rom = Rom::load(rom_bytes)?;
        let mapper = create_mapper(&rom)?;
        log::debug!("cartridge installed: {}", mapper.mapper_name());
        self.bus.set_mapper(mapper);
        self.reset();
        Ok(())
    }

    /// Select the audio output rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate.max(1);
        self.cycles_per_sample = CPU_CLOCK_NTSC as f32 / self.sample_rate as f32;
    }

    /// Reset every subsystem, then the CPU from the reset vector.
    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu = Cpu::new();
        self.cpu.reset(&mut self.bus);
        self.audio_buffer.clear();
        self.sample_window = 0.0;
        self.sample_sum = 0.0;
        self.sample_count = 0;
        self.frame_ready = false;
    }

    /// Run one CPU instruction (or settle a pending DMA) and the matching
    /// PPU/APU cycles. Returns CPU cycles consumed.
    pub fn step(&mut self) -> u32 {
        // Cycles stolen by DMC fetches are paid before the next opcode.
        let dmc_stall = self.bus.take_dmc_stall();
        if dmc_stall > 0 {
            self.cpu.stall(dmc_stall);
        }

        // OAM DMA is atomic: the whole page transfers before the next
        // instruction dispatches.
        if self.bus.oam_dma_pending() {
            let cycles = self.bus.execute_oam_dma(self.cpu.cycles());
            self.cpu.add_cycles(cycles);
            self.tick_components(cycles);
            return cycles;
        }

        // The IRQ line is level-sensitive: re-sample the sources each
        // instruction.
        self.cpu.set_irq(self.bus.irq_line());

        let cycles = u32::from(self.cpu.step(&mut self.bus));
        self.tick_components(cycles);
        cycles
    }

    /// Step the PPU (3:1) and APU (1:1) for `cycles` CPU cycles.
    fn tick_components(&mut self, cycles: u32) {
        for _ in 0..cycles {
            let (frame_complete, nmi) = self.bus.step_ppu();
            if nmi {
                self.cpu.trigger_nmi();
            }
            if frame_complete {
                self.frame_ready = true;
                self.refresh_framebuffer();
            }

            self.bus.step_apu();
            self.collect_sample();
        }
    }

    /// Accumulate the mixer output and emit one averaged sample per
    /// `cycles_per_sample` window.
    fn collect_sample(&mut self) {
        self.sample_sum += self.bus.apu.output();
        self.sample_count += 1;
        self.sample_window += 1.0;

        if self.sample_window >= self.cycles_per_sample {
            self.sample_window -= self.cycles_per_sample;
            #[allow(clippy::cast_precision_loss)]
            let sample = self.sample_sum / self.sample_count as f32;
            self.audio_buffer.push(sample);
            self.sample_sum = 0.0;
            self.sample_count = 0;
        }
    }

    /// Run exactly one NTSC frame: until the PPU wraps from the pre-render
    /// line into scanline 0.
    pub fn run_frame(&mut self) {
        self.frame_ready = false;
        while !self.frame_ready {
            self.step();
        }
    }

    /// Re-encode the PPU's palette-index buffer into RGBA with the current
    /// emphasis bits.
    fn refresh_framebuffer(&mut self) {
        let emphasis = self.bus.ppu.emphasis();
        for (dest, &color) in self
            .framebuffer
            .iter_mut()
            .zip(self.bus.ppu.frame_buffer().iter())
        {
            *dest = palette::rgba(color, emphasis);
        }
    }

    /// RGBA framebuffer snapshot (256 x 240).
    #[must_use]
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    /// Drain queued audio samples into `out`. Returns how many were written.
    pub fn audio_samples(&mut self, out: &mut [f32]) -> usize {
        let count = out.len().min(self.audio_buffer.len());
        out[..count].copy_from_slice(&self.audio_buffer[..count]);
        self.audio_buffer.drain(..count);
        count
    }

    /// Queued sample count.
    #[must_use]
    pub fn audio_samples_available(&self) -> usize {
        self.audio_buffer.len()
    }

    /// Press or release a button on controller 0 or 1.
    pub fn set_button(&mut self, controller: u8, button: Button, pressed: bool) {
        let pad = if controller == 0 {
            &mut self.bus.controller1
        } else {
            &mut self.bus.controller2
        };
        pad.set_button(button, pressed);
    }

    /// Total CPU cycles executed.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles()
    }

    /// The CPU, for tests and debuggers.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// Mutable CPU access (forcing PC for headless test harnesses).
    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// The bus, for tests and debuggers.
    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    /// Mutable bus access.
    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }

    /// Read memory without side effects.
    #[must_use]
    pub fn peek_memory(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    /// Disassemble the instruction at `addr`. Returns the text and the
    /// following address.
    #[must_use]
    pub fn disassemble(&self, addr: u16) -> (String, u16) {
        disassemble(&self.bus, addr)
    }

    /// Battery-backed SRAM contents, if the cartridge has any.
    #[must_use]
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.bus.mapper.battery_ram()
    }

    /// Load a battery SRAM file.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        self.bus.mapper.set_battery_ram(data);
    }

    // ---------------------------------------------------------------------
    // Save states
    // ---------------------------------------------------------------------

    /// Append a complete machine snapshot to `out`.
    pub fn save_state(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(SAVE_STATE_MAGIC);
        self.cpu.save_state(out);
        self.bus.ppu.save_state(out);
        self.bus.apu.save_state(out);
        out.extend_from_slice(&self.bus.ram);
        out.extend_from_slice(&self.bus.ciram);
        self.bus.controller1.save_state(out);
        self.bus.controller2.save_state(out);

        let mapper_state = self.bus.mapper.state_bytes();
        out.extend_from_slice(&(mapper_state.len() as u32).to_le_bytes());
        out.extend_from_slice(&mapper_state);
    }

    /// Restore a machine snapshot produced by [`Console::save_state`] for
    /// the same cartridge.
    pub fn load_state(&mut self, bytes: &[u8]) -> Result<(), SaveStateError> {
        if bytes.len() < 4 || &bytes[..4] != SAVE_STATE_MAGIC {
            return Err(SaveStateError::BadMagic);
        }
        let mut pos = 4;

        pos += self
            .cpu
            .load_state(&bytes[pos..])
            .ok_or(SaveStateError::Truncated)?;
        pos += self
            .bus
            .ppu
            .load_state(&bytes[pos..])
            .ok_or(SaveStateError::Truncated)?;
        pos += self
            .bus
            .apu
            .load_state(&bytes[pos..])
            .ok_or(SaveStateError::Truncated)?;

        if bytes.len() < pos + 4096 {
            return Err(SaveStateError::Truncated);
        }
        self.bus.ram.copy_from_slice(&bytes[pos..pos + 2048]);
        pos += 2048;
        self.bus.ciram.copy_from_slice(&bytes[pos..pos + 2048]);
        pos += 2048;

        pos += self
            .bus
            .controller1
            .load_state(&bytes[pos..])
            .ok_or(SaveStateError::Truncated)?;
        pos += self
            .bus
            .controller2
            .load_state(&bytes[pos..])
            .ok_or(SaveStateError::Truncated)?;

        if bytes.len() < pos + 4 {
            return Err(SaveStateError::Truncated);
        }
        let mapper_len = u32::from_le_bytes(
            bytes[pos..pos + 4]
                .try_into()
                .map_err(|_| SaveStateError::Truncated)?,
        ) as usize;
        pos += 4;
        if bytes.len() < pos + mapper_len {
            return Err(SaveStateError::Truncated);
        }
        self.bus.mapper.restore_state(&bytes[pos..pos + mapper_len]);

        self.frame_ready = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famicore_cpu::Bus;

    /// A minimal NROM image: NOP slide with the reset vector at $8000.
    fn nop_rom() -> Vec<u8> {
        let mut rom = vec![0x4E, 0x45, 0x53, 0x1A, 0x02, 0x01, 0x00, 0x00];
        rom.extend_from_slice(&[0; 8]);
        let mut prg = vec![0xEA; 32768];
        prg[0x7FFC] = 0x00;
        prg[0x7FFD] = 0x80;
        rom.extend_from_slice(&prg);
        rom.extend_from_slice(&[0; 8192]);
        rom
    }

    #[test]
    fn construction_and_reset_vector() {
        let console = Console::new(&nop_rom()).unwrap();
        assert_eq!(console.cpu().pc, 0x8000);
        assert_eq!(console.cpu().sp, 0xFD);
    }

    #[test]
    fn step_advances_cycles() {
        let mut console = Console::new(&nop_rom()).unwrap();
        let before = console.cycles();
        let cycles = console.step();
        assert_eq!(cycles, 2); // NOP
        assert_eq!(console.cycles() - before, 2);
    }

    #[test]
    fn run_frame_takes_one_frame_of_cycles() {
        let mut console = Console::new(&nop_rom()).unwrap();
        let before = console.cycles();
        console.run_frame();
        let elapsed = console.cycles() - before;
        // 89342 dots / 3, within one instruction of slack.
        assert!((29770..=29790).contains(&elapsed), "elapsed {elapsed}");
    }

    #[test]
    fn framebuffer_is_rgba_sized() {
        let mut console = Console::new(&nop_rom()).unwrap();
        console.run_frame();
        assert_eq!(console.framebuffer().len(), 256 * 240);
        // Alpha channel opaque everywhere.
        assert!(console.framebuffer().iter().all(|&px| px >> 24 == 0xFF));
    }

    #[test]
    fn audio_accumulates_near_sample_rate() {
        let mut console = Console::new(&nop_rom()).unwrap();
        for _ in 0..60 {
            console.run_frame();
        }
        let available = console.audio_samples_available();
        // One second of emulation at 44.1 kHz, allow a little slack.
        assert!(
            (43_000..=45_000).contains(&available),
            "got {available} samples"
        );

        let mut out = vec![0.0f32; 1024];
        let drained = console.audio_samples(&mut out);
        assert_eq!(drained, 1024);
        assert_eq!(console.audio_samples_available(), available - 1024);
    }

    #[test]
    fn oam_dma_stalls_cpu_by_parity() {
        let mut console = Console::new(&nop_rom()).unwrap();

        // Cycle counter is 7 after reset (odd): expect 514.
        assert_eq!(console.cycles() % 2, 1);
        console.bus_mut().write(0x4014, 0x02);
        let before = console.cycles();
        let cycles = console.step();
        assert_eq!(cycles, 514);
        assert_eq!(console.cycles() - before, 514);

        // Force an even counter: expect 513.
        console.cpu_mut().add_cycles(1);
        assert_eq!(console.cycles() % 2, 0);
        console.bus_mut().write(0x4014, 0x02);
        let before = console.cycles();
        let cycles = console.step();
        assert_eq!(cycles, 513);
        assert_eq!(console.cycles() - before, 513);
    }

    #[test]
    fn save_load_round_trip_is_byte_identical() {
        let mut console = Console::new(&nop_rom()).unwrap();
        for _ in 0..3 {
            console.run_frame();
        }

        let mut first = Vec::new();
        console.save_state(&mut first);

        let mut other = Console::new(&nop_rom()).unwrap();
        other.load_state(&first).unwrap();

        let mut second = Vec::new();
        other.save_state(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn load_state_rejects_garbage() {
        let mut console = Console::new(&nop_rom()).unwrap();
        assert!(matches!(
            console.load_state(b"XXXXrest"),
            Err(SaveStateError::BadMagic)
        ));
        assert!(matches!(
            console.load_state(b"FCS1"),
            Err(SaveStateError::Truncated)
        ));
    }

    #[test]
    fn resumed_state_replays_identically() {
        let mut console = Console::new(&nop_rom()).unwrap();
        console.run_frame();

        let mut state = Vec::new();
        console.save_state(&mut state);

        // Branch A: continue from the live console.
        for _ in 0..5 {
            console.run_frame();
        }
        let framebuffer_a = console.framebuffer().to_vec();
        let cycles_a = console.cycles();

        // Branch B: reload and replay.
        let mut replay = Console::new(&nop_rom()).unwrap();
        replay.load_state(&state).unwrap();
        for _ in 0..5 {
            replay.run_frame();
        }

        assert_eq!(replay.cycles(), cycles_a);
        assert_eq!(replay.framebuffer(), framebuffer_a.as_slice());
    }

    #[test]
    fn set_button_reaches_controller() {
        let mut console = Console::new(&nop_rom()).unwrap();
        console.set_button(0, Button::A, true);

        console.bus_mut().write(0x4016, 1);
        console.bus_mut().write(0x4016, 0);
        assert_eq!(console.bus_mut().read(0x4016) & 1, 1);
    }
}
