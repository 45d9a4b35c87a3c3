//! APU top level: register decode, the per-CPU-cycle tick, and the mixer.

use crate::dmc::Dmc;
use crate::frame_counter::{FrameClock, FrameCounter};
use crate::noise::Noise;
use crate::pulse::Pulse;
use crate::sweep::NegateMode;
use crate::triangle::Triangle;

/// The 2A03 APU: two pulse channels, triangle, noise, DMC, and the frame
/// counter sequencer.
pub struct Apu {
    pulse1: Pulse,
    pulse2: Pulse,
    triangle: Triangle,
    noise: Noise,
    dmc: Dmc,
    frame_counter: FrameCounter,
    /// CPU cycles ticked (pulse/noise timers run at half rate).
    cycle: u64,
}

impl Apu {
    /// Power-on state: everything silent.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pulse1: Pulse::new(NegateMode::OnesComplement),
            pulse2: Pulse::new(NegateMode::TwosComplement),
            triangle: Triangle::new(),
            noise: Noise::new(),
            dmc: Dmc::new(),
            frame_counter: FrameCounter::new(),
            cycle: 0,
        }
    }

    /// Reset: silence all channels.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Write an APU register ($4000-$4013, $4015, $4017).
    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x4000 => self.pulse1.write_control(value),
            0x4001 => self.pulse1.write_sweep(value),
            0x4002 => self.pulse1.write_timer_lo(value),
            0x4003 => self.pulse1.write_timer_hi(value),

            0x4004 => self.pulse2.write_control(value),
            0x4005 => self.pulse2.write_sweep(value),
            0x4006 => self.pulse2.write_timer_lo(value),
            0x4007 => self.pulse2.write_timer_hi(value),

            0x4008 => self.triangle.write_linear(value),
            0x400A => self.triangle.write_timer_lo(value),
            0x400B => self.triangle.write_timer_hi(value),

            0x400C => self.noise.write_control(value),
            0x400E => self.noise.write_period(value),
            0x400F => self.noise.write_length(value),

            0x4010 => self.dmc.write_control(value),
            0x4011 => self.dmc.write_direct_load(value),
            0x4012 => self.dmc.write_sample_address(value),
            0x4013 => self.dmc.write_sample_length(value),

            0x4015 => {
                self.pulse1.set_enabled(value & 0x01 != 0);
                self.pulse2.set_enabled(value & 0x02 != 0);
                self.triangle.set_enabled(value & 0x04 != 0);
                self.noise.set_enabled(value & 0x08 != 0);
                self.dmc.set_enabled(value & 0x10 != 0);
            }

            0x4017 => {
                let immediate = self.frame_counter.write(value);
                self.apply_frame_clock(immediate);
            }

            // $4009 and $400D exist on no channel.
            _ => log::trace!("write to unmapped APU register {addr:#06X}"),
        }
    }

    /// $4015 read: channel-active bits, DMC activity, IRQ flags. Clears the
    /// frame IRQ (not the DMC IRQ).
    pub fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.frame_counter.clear_irq();
        status
    }

    /// $4015 contents without the read side effect.
    #[must_use]
    pub fn peek_status(&self) -> u8 {
        let mut status = 0;
        if self.pulse1.active() {
            status |= 0x01;
        }
        if self.pulse2.active() {
            status |= 0x02;
        }
        if self.triangle.active() {
            status |= 0x04;
        }
        if self.noise.active() {
            status |= 0x08;
        }
        if self.dmc.active() {
            status |= 0x10;
        }
        if self.frame_counter.irq_pending() {
            status |= 0x40;
        }
        if self.dmc.irq_pending() {
            status |= 0x80;
        }
        status
    }

    /// Advance one CPU cycle.
    pub fn tick(&mut self) {
        // Triangle and DMC timers run at the CPU rate; the others at half.
        self.triangle.clock_timer();
        self.dmc.clock_timer();
        if self.cycle & 1 == 1 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
            self.noise.clock_timer();
        }

        let clocks = self.frame_counter.clock();
        self.apply_frame_clock(clocks);

        self.cycle = self.cycle.wrapping_add(1);
    }

    fn apply_frame_clock(&mut self, clocks: FrameClock) {
        if clocks.quarter {
            self.pulse1.clock_envelope();
            self.pulse2.clock_envelope();
            self.triangle.clock_linear();
            self.noise.clock_envelope();
        }
        if clocks.half {
            self.pulse1.clock_length_and_sweep();
            self.pulse2.clock_length_and_sweep();
            self.triangle.clock_length();
            self.noise.clock_length();
        }
    }

    /// Mixed output sample in roughly [0.0, 1.0], using the standard
    /// non-linear approximation.
    #[must_use]
    pub fn output(&self) -> f32 {
        let pulse_sum = f32::from(self.pulse1.output() + self.pulse2.output());
        let pulse_out = if pulse_sum == 0.0 {
            0.0
        } else {
            95.88 / (8128.0 / pulse_sum + 100.0)
        };

        let t = f32::from(self.triangle.output()) / 8227.0;
        let n = f32::from(self.noise.output()) / 12241.0;
        let d = f32::from(self.dmc.output()) / 22638.0;
        let tnd_sum = t + n + d;
        let tnd_out = if tnd_sum == 0.0 {
            0.0
        } else {
            159.79 / (1.0 / tnd_sum + 100.0)
        };

        pulse_out + tnd_out
    }

    /// Whether the frame counter or DMC holds an IRQ.
    #[must_use]
    pub fn irq_pending(&self) -> bool {
        self.frame_counter.irq_pending() || self.dmc.irq_pending()
    }

    /// DMC wants a sample byte fetched from the CPU bus.
    #[must_use]
    pub fn dmc_needs_sample(&self) -> bool {
        self.dmc.needs_sample()
    }

    /// Address of the pending DMC fetch.
    #[must_use]
    pub fn dmc_sample_addr(&self) -> u16 {
        self.dmc.sample_address_current()
    }

    /// Deliver a DMC sample byte fetched by the bus.
    pub fn dmc_fill_sample(&mut self, value: u8) {
        self.dmc.fill_sample(value);
    }

    /// Serialize the full APU state.
    pub fn save_state(&self, out: &mut Vec<u8>) {
        self.pulse1.save_state(out);
        self.pulse2.save_state(out);
        self.triangle.save_state(out);
        self.noise.save_state(out);
        self.dmc.save_state(out);
        self.frame_counter.save_state(out);
        out.extend_from_slice(&self.cycle.to_le_bytes());
    }

    /// Restore the full APU state; returns bytes consumed.
    pub fn load_state(&mut self, bytes: &[u8]) -> Option<usize> {
        let mut pos = 0;
        pos += self.pulse1.load_state(bytes)?;
        pos += self.pulse2.load_state(&bytes[pos..])?;
        pos += self.triangle.load_state(&bytes[pos..])?;
        pos += self.noise.load_state(&bytes[pos..])?;
        pos += self.dmc.load_state(&bytes[pos..])?;
        pos += self.frame_counter.load_state(&bytes[pos..])?;
        if bytes.len() < pos + 8 {
            return None;
        }
        self.cycle = u64::from_le_bytes(bytes[pos..pos + 8].try_into().ok()?);
        Some(pos + 8)
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}
