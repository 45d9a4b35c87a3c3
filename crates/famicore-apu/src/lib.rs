//! NES 2A03 APU emulation.
//!
//! Five channels (two pulse, triangle, noise, DMC) and the frame counter
//! sequencer, ticked once per CPU cycle. The DMC cannot reach the CPU bus
//! itself; it exposes a fetch handshake (`dmc_needs_sample` /
//! `dmc_fill_sample`) that the system bus services, charging the CPU the
//! DMA stall cycles.
//!
//! # Example
//!
//! ```
//! use famicore_apu::Apu;
//!
//! let mut apu = Apu::new();
//! apu.write(0x4015, 0x01); // enable pulse 1
//! apu.write(0x4000, 0xBF); // 50% duty, constant volume
//! apu.write(0x4002, 0xFD); // timer low
//! apu.write(0x4003, 0x08); // timer high + length
//!
//! for _ in 0..1000 {
//!     apu.tick();
//! }
//! let sample = apu.output();
//! assert!((0.0..=1.0).contains(&sample));
//! ```

mod apu;
mod dmc;
mod envelope;
mod frame_counter;
mod length_counter;
mod noise;
mod pulse;
mod sweep;
mod timer;
mod triangle;

pub use apu::Apu;
pub use dmc::Dmc;
pub use envelope::Envelope;
pub use frame_counter::{FrameClock, FrameCounter, FrameCounterMode};
pub use length_counter::{LengthCounter, LENGTH_TABLE};
pub use noise::Noise;
pub use pulse::Pulse;
pub use sweep::{NegateMode, Sweep};
pub use timer::Timer;
pub use triangle::Triangle;

/// NTSC CPU clock in Hz, the APU's tick rate.
pub const CPU_CLOCK_NTSC: u32 = 1_789_773;
