//! famicore - NES emulation core.
//!
//! Integrates the CPU, PPU, APU and cartridge mappers into a complete
//! console behind a small host API:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      Console                         │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │                    NesBus                      │  │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌────────┐ ┌───────┐  │  │
//! │  │  │ RAM │ │ PPU │ │ APU │ │ Mapper │ │ Pads  │  │  │
//! │  │  └─────┘ └─────┘ └─────┘ └────────┘ └───────┘  │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                        ▲                             │
//! │                   ┌────┴────┐                        │
//! │                   │ 6502 CPU│                        │
//! │                   └─────────┘                        │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use famicore_core::{Button, Console};
//!
//! let rom = std::fs::read("game.nes").unwrap();
//! let mut console = Console::new(&rom).unwrap();
//!
//! loop {
//!     console.set_button(0, Button::Start, true);
//!     console.run_frame();
//!
//!     let _pixels = console.framebuffer(); // 256x240 RGBA
//!     let mut audio = [0.0f32; 1024];
//!     let _n = console.audio_samples(&mut audio);
//! }
//! ```

mod bus;
mod console;
mod input;
pub mod palette;
mod save_state;

pub use bus::{NesBus, PpuMemory};
pub use console::{
    Console, ConsoleError, DEFAULT_SAMPLE_RATE, SCREEN_HEIGHT, SCREEN_WIDTH,
};
pub use input::{Button, Controller};
pub use save_state::{SaveStateError, SAVE_STATE_MAGIC};

// Re-export the component crates' main types for embedders.
pub use famicore_apu::Apu;
pub use famicore_cpu::{Bus, Cpu, Status};
pub use famicore_mappers::{create_mapper, Mapper, Mirroring, Rom, RomError, RomHeader};
pub use famicore_ppu::Ppu;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// NTSC timing constants.
pub mod timing {
    /// Master clock (NTSC).
    pub const MASTER_CLOCK_NTSC: u32 = 21_477_272;
    /// CPU clock: master / 12.
    pub const CPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 12;
    /// PPU clock: master / 4.
    pub const PPU_CLOCK_NTSC: u32 = MASTER_CLOCK_NTSC / 4;
    /// PPU dots per frame.
    pub const DOTS_PER_FRAME: u32 = 341 * 262;
    /// Approximate CPU cycles per frame.
    pub const CPU_CYCLES_PER_FRAME: u32 = DOTS_PER_FRAME / 3;
}
