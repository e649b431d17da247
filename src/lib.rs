#![doc = r#"
Famicore library crate.

Cycle-accurate NES emulator core: the CPU steps one bus access per cycle, the
PPU one dot per tick, and `System` keeps them at the NTSC 3:1 ratio.

Modules:
- apu: APU register stub and frame IRQ
- archive: save-state byte buffer and the `SaveState` trait
- bus: `IoBus` contract and the CPU-visible `Bus` (RAM, PPU ports, DMA, I/O, cartridge slot)
- cartridge: iNES loader, cartridge memory, mirroring
- controller: standard controller shift register
- cpu: 6502 micro-cycle engine, instruction table, trace records
- mapper / mappers: `Mapper` trait, factory, and the supported boards
- ppu: dot-accurate PPU
- system: orchestrator (master clock, lifecycle, save states, tracing)
- trap: debug-trap facility
- screenshot: PNG export (feature `screenshot`)

In tests, shared iNES builders are available under `crate::test_utils`.
"#]

pub mod apu;
pub mod archive;
pub mod bus;
pub mod cartridge;
pub mod controller;
pub mod cpu;
pub mod mapper;
pub mod mappers;
pub mod ppu;
pub mod system;
pub mod trap;

#[cfg(feature = "screenshot")]
pub mod screenshot;

// Re-export commonly used types at the crate root for convenience.
pub use archive::{Archive, ArchiveError, SaveState};
pub use bus::{Bus, IoBus, OpenBus};
pub use cartridge::{Cartridge, CartridgeError, Mirroring};
pub use controller::Button;
pub use cpu::{Cpu, TraceRecord};
pub use ppu::Ppu;
pub use system::{System, TraceSink};

// Shared test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;
