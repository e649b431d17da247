/*!
cpu - 6502 (2A03) core.

```text
    state.rs       - registers and status flag masks
    table.rs       - 256-entry opcode table (addressing mode x operation)
    addressing.rs  - per-cycle bus sequences of the addressing modes
    execute.rs     - operation handlers (ALU, loads/stores, RMW, flags)
    core/          - `Cpu`: the micro-cycle engine and interrupt logic
    trace.rs       - per-instruction trace records
```

Usage:
```rust
use famicore::cpu::Cpu;
use famicore::bus::OpenBus;

let mut cpu = Cpu::new();
let mut bus = OpenBus;
cpu.tick(&mut bus); // one CPU clock
```
*/

pub mod addressing;
pub mod core;
pub mod execute;
pub mod state;
pub mod table;
pub mod trace;

pub use crate::cpu::core::Cpu;
pub use crate::cpu::state::{
    BREAK, CARRY, CpuState, DECIMAL, IRQ_DISABLE, NEGATIVE, OVERFLOW, UNUSED, ZERO,
};
pub use crate::cpu::trace::TraceRecord;
