/*!
core::Cpu - micro-cycle 6502 engine.

Every call to `tick` performs exactly one bus transaction:

- Sub-cycle 0 fetches the opcode, or starts an interrupt sequence when one
  is pending.
- Sub-cycles 1..N run the addressing-mode handler of the decoded
  instruction (see `addressing.rs`). The handler reports completion. The
  sub-cycle counter then goes back to 0 and the number of cycles used is
  checked against the table.

Interrupts
==========
- NMI is edge-triggered: `signal_nmi` latches a request that is serviced at
  the next instruction boundary.
- IRQ is level-sensitive: the line is sampled on the last cycle of every
  instruction, masked by the I flag as it was before that cycle. This gives
  CLI/SEI/PLP their one-instruction latency.
- RESET runs the BRK sequence with the stack writes turned into reads.
- An NMI that arrives before the vector fetch of BRK or IRQ takes over the
  sequence and uses the NMI vector.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::bus::IoBus;
use crate::cpu::state::CpuState;
use crate::cpu::table::{self, Instruction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(in crate::cpu) enum Interrupt {
    Nmi,
    Irq,
    Reset,
}

impl Interrupt {
    fn to_u8(this: Option<Self>) -> u8 {
        match this {
            None => 0,
            Some(Interrupt::Nmi) => 1,
            Some(Interrupt::Irq) => 2,
            Some(Interrupt::Reset) => 3,
        }
    }

    fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Interrupt::Nmi),
            2 => Some(Interrupt::Irq),
            3 => Some(Interrupt::Reset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cpu {
    pub(in crate::cpu) regs: CpuState,

    // Per-instruction micro-state.
    pub(in crate::cpu) opcode: u8,
    pub(in crate::cpu) tn: u8,
    pub(in crate::cpu) addr: u16,
    pub(in crate::cpu) ptr: u8,
    pub(in crate::cpu) data: u8,
    pub(in crate::cpu) page_crossed: bool,
    pub(in crate::cpu) extra_cycles: u8,
    pub(in crate::cpu) interrupt: Option<Interrupt>,

    // Interrupt inputs.
    pub(in crate::cpu) nmi_pending: bool,
    irq_line: bool,
    irq_poll: bool,
    reset_pending: bool,

    cycles: u64,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Power-on CPU. The first ticks run the reset sequence.
    pub fn new() -> Self {
        // Builds and validates the opcode table up front.
        let _ = table::table();
        Self {
            regs: CpuState::new(),
            opcode: 0,
            tn: 0,
            addr: 0,
            ptr: 0,
            data: 0,
            page_crossed: false,
            extra_cycles: 0,
            interrupt: None,
            nmi_pending: false,
            irq_line: false,
            irq_poll: false,
            reset_pending: true,
            cycles: 0,
        }
    }

    pub fn state(&self) -> &CpuState {
        &self.regs
    }

    pub fn state_mut(&mut self) -> &mut CpuState {
        &mut self.regs
    }

    pub fn a(&self) -> u8 {
        self.regs.a
    }
    pub fn x(&self) -> u8 {
        self.regs.x
    }
    pub fn y(&self) -> u8 {
        self.regs.y
    }
    pub fn sp(&self) -> u8 {
        self.regs.sp
    }
    pub fn pc(&self) -> u16 {
        self.regs.pc
    }
    pub fn status(&self) -> u8 {
        self.regs.status
    }

    /// CPU cycles executed since power-on.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Latch an NMI edge.
    pub fn signal_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive the (wired-OR) IRQ line.
    pub fn set_irq_line(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Request a reset sequence at the next instruction boundary.
    pub fn signal_reset(&mut self) {
        self.reset_pending = true;
    }

    /// True between instructions.
    pub fn at_instruction_boundary(&self) -> bool {
        self.tn == 0
    }

    /// True when the next tick fetches an opcode rather than starting an
    /// interrupt sequence.
    pub fn will_fetch_opcode(&self) -> bool {
        self.tn == 0 && self.next_interrupt().is_none()
    }

    fn next_interrupt(&self) -> Option<Interrupt> {
        if self.reset_pending {
            Some(Interrupt::Reset)
        } else if self.nmi_pending {
            Some(Interrupt::Nmi)
        } else if self.irq_poll {
            Some(Interrupt::Irq)
        } else {
            None
        }
    }

    /// Advance one CPU clock: exactly one bus read or write.
    pub fn tick<B: IoBus + ?Sized>(&mut self, bus: &mut B) {
        self.cycles = self.cycles.wrapping_add(1);

        if self.tn == 0 {
            self.begin_instruction(bus);
            self.tn = 1;
            return;
        }

        let instr = table::decode(self.opcode);
        let irq_masked = self.regs.is_flag_set(crate::cpu::state::IRQ_DISABLE);
        if self.run_mode(bus, instr) {
            self.finish_instruction(instr, irq_masked);
        } else {
            self.tn += 1;
        }
    }

    /// Run to the end of the current (or next) instruction and return the
    /// number of cycles spent.
    pub fn step<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u32 {
        let mut n = 0;
        loop {
            self.tick(bus);
            n += 1;
            if self.tn == 0 {
                return n;
            }
        }
    }

    fn begin_instruction<B: IoBus + ?Sized>(&mut self, bus: &mut B) {
        self.page_crossed = false;
        self.extra_cycles = 0;
        self.interrupt = self.next_interrupt();
        self.irq_poll = false;

        let pc = self.regs.pc;
        match self.interrupt {
            Some(kind) => {
                // The fetched opcode is discarded and BRK's sequence runs.
                bus.cpu_read(pc);
                self.opcode = 0x00;
                if kind == Interrupt::Reset {
                    self.reset_pending = false;
                    log::debug!("CPU reset sequence");
                }
            }
            None => {
                self.opcode = bus.cpu_read(pc);
                self.regs.pc = pc.wrapping_add(1);
            }
        }
    }

    fn finish_instruction(&mut self, instr: &Instruction, irq_masked: bool) {
        let used = self.tn as u32 + 1;
        let expected = instr.cycles as u32 + self.extra_cycles as u32;
        if used != expected {
            crate::trap!(
                "{} (${:02X}) took {} cycles, expected {}",
                instr.mnemonic,
                self.opcode,
                used,
                expected
            );
        }
        self.irq_poll = self.irq_line && !irq_masked;
        self.tn = 0;
    }

    // Bus helpers shared by the addressing handlers.

    #[inline]
    pub(in crate::cpu) fn fetch<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let v = bus.cpu_read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        v
    }

    #[inline]
    pub(in crate::cpu) fn push<B: IoBus + ?Sized>(&mut self, bus: &mut B, v: u8) {
        bus.cpu_write(self.regs.stack_addr(), v);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    #[inline]
    pub(in crate::cpu) fn pull<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        bus.cpu_read(self.regs.stack_addr())
    }
}

impl SaveState for Cpu {
    fn save_state(&self, ar: &mut Archive) {
        self.regs.save_state(ar);
        ar.write_u8(self.opcode);
        ar.write_u8(self.tn);
        ar.write_u16(self.addr);
        ar.write_u8(self.ptr);
        ar.write_u8(self.data);
        ar.write_bool(self.page_crossed);
        ar.write_u8(self.extra_cycles);
        ar.write_u8(Interrupt::to_u8(self.interrupt));
        ar.write_bool(self.nmi_pending);
        ar.write_bool(self.irq_line);
        ar.write_bool(self.irq_poll);
        ar.write_bool(self.reset_pending);
        ar.write_u64(self.cycles);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.regs.load_state(ar)?;
        self.opcode = ar.read_u8()?;
        self.tn = ar.read_u8()?;
        self.addr = ar.read_u16()?;
        self.ptr = ar.read_u8()?;
        self.data = ar.read_u8()?;
        self.page_crossed = ar.read_bool()?;
        self.extra_cycles = ar.read_u8()?;
        self.interrupt = Interrupt::from_u8(ar.read_u8()?);
        self.nmi_pending = ar.read_bool()?;
        self.irq_line = ar.read_bool()?;
        self.irq_poll = ar.read_bool()?;
        self.reset_pending = ar.read_bool()?;
        self.cycles = ar.read_u64()?;
        Ok(())
    }
}
