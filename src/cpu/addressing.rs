/*!
addressing.rs - per-cycle bus sequences of the 6502 addressing modes.

`run_mode` is called once per sub-cycle (`tn` = 1, 2, ...) after the opcode
fetch and returns true on the instruction's last cycle. Handlers reproduce
the hardware's bus traffic, dummy accesses included, because mappers and
PPU registers observe it:

- Indexed modes read the un-carried address first ($xx + index without the
  page carry) and only then the corrected one. Reads skip the second access
  when no page was crossed; writes and read-modify-writes never do.
- Read-modify-write reads the operand, writes it back unchanged, then
  writes the result.
- JMP ($xxFF) fetches its high byte from $xx00.
- Zero-page indexing and zero-page pointers wrap within page zero.

Cycle reference (base counts, see `Mode::base_cycles`):
    mode          read  write  rmw
    zp             3     3      5
    zp,X / zp,Y    4     4      6
    abs            4     4      6
    abs,X / abs,Y  4+    5      7
    (zp,X)         6     6      8
    (zp),Y         5+    6      8
*/

use crate::bus::IoBus;
use crate::cpu::core::{Cpu, Interrupt};
use crate::cpu::table::{Access, Instruction, Mode, Op};

impl Cpu {
    pub(in crate::cpu) fn run_mode<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        instr: &Instruction,
    ) -> bool {
        let t = self.tn;
        let op = instr.op;
        match instr.mode {
            Mode::Implied => {
                bus.cpu_read(self.regs.pc);
                self.regs.exec_implied(op);
                true
            }
            Mode::Accumulator => {
                bus.cpu_read(self.regs.pc);
                self.regs.a = self.regs.exec_modify(op, self.regs.a);
                true
            }
            Mode::Immediate => {
                let v = self.fetch(bus);
                self.regs.exec_read(op, v);
                true
            }
            Mode::Relative => self.branch(bus, op, t),

            Mode::ZeroPage(acc) => match t {
                1 => {
                    self.addr = self.fetch(bus) as u16;
                    false
                }
                _ => self.access(bus, op, acc, t - 2),
            },
            Mode::ZeroPageX(acc) => self.zero_page_indexed(bus, op, acc, t, self.regs.x),
            Mode::ZeroPageY(acc) => self.zero_page_indexed(bus, op, acc, t, self.regs.y),

            Mode::Absolute(acc) => match t {
                1 => {
                    self.addr = self.fetch(bus) as u16;
                    false
                }
                2 => {
                    self.addr |= (self.fetch(bus) as u16) << 8;
                    false
                }
                _ => self.access(bus, op, acc, t - 3),
            },
            Mode::AbsoluteX(acc) => self.absolute_indexed(bus, op, acc, t, self.regs.x),
            Mode::AbsoluteY(acc) => self.absolute_indexed(bus, op, acc, t, self.regs.y),

            Mode::IndirectX(acc) => match t {
                1 => {
                    self.ptr = self.fetch(bus);
                    false
                }
                2 => {
                    bus.cpu_read(self.ptr as u16);
                    self.ptr = self.ptr.wrapping_add(self.regs.x);
                    false
                }
                3 => {
                    self.addr = bus.cpu_read(self.ptr as u16) as u16;
                    false
                }
                4 => {
                    let hi = bus.cpu_read(self.ptr.wrapping_add(1) as u16);
                    self.addr |= (hi as u16) << 8;
                    false
                }
                _ => self.access(bus, op, acc, t - 5),
            },
            Mode::IndirectY(acc) => match t {
                1 => {
                    self.ptr = self.fetch(bus);
                    false
                }
                2 => {
                    self.addr = bus.cpu_read(self.ptr as u16) as u16;
                    false
                }
                3 => {
                    let hi = bus.cpu_read(self.ptr.wrapping_add(1) as u16);
                    self.set_indexed_base(((hi as u16) << 8) | self.addr, self.regs.y);
                    false
                }
                _ => self.indexed_access(bus, op, acc, t - 4),
            },

            Mode::JmpAbsolute => match t {
                1 => {
                    self.data = self.fetch(bus);
                    false
                }
                _ => {
                    let hi = bus.cpu_read(self.regs.pc);
                    self.regs.pc = ((hi as u16) << 8) | self.data as u16;
                    true
                }
            },
            Mode::JmpIndirect => match t {
                1 => {
                    self.addr = self.fetch(bus) as u16;
                    false
                }
                2 => {
                    self.addr |= (self.fetch(bus) as u16) << 8;
                    false
                }
                3 => {
                    self.data = bus.cpu_read(self.addr);
                    false
                }
                _ => {
                    // The pointer's high byte never carries into the next page.
                    let hi_addr = (self.addr & 0xFF00) | (self.addr.wrapping_add(1) & 0x00FF);
                    let hi = bus.cpu_read(hi_addr);
                    self.regs.pc = ((hi as u16) << 8) | self.data as u16;
                    true
                }
            },
            Mode::Jsr => match t {
                1 => {
                    self.data = self.fetch(bus);
                    false
                }
                2 => {
                    bus.cpu_read(self.regs.stack_addr());
                    false
                }
                3 => {
                    self.push(bus, (self.regs.pc >> 8) as u8);
                    false
                }
                4 => {
                    self.push(bus, self.regs.pc as u8);
                    false
                }
                _ => {
                    let hi = bus.cpu_read(self.regs.pc);
                    self.regs.pc = ((hi as u16) << 8) | self.data as u16;
                    true
                }
            },
            Mode::Rts => match t {
                1 => {
                    bus.cpu_read(self.regs.pc);
                    false
                }
                2 => {
                    bus.cpu_read(self.regs.stack_addr());
                    false
                }
                3 => {
                    self.data = self.pull(bus);
                    false
                }
                4 => {
                    let hi = self.pull(bus);
                    self.regs.pc = ((hi as u16) << 8) | self.data as u16;
                    false
                }
                _ => {
                    bus.cpu_read(self.regs.pc);
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                    true
                }
            },
            Mode::Rti => match t {
                1 => {
                    bus.cpu_read(self.regs.pc);
                    false
                }
                2 => {
                    bus.cpu_read(self.regs.stack_addr());
                    false
                }
                3 => {
                    let p = self.pull(bus);
                    self.regs.restore_status(p);
                    false
                }
                4 => {
                    self.data = self.pull(bus);
                    false
                }
                _ => {
                    let hi = self.pull(bus);
                    self.regs.pc = ((hi as u16) << 8) | self.data as u16;
                    true
                }
            },
            Mode::Brk => self.interrupt_sequence(bus, t),
            Mode::Push => match t {
                1 => {
                    bus.cpu_read(self.regs.pc);
                    false
                }
                _ => {
                    let v = match op {
                        Op::Php => self.regs.status_for_push(true),
                        _ => self.regs.a,
                    };
                    self.push(bus, v);
                    true
                }
            },
            Mode::Pull => match t {
                1 => {
                    bus.cpu_read(self.regs.pc);
                    false
                }
                2 => {
                    bus.cpu_read(self.regs.stack_addr());
                    false
                }
                _ => {
                    let v = self.pull(bus);
                    match op {
                        Op::Plp => self.regs.restore_status(v),
                        _ => {
                            self.regs.a = v;
                            self.regs.update_zn(v);
                        }
                    }
                    true
                }
            },
            Mode::Jam => {
                crate::trap!(
                    "illegal opcode ${:02X} at ${:04X}",
                    self.opcode,
                    self.regs.pc.wrapping_sub(1)
                );
                bus.cpu_read(self.regs.pc);
                true
            }
        }
    }

    /// Memory access at the effective address, `step` counting from the
    /// first cycle that touches it.
    fn access<B: IoBus + ?Sized>(&mut self, bus: &mut B, op: Op, acc: Access, step: u8) -> bool {
        match (acc, step) {
            (Access::Read, _) => {
                let v = bus.cpu_read(self.addr);
                self.regs.exec_read(op, v);
                true
            }
            (Access::Write, _) => {
                bus.cpu_write(self.addr, self.regs.exec_write(op));
                true
            }
            (Access::Modify, 0) => {
                self.data = bus.cpu_read(self.addr);
                false
            }
            (Access::Modify, 1) => {
                bus.cpu_write(self.addr, self.data);
                self.data = self.regs.exec_modify(op, self.data);
                false
            }
            (Access::Modify, _) => {
                bus.cpu_write(self.addr, self.data);
                true
            }
        }
    }

    fn zero_page_indexed<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        op: Op,
        acc: Access,
        t: u8,
        index: u8,
    ) -> bool {
        match t {
            1 => {
                self.ptr = self.fetch(bus);
                false
            }
            2 => {
                bus.cpu_read(self.ptr as u16);
                self.addr = self.ptr.wrapping_add(index) as u16;
                false
            }
            _ => self.access(bus, op, acc, t - 3),
        }
    }

    fn absolute_indexed<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        op: Op,
        acc: Access,
        t: u8,
        index: u8,
    ) -> bool {
        match t {
            1 => {
                self.addr = self.fetch(bus) as u16;
                false
            }
            2 => {
                let hi = self.fetch(bus) as u16;
                self.set_indexed_base((hi << 8) | self.addr, index);
                false
            }
            _ => self.indexed_access(bus, op, acc, t - 3),
        }
    }

    /// Latch the un-carried address and remember whether a page was crossed.
    fn set_indexed_base(&mut self, base: u16, index: u8) {
        let full = base.wrapping_add(index as u16);
        self.page_crossed = (full & 0xFF00) != (base & 0xFF00);
        self.addr = (base & 0xFF00) | (full & 0x00FF);
    }

    fn indexed_access<B: IoBus + ?Sized>(
        &mut self,
        bus: &mut B,
        op: Op,
        acc: Access,
        step: u8,
    ) -> bool {
        match (acc, step) {
            (Access::Read, 0) if !self.page_crossed => self.access(bus, op, acc, 0),
            (_, 0) => {
                bus.cpu_read(self.addr);
                if self.page_crossed {
                    self.addr = self.addr.wrapping_add(0x0100);
                    if acc == Access::Read {
                        self.extra_cycles = 1;
                    }
                }
                false
            }
            (Access::Read, _) => self.access(bus, op, acc, 0),
            (_, s) => self.access(bus, op, acc, s - 1),
        }
    }

    fn branch<B: IoBus + ?Sized>(&mut self, bus: &mut B, op: Op, t: u8) -> bool {
        match t {
            1 => {
                self.data = self.fetch(bus);
                if !self.regs.branch_taken(op) {
                    return true;
                }
                self.extra_cycles = 1;
                false
            }
            2 => {
                bus.cpu_read(self.regs.pc);
                let target = self.regs.pc.wrapping_add(self.data as i8 as u16);
                if target & 0xFF00 == self.regs.pc & 0xFF00 {
                    self.regs.pc = target;
                    return true;
                }
                self.regs.pc = (self.regs.pc & 0xFF00) | (target & 0x00FF);
                self.addr = target;
                self.extra_cycles = 2;
                false
            }
            _ => {
                bus.cpu_read(self.regs.pc);
                self.regs.pc = self.addr;
                true
            }
        }
    }

    /// BRK, IRQ, NMI and RESET share one seven-cycle sequence.
    fn interrupt_sequence<B: IoBus + ?Sized>(&mut self, bus: &mut B, t: u8) -> bool {
        let kind = self.interrupt;
        let reset = kind == Some(Interrupt::Reset);
        match t {
            1 => {
                bus.cpu_read(self.regs.pc);
                if kind.is_none() {
                    // BRK skips its padding byte.
                    self.regs.pc = self.regs.pc.wrapping_add(1);
                }
                false
            }
            2 | 3 | 4 => {
                let v = match t {
                    2 => (self.regs.pc >> 8) as u8,
                    3 => self.regs.pc as u8,
                    _ => self.regs.status_for_push(kind.is_none()),
                };
                if reset {
                    bus.cpu_read(self.regs.stack_addr());
                    self.regs.sp = self.regs.sp.wrapping_sub(1);
                } else {
                    self.push(bus, v);
                }
                false
            }
            5 => {
                self.addr = if reset {
                    0xFFFC
                } else if self.nmi_pending {
                    self.nmi_pending = false;
                    0xFFFA
                } else {
                    0xFFFE
                };
                self.data = bus.cpu_read(self.addr);
                self.regs
                    .assign_flag(crate::cpu::state::IRQ_DISABLE, true);
                false
            }
            _ => {
                let hi = bus.cpu_read(self.addr.wrapping_add(1));
                self.regs.pc = ((hi as u16) << 8) | self.data as u16;
                self.interrupt = None;
                true
            }
        }
    }
}
