/*!
trace.rs - one record per executed instruction.

Records are captured right before the opcode fetch from a side-effect-free
view of memory, and print in a nestest-like layout:

```text
    C000  4C F5 C5  JMP $C5F5    A:00 X:00 Y:00 P:24 SP:FD CYC:7
```
*/

use std::fmt;

use crate::cpu::core::Cpu;
use crate::cpu::table::{self, Mode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    pub pc: u16,
    pub bytes: [u8; 3],
    pub len: u8,
    pub mnemonic: &'static str,
    pub mode: Mode,
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p: u8,
    pub sp: u8,
    pub cycle: u64,
}

impl TraceRecord {
    /// Snapshot the instruction at PC. `peek` must not disturb the system.
    pub fn capture(cpu: &Cpu, mut peek: impl FnMut(u16) -> u8) -> Self {
        let pc = cpu.pc();
        let opcode = peek(pc);
        let instr = table::decode(opcode);
        let len = 1 + instr.mode.operand_len();
        let mut bytes = [opcode, 0, 0];
        for i in 1..len {
            bytes[i as usize] = peek(pc.wrapping_add(i as u16));
        }
        Self {
            pc,
            bytes,
            len,
            mnemonic: instr.mnemonic,
            mode: instr.mode,
            a: cpu.a(),
            x: cpu.x(),
            y: cpu.y(),
            p: cpu.status(),
            sp: cpu.sp(),
            cycle: cpu.cycles(),
        }
    }

    fn operand(&self) -> String {
        let b1 = self.bytes[1];
        let word = u16::from_le_bytes([self.bytes[1], self.bytes[2]]);
        match self.mode {
            Mode::Accumulator => "A".to_string(),
            Mode::Immediate => format!("#${:02X}", b1),
            Mode::Relative => {
                let target = self
                    .pc
                    .wrapping_add(2)
                    .wrapping_add(b1 as i8 as u16);
                format!("${:04X}", target)
            }
            Mode::ZeroPage(_) => format!("${:02X}", b1),
            Mode::ZeroPageX(_) => format!("${:02X},X", b1),
            Mode::ZeroPageY(_) => format!("${:02X},Y", b1),
            Mode::Absolute(_) | Mode::JmpAbsolute | Mode::Jsr => format!("${:04X}", word),
            Mode::AbsoluteX(_) => format!("${:04X},X", word),
            Mode::AbsoluteY(_) => format!("${:04X},Y", word),
            Mode::IndirectX(_) => format!("(${:02X},X)", b1),
            Mode::IndirectY(_) => format!("(${:02X}),Y", b1),
            Mode::JmpIndirect => format!("(${:04X})", word),
            _ => String::new(),
        }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = String::new();
        for (i, b) in self.bytes[..self.len as usize].iter().enumerate() {
            if i > 0 {
                raw.push(' ');
            }
            raw.push_str(&format!("{:02X}", b));
        }
        let asm = format!("{} {}", self.mnemonic, self.operand());
        write!(
            f,
            "{:04X}  {:<8}  {:<11}  A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
            self.pc,
            raw,
            asm.trim_end(),
            self.a,
            self.x,
            self.y,
            self.p,
            self.sp,
            self.cycle
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FlatBus;

    #[test]
    fn formats_like_nestest() {
        let mut bus = FlatBus::with_program(0xC000, &[0x4C, 0xF5, 0xC5]);
        let mut cpu = Cpu::new();
        cpu.step(&mut bus); // reset sequence
        let rec = TraceRecord::capture(&cpu, |a| bus.mem[a as usize]);
        assert_eq!(rec.len, 3);
        assert_eq!(
            rec.to_string(),
            "C000  4C F5 C5  JMP $C5F5    A:00 X:00 Y:00 P:24 SP:FD CYC:7"
        );
    }

    #[test]
    fn relative_target_is_resolved() {
        let mut bus = FlatBus::with_program(0x8000, &[0xD0, 0xFE]);
        let mut cpu = Cpu::new();
        cpu.step(&mut bus);
        let rec = TraceRecord::capture(&cpu, |a| bus.mem[a as usize]);
        assert!(rec.to_string().starts_with("8000  D0 FE     BNE $8000"));
    }
}
