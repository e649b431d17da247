/*!
table.rs - 256-entry opcode table.

Each opcode decodes to an addressing mode (which owns the per-cycle bus
sequence) and an operation (which owns the data transformation). The
addressing modes that touch memory carry their access kind, since a read,
a write and a read-modify-write through the same mode produce different
bus sequences and cycle counts.

The table is built once on first use and validated:
- every (mode, operation) pair is unique, apart from the deliberate aliases
  (NOP and JAM variants, ANC $0B/$2B, SBC $E9/$EB);
- every declared cycle count matches the base length of its mode.
Either violation is a trap.

Opcodes the 2A03 does not implement in a stable way (XAA, LXA, AHX, SHX,
SHY, TAS, LAS) are decoded as JAM together with the real KIL opcodes.
*/

use std::sync::OnceLock;

/// Kind of memory access performed at the effective address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
    Modify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Implied,
    Accumulator,
    Immediate,
    Relative,
    ZeroPage(Access),
    ZeroPageX(Access),
    ZeroPageY(Access),
    Absolute(Access),
    AbsoluteX(Access),
    AbsoluteY(Access),
    IndirectX(Access),
    IndirectY(Access),
    JmpAbsolute,
    JmpIndirect,
    Jsr,
    Rts,
    Rti,
    Brk,
    Push,
    Pull,
    Jam,
}

impl Mode {
    /// Cycle count without page-cross or branch penalties.
    pub fn base_cycles(self) -> u8 {
        use Access::*;
        match self {
            Mode::Implied | Mode::Accumulator | Mode::Immediate | Mode::Relative | Mode::Jam => 2,
            Mode::ZeroPage(Read | Write) => 3,
            Mode::ZeroPage(Modify) => 5,
            Mode::ZeroPageX(Read | Write) | Mode::ZeroPageY(Read | Write) => 4,
            Mode::ZeroPageX(Modify) | Mode::ZeroPageY(Modify) => 6,
            Mode::Absolute(Read | Write) => 4,
            Mode::Absolute(Modify) => 6,
            Mode::AbsoluteX(Read) | Mode::AbsoluteY(Read) => 4,
            Mode::AbsoluteX(Write) | Mode::AbsoluteY(Write) => 5,
            Mode::AbsoluteX(Modify) | Mode::AbsoluteY(Modify) => 7,
            Mode::IndirectX(Read | Write) => 6,
            Mode::IndirectX(Modify) => 8,
            Mode::IndirectY(Read) => 5,
            Mode::IndirectY(Write) => 6,
            Mode::IndirectY(Modify) => 8,
            Mode::JmpAbsolute | Mode::Push => 3,
            Mode::Pull => 4,
            Mode::JmpIndirect => 5,
            Mode::Jsr | Mode::Rts | Mode::Rti => 6,
            Mode::Brk => 7,
        }
    }

    /// Number of operand bytes following the opcode.
    pub fn operand_len(self) -> u8 {
        match self {
            Mode::Immediate
            | Mode::Relative
            | Mode::ZeroPage(_)
            | Mode::ZeroPageX(_)
            | Mode::ZeroPageY(_)
            | Mode::IndirectX(_)
            | Mode::IndirectY(_) => 1,
            Mode::Absolute(_)
            | Mode::AbsoluteX(_)
            | Mode::AbsoluteY(_)
            | Mode::JmpAbsolute
            | Mode::JmpIndirect
            | Mode::Jsr => 2,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Read
    Lda,
    Ldx,
    Ldy,
    Adc,
    Sbc,
    And,
    Ora,
    Eor,
    Cmp,
    Cpx,
    Cpy,
    Bit,
    Lax,
    Anc,
    Alr,
    Arr,
    Axs,
    Nop,
    // Write
    Sta,
    Stx,
    Sty,
    Sax,
    // Read-modify-write
    Asl,
    Lsr,
    Rol,
    Ror,
    Inc,
    Dec,
    Slo,
    Rla,
    Sre,
    Rra,
    Dcp,
    Isb,
    // Implied
    Tax,
    Tay,
    Txa,
    Tya,
    Tsx,
    Txs,
    Inx,
    Iny,
    Dex,
    Dey,
    Clc,
    Sec,
    Cli,
    Sei,
    Clv,
    Cld,
    Sed,
    // Branches
    Bpl,
    Bmi,
    Bvc,
    Bvs,
    Bcc,
    Bcs,
    Bne,
    Beq,
    // Stack and control flow
    Pha,
    Php,
    Pla,
    Plp,
    Jmp,
    Jsr,
    Rts,
    Rti,
    Brk,
    Jam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: &'static str,
    pub mode: Mode,
    pub op: Op,
    pub cycles: u8,
}

const JAM: Instruction = Instruction {
    mnemonic: "JAM",
    mode: Mode::Jam,
    op: Op::Jam,
    cycles: 2,
};

const R: Access = Access::Read;
const W: Access = Access::Write;
const M: Access = Access::Modify;

type Def = (u8, &'static str, Mode, Op, u8);

#[rustfmt::skip]
const DEFS: &[Def] = &[
    // Loads
    (0xA9, "LDA", Mode::Immediate, Op::Lda, 2),
    (0xA5, "LDA", Mode::ZeroPage(R), Op::Lda, 3),
    (0xB5, "LDA", Mode::ZeroPageX(R), Op::Lda, 4),
    (0xAD, "LDA", Mode::Absolute(R), Op::Lda, 4),
    (0xBD, "LDA", Mode::AbsoluteX(R), Op::Lda, 4),
    (0xB9, "LDA", Mode::AbsoluteY(R), Op::Lda, 4),
    (0xA1, "LDA", Mode::IndirectX(R), Op::Lda, 6),
    (0xB1, "LDA", Mode::IndirectY(R), Op::Lda, 5),
    (0xA2, "LDX", Mode::Immediate, Op::Ldx, 2),
    (0xA6, "LDX", Mode::ZeroPage(R), Op::Ldx, 3),
    (0xB6, "LDX", Mode::ZeroPageY(R), Op::Ldx, 4),
    (0xAE, "LDX", Mode::Absolute(R), Op::Ldx, 4),
    (0xBE, "LDX", Mode::AbsoluteY(R), Op::Ldx, 4),
    (0xA0, "LDY", Mode::Immediate, Op::Ldy, 2),
    (0xA4, "LDY", Mode::ZeroPage(R), Op::Ldy, 3),
    (0xB4, "LDY", Mode::ZeroPageX(R), Op::Ldy, 4),
    (0xAC, "LDY", Mode::Absolute(R), Op::Ldy, 4),
    (0xBC, "LDY", Mode::AbsoluteX(R), Op::Ldy, 4),
    // Stores
    (0x85, "STA", Mode::ZeroPage(W), Op::Sta, 3),
    (0x95, "STA", Mode::ZeroPageX(W), Op::Sta, 4),
    (0x8D, "STA", Mode::Absolute(W), Op::Sta, 4),
    (0x9D, "STA", Mode::AbsoluteX(W), Op::Sta, 5),
    (0x99, "STA", Mode::AbsoluteY(W), Op::Sta, 5),
    (0x81, "STA", Mode::IndirectX(W), Op::Sta, 6),
    (0x91, "STA", Mode::IndirectY(W), Op::Sta, 6),
    (0x86, "STX", Mode::ZeroPage(W), Op::Stx, 3),
    (0x96, "STX", Mode::ZeroPageY(W), Op::Stx, 4),
    (0x8E, "STX", Mode::Absolute(W), Op::Stx, 4),
    (0x84, "STY", Mode::ZeroPage(W), Op::Sty, 3),
    (0x94, "STY", Mode::ZeroPageX(W), Op::Sty, 4),
    (0x8C, "STY", Mode::Absolute(W), Op::Sty, 4),
    // Arithmetic and logic
    (0x69, "ADC", Mode::Immediate, Op::Adc, 2),
    (0x65, "ADC", Mode::ZeroPage(R), Op::Adc, 3),
    (0x75, "ADC", Mode::ZeroPageX(R), Op::Adc, 4),
    (0x6D, "ADC", Mode::Absolute(R), Op::Adc, 4),
    (0x7D, "ADC", Mode::AbsoluteX(R), Op::Adc, 4),
    (0x79, "ADC", Mode::AbsoluteY(R), Op::Adc, 4),
    (0x61, "ADC", Mode::IndirectX(R), Op::Adc, 6),
    (0x71, "ADC", Mode::IndirectY(R), Op::Adc, 5),
    (0xE9, "SBC", Mode::Immediate, Op::Sbc, 2),
    (0xE5, "SBC", Mode::ZeroPage(R), Op::Sbc, 3),
    (0xF5, "SBC", Mode::ZeroPageX(R), Op::Sbc, 4),
    (0xED, "SBC", Mode::Absolute(R), Op::Sbc, 4),
    (0xFD, "SBC", Mode::AbsoluteX(R), Op::Sbc, 4),
    (0xF9, "SBC", Mode::AbsoluteY(R), Op::Sbc, 4),
    (0xE1, "SBC", Mode::IndirectX(R), Op::Sbc, 6),
    (0xF1, "SBC", Mode::IndirectY(R), Op::Sbc, 5),
    (0x29, "AND", Mode::Immediate, Op::And, 2),
    (0x25, "AND", Mode::ZeroPage(R), Op::And, 3),
    (0x35, "AND", Mode::ZeroPageX(R), Op::And, 4),
    (0x2D, "AND", Mode::Absolute(R), Op::And, 4),
    (0x3D, "AND", Mode::AbsoluteX(R), Op::And, 4),
    (0x39, "AND", Mode::AbsoluteY(R), Op::And, 4),
    (0x21, "AND", Mode::IndirectX(R), Op::And, 6),
    (0x31, "AND", Mode::IndirectY(R), Op::And, 5),
    (0x09, "ORA", Mode::Immediate, Op::Ora, 2),
    (0x05, "ORA", Mode::ZeroPage(R), Op::Ora, 3),
    (0x15, "ORA", Mode::ZeroPageX(R), Op::Ora, 4),
    (0x0D, "ORA", Mode::Absolute(R), Op::Ora, 4),
    (0x1D, "ORA", Mode::AbsoluteX(R), Op::Ora, 4),
    (0x19, "ORA", Mode::AbsoluteY(R), Op::Ora, 4),
    (0x01, "ORA", Mode::IndirectX(R), Op::Ora, 6),
    (0x11, "ORA", Mode::IndirectY(R), Op::Ora, 5),
    (0x49, "EOR", Mode::Immediate, Op::Eor, 2),
    (0x45, "EOR", Mode::ZeroPage(R), Op::Eor, 3),
    (0x55, "EOR", Mode::ZeroPageX(R), Op::Eor, 4),
    (0x4D, "EOR", Mode::Absolute(R), Op::Eor, 4),
    (0x5D, "EOR", Mode::AbsoluteX(R), Op::Eor, 4),
    (0x59, "EOR", Mode::AbsoluteY(R), Op::Eor, 4),
    (0x41, "EOR", Mode::IndirectX(R), Op::Eor, 6),
    (0x51, "EOR", Mode::IndirectY(R), Op::Eor, 5),
    (0xC9, "CMP", Mode::Immediate, Op::Cmp, 2),
    (0xC5, "CMP", Mode::ZeroPage(R), Op::Cmp, 3),
    (0xD5, "CMP", Mode::ZeroPageX(R), Op::Cmp, 4),
    (0xCD, "CMP", Mode::Absolute(R), Op::Cmp, 4),
    (0xDD, "CMP", Mode::AbsoluteX(R), Op::Cmp, 4),
    (0xD9, "CMP", Mode::AbsoluteY(R), Op::Cmp, 4),
    (0xC1, "CMP", Mode::IndirectX(R), Op::Cmp, 6),
    (0xD1, "CMP", Mode::IndirectY(R), Op::Cmp, 5),
    (0xE0, "CPX", Mode::Immediate, Op::Cpx, 2),
    (0xE4, "CPX", Mode::ZeroPage(R), Op::Cpx, 3),
    (0xEC, "CPX", Mode::Absolute(R), Op::Cpx, 4),
    (0xC0, "CPY", Mode::Immediate, Op::Cpy, 2),
    (0xC4, "CPY", Mode::ZeroPage(R), Op::Cpy, 3),
    (0xCC, "CPY", Mode::Absolute(R), Op::Cpy, 4),
    (0x24, "BIT", Mode::ZeroPage(R), Op::Bit, 3),
    (0x2C, "BIT", Mode::Absolute(R), Op::Bit, 4),
    // Shifts, rotates, increments
    (0x0A, "ASL", Mode::Accumulator, Op::Asl, 2),
    (0x06, "ASL", Mode::ZeroPage(M), Op::Asl, 5),
    (0x16, "ASL", Mode::ZeroPageX(M), Op::Asl, 6),
    (0x0E, "ASL", Mode::Absolute(M), Op::Asl, 6),
    (0x1E, "ASL", Mode::AbsoluteX(M), Op::Asl, 7),
    (0x4A, "LSR", Mode::Accumulator, Op::Lsr, 2),
    (0x46, "LSR", Mode::ZeroPage(M), Op::Lsr, 5),
    (0x56, "LSR", Mode::ZeroPageX(M), Op::Lsr, 6),
    (0x4E, "LSR", Mode::Absolute(M), Op::Lsr, 6),
    (0x5E, "LSR", Mode::AbsoluteX(M), Op::Lsr, 7),
    (0x2A, "ROL", Mode::Accumulator, Op::Rol, 2),
    (0x26, "ROL", Mode::ZeroPage(M), Op::Rol, 5),
    (0x36, "ROL", Mode::ZeroPageX(M), Op::Rol, 6),
    (0x2E, "ROL", Mode::Absolute(M), Op::Rol, 6),
    (0x3E, "ROL", Mode::AbsoluteX(M), Op::Rol, 7),
    (0x6A, "ROR", Mode::Accumulator, Op::Ror, 2),
    (0x66, "ROR", Mode::ZeroPage(M), Op::Ror, 5),
    (0x76, "ROR", Mode::ZeroPageX(M), Op::Ror, 6),
    (0x6E, "ROR", Mode::Absolute(M), Op::Ror, 6),
    (0x7E, "ROR", Mode::AbsoluteX(M), Op::Ror, 7),
    (0xE6, "INC", Mode::ZeroPage(M), Op::Inc, 5),
    (0xF6, "INC", Mode::ZeroPageX(M), Op::Inc, 6),
    (0xEE, "INC", Mode::Absolute(M), Op::Inc, 6),
    (0xFE, "INC", Mode::AbsoluteX(M), Op::Inc, 7),
    (0xC6, "DEC", Mode::ZeroPage(M), Op::Dec, 5),
    (0xD6, "DEC", Mode::ZeroPageX(M), Op::Dec, 6),
    (0xCE, "DEC", Mode::Absolute(M), Op::Dec, 6),
    (0xDE, "DEC", Mode::AbsoluteX(M), Op::Dec, 7),
    // Register transfers and flags
    (0xAA, "TAX", Mode::Implied, Op::Tax, 2),
    (0xA8, "TAY", Mode::Implied, Op::Tay, 2),
    (0x8A, "TXA", Mode::Implied, Op::Txa, 2),
    (0x98, "TYA", Mode::Implied, Op::Tya, 2),
    (0xBA, "TSX", Mode::Implied, Op::Tsx, 2),
    (0x9A, "TXS", Mode::Implied, Op::Txs, 2),
    (0xE8, "INX", Mode::Implied, Op::Inx, 2),
    (0xC8, "INY", Mode::Implied, Op::Iny, 2),
    (0xCA, "DEX", Mode::Implied, Op::Dex, 2),
    (0x88, "DEY", Mode::Implied, Op::Dey, 2),
    (0x18, "CLC", Mode::Implied, Op::Clc, 2),
    (0x38, "SEC", Mode::Implied, Op::Sec, 2),
    (0x58, "CLI", Mode::Implied, Op::Cli, 2),
    (0x78, "SEI", Mode::Implied, Op::Sei, 2),
    (0xB8, "CLV", Mode::Implied, Op::Clv, 2),
    (0xD8, "CLD", Mode::Implied, Op::Cld, 2),
    (0xF8, "SED", Mode::Implied, Op::Sed, 2),
    (0xEA, "NOP", Mode::Implied, Op::Nop, 2),
    // Branches
    (0x10, "BPL", Mode::Relative, Op::Bpl, 2),
    (0x30, "BMI", Mode::Relative, Op::Bmi, 2),
    (0x50, "BVC", Mode::Relative, Op::Bvc, 2),
    (0x70, "BVS", Mode::Relative, Op::Bvs, 2),
    (0x90, "BCC", Mode::Relative, Op::Bcc, 2),
    (0xB0, "BCS", Mode::Relative, Op::Bcs, 2),
    (0xD0, "BNE", Mode::Relative, Op::Bne, 2),
    (0xF0, "BEQ", Mode::Relative, Op::Beq, 2),
    // Stack and control flow
    (0x48, "PHA", Mode::Push, Op::Pha, 3),
    (0x08, "PHP", Mode::Push, Op::Php, 3),
    (0x68, "PLA", Mode::Pull, Op::Pla, 4),
    (0x28, "PLP", Mode::Pull, Op::Plp, 4),
    (0x4C, "JMP", Mode::JmpAbsolute, Op::Jmp, 3),
    (0x6C, "JMP", Mode::JmpIndirect, Op::Jmp, 5),
    (0x20, "JSR", Mode::Jsr, Op::Jsr, 6),
    (0x60, "RTS", Mode::Rts, Op::Rts, 6),
    (0x40, "RTI", Mode::Rti, Op::Rti, 6),
    (0x00, "BRK", Mode::Brk, Op::Brk, 7),
    // Unofficial NOPs
    (0x1A, "NOP", Mode::Implied, Op::Nop, 2),
    (0x3A, "NOP", Mode::Implied, Op::Nop, 2),
    (0x5A, "NOP", Mode::Implied, Op::Nop, 2),
    (0x7A, "NOP", Mode::Implied, Op::Nop, 2),
    (0xDA, "NOP", Mode::Implied, Op::Nop, 2),
    (0xFA, "NOP", Mode::Implied, Op::Nop, 2),
    (0x80, "NOP", Mode::Immediate, Op::Nop, 2),
    (0x82, "NOP", Mode::Immediate, Op::Nop, 2),
    (0x89, "NOP", Mode::Immediate, Op::Nop, 2),
    (0xC2, "NOP", Mode::Immediate, Op::Nop, 2),
    (0xE2, "NOP", Mode::Immediate, Op::Nop, 2),
    (0x04, "NOP", Mode::ZeroPage(R), Op::Nop, 3),
    (0x44, "NOP", Mode::ZeroPage(R), Op::Nop, 3),
    (0x64, "NOP", Mode::ZeroPage(R), Op::Nop, 3),
    (0x14, "NOP", Mode::ZeroPageX(R), Op::Nop, 4),
    (0x34, "NOP", Mode::ZeroPageX(R), Op::Nop, 4),
    (0x54, "NOP", Mode::ZeroPageX(R), Op::Nop, 4),
    (0x74, "NOP", Mode::ZeroPageX(R), Op::Nop, 4),
    (0xD4, "NOP", Mode::ZeroPageX(R), Op::Nop, 4),
    (0xF4, "NOP", Mode::ZeroPageX(R), Op::Nop, 4),
    (0x0C, "NOP", Mode::Absolute(R), Op::Nop, 4),
    (0x1C, "NOP", Mode::AbsoluteX(R), Op::Nop, 4),
    (0x3C, "NOP", Mode::AbsoluteX(R), Op::Nop, 4),
    (0x5C, "NOP", Mode::AbsoluteX(R), Op::Nop, 4),
    (0x7C, "NOP", Mode::AbsoluteX(R), Op::Nop, 4),
    (0xDC, "NOP", Mode::AbsoluteX(R), Op::Nop, 4),
    (0xFC, "NOP", Mode::AbsoluteX(R), Op::Nop, 4),
    // Unofficial loads and stores
    (0xA7, "LAX", Mode::ZeroPage(R), Op::Lax, 3),
    (0xB7, "LAX", Mode::ZeroPageY(R), Op::Lax, 4),
    (0xAF, "LAX", Mode::Absolute(R), Op::Lax, 4),
    (0xBF, "LAX", Mode::AbsoluteY(R), Op::Lax, 4),
    (0xA3, "LAX", Mode::IndirectX(R), Op::Lax, 6),
    (0xB3, "LAX", Mode::IndirectY(R), Op::Lax, 5),
    (0x87, "SAX", Mode::ZeroPage(W), Op::Sax, 3),
    (0x97, "SAX", Mode::ZeroPageY(W), Op::Sax, 4),
    (0x8F, "SAX", Mode::Absolute(W), Op::Sax, 4),
    (0x83, "SAX", Mode::IndirectX(W), Op::Sax, 6),
    // Unofficial immediates
    (0xEB, "SBC", Mode::Immediate, Op::Sbc, 2),
    (0x0B, "ANC", Mode::Immediate, Op::Anc, 2),
    (0x2B, "ANC", Mode::Immediate, Op::Anc, 2),
    (0x4B, "ALR", Mode::Immediate, Op::Alr, 2),
    (0x6B, "ARR", Mode::Immediate, Op::Arr, 2),
    (0xCB, "AXS", Mode::Immediate, Op::Axs, 2),
    // Unofficial read-modify-write combinations
    (0xC7, "DCP", Mode::ZeroPage(M), Op::Dcp, 5),
    (0xD7, "DCP", Mode::ZeroPageX(M), Op::Dcp, 6),
    (0xCF, "DCP", Mode::Absolute(M), Op::Dcp, 6),
    (0xDF, "DCP", Mode::AbsoluteX(M), Op::Dcp, 7),
    (0xDB, "DCP", Mode::AbsoluteY(M), Op::Dcp, 7),
    (0xC3, "DCP", Mode::IndirectX(M), Op::Dcp, 8),
    (0xD3, "DCP", Mode::IndirectY(M), Op::Dcp, 8),
    (0xE7, "ISB", Mode::ZeroPage(M), Op::Isb, 5),
    (0xF7, "ISB", Mode::ZeroPageX(M), Op::Isb, 6),
    (0xEF, "ISB", Mode::Absolute(M), Op::Isb, 6),
    (0xFF, "ISB", Mode::AbsoluteX(M), Op::Isb, 7),
    (0xFB, "ISB", Mode::AbsoluteY(M), Op::Isb, 7),
    (0xE3, "ISB", Mode::IndirectX(M), Op::Isb, 8),
    (0xF3, "ISB", Mode::IndirectY(M), Op::Isb, 8),
    (0x07, "SLO", Mode::ZeroPage(M), Op::Slo, 5),
    (0x17, "SLO", Mode::ZeroPageX(M), Op::Slo, 6),
    (0x0F, "SLO", Mode::Absolute(M), Op::Slo, 6),
    (0x1F, "SLO", Mode::AbsoluteX(M), Op::Slo, 7),
    (0x1B, "SLO", Mode::AbsoluteY(M), Op::Slo, 7),
    (0x03, "SLO", Mode::IndirectX(M), Op::Slo, 8),
    (0x13, "SLO", Mode::IndirectY(M), Op::Slo, 8),
    (0x27, "RLA", Mode::ZeroPage(M), Op::Rla, 5),
    (0x37, "RLA", Mode::ZeroPageX(M), Op::Rla, 6),
    (0x2F, "RLA", Mode::Absolute(M), Op::Rla, 6),
    (0x3F, "RLA", Mode::AbsoluteX(M), Op::Rla, 7),
    (0x3B, "RLA", Mode::AbsoluteY(M), Op::Rla, 7),
    (0x23, "RLA", Mode::IndirectX(M), Op::Rla, 8),
    (0x33, "RLA", Mode::IndirectY(M), Op::Rla, 8),
    (0x47, "SRE", Mode::ZeroPage(M), Op::Sre, 5),
    (0x57, "SRE", Mode::ZeroPageX(M), Op::Sre, 6),
    (0x4F, "SRE", Mode::Absolute(M), Op::Sre, 6),
    (0x5F, "SRE", Mode::AbsoluteX(M), Op::Sre, 7),
    (0x5B, "SRE", Mode::AbsoluteY(M), Op::Sre, 7),
    (0x43, "SRE", Mode::IndirectX(M), Op::Sre, 8),
    (0x53, "SRE", Mode::IndirectY(M), Op::Sre, 8),
    (0x67, "RRA", Mode::ZeroPage(M), Op::Rra, 5),
    (0x77, "RRA", Mode::ZeroPageX(M), Op::Rra, 6),
    (0x6F, "RRA", Mode::Absolute(M), Op::Rra, 6),
    (0x7F, "RRA", Mode::AbsoluteX(M), Op::Rra, 7),
    (0x7B, "RRA", Mode::AbsoluteY(M), Op::Rra, 7),
    (0x63, "RRA", Mode::IndirectX(M), Op::Rra, 8),
    (0x73, "RRA", Mode::IndirectY(M), Op::Rra, 8),
];

/// Pairs allowed to appear under more than one opcode.
fn is_alias(mode: Mode, op: Op) -> bool {
    matches!(op, Op::Nop | Op::Jam | Op::Anc) || (op == Op::Sbc && mode == Mode::Immediate)
}

fn build() -> [Instruction; 256] {
    let mut table = [JAM; 256];
    for &(opcode, mnemonic, mode, op, cycles) in DEFS {
        if table[opcode as usize].op != Op::Jam {
            crate::trap!("opcode ${:02X} defined twice", opcode);
        }
        table[opcode as usize] = Instruction {
            mnemonic,
            mode,
            op,
            cycles,
        };
    }
    table
}

/// Table problems found, one message per offending opcode.
pub fn validate_table(table: &[Instruction; 256]) -> Vec<String> {
    let mut problems = Vec::new();
    let mut seen: std::collections::HashMap<(Mode, Op), u8> = std::collections::HashMap::new();

    for (opcode, instr) in table.iter().enumerate() {
        let opcode = opcode as u8;
        if instr.cycles != instr.mode.base_cycles() {
            problems.push(format!(
                "${:02X} {} declares {} cycles, its mode takes {}",
                opcode,
                instr.mnemonic,
                instr.cycles,
                instr.mode.base_cycles()
            ));
        }
        if is_alias(instr.mode, instr.op) {
            continue;
        }
        if let Some(first) = seen.insert((instr.mode, instr.op), opcode) {
            problems.push(format!(
                "${:02X} and ${:02X} both decode to {} {:?}",
                first, opcode, instr.mnemonic, instr.mode
            ));
        }
    }
    problems
}

/// The validated opcode table.
pub fn table() -> &'static [Instruction; 256] {
    static TABLE: OnceLock<[Instruction; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let table = build();
        for problem in validate_table(&table) {
            crate::trap!("instruction table: {}", problem);
        }
        table
    })
}

#[inline]
pub fn decode(opcode: u8) -> &'static Instruction {
    &table()[opcode as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_passes_validation() {
        assert!(validate_table(table()).is_empty());
    }

    #[test]
    fn duplicate_pair_is_reported() {
        let mut t = *table();
        t[0x02] = t[0xA9];
        let problems = validate_table(&t);
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("$02"));
        assert!(problems[0].contains("$A9"));
    }

    #[test]
    fn wrong_cycle_count_is_reported() {
        let mut t = *table();
        t[0xAD].cycles = 5;
        assert_eq!(validate_table(&t).len(), 1);
    }

    #[test]
    fn decoded_opcode_count() {
        let decoded = (0..=255u8)
            .filter(|&op| {
                let i = decode(op);
                !matches!(i.op, Op::Jam)
            })
            .count();
        // 151 official and 85 unofficial; 20 remain JAM.
        assert_eq!(decoded, 236);
    }

    #[test]
    fn spot_checks() {
        assert_eq!(decode(0x6C).mode, Mode::JmpIndirect);
        assert_eq!(decode(0x91).mode, Mode::IndirectY(Access::Write));
        assert_eq!(decode(0xFE).cycles, 7);
        assert_eq!(decode(0x02).op, Op::Jam);
        assert_eq!(decode(0x8B).op, Op::Jam);
    }
}
