/*!
execute.rs - operation handlers.

Operations only transform registers and operand values. Bus traffic and
timing belong to the addressing-mode handlers, which call in here at the
cycle where the operand is available:

- `exec_read`: operand consumed (loads, ALU, compares, BIT, LAX, NOP reads)
- `exec_write`: value to store (STA/STX/STY/SAX)
- `exec_modify`: read-modify-write transformation, including the unofficial
  combined forms (SLO, RLA, SRE, RRA, DCP, ISB)
- `exec_implied`: register-only instructions
- `branch_taken`: branch condition

Decimal mode is ignored: the 2A03 has no BCD adder.
*/

use crate::cpu::state::{CARRY, CpuState, DECIMAL, IRQ_DISABLE, NEGATIVE, OVERFLOW, ZERO};
use crate::cpu::table::Op;

impl CpuState {
    pub(crate) fn exec_read(&mut self, op: Op, v: u8) {
        match op {
            Op::Lda => {
                self.a = v;
                self.update_zn(v);
            }
            Op::Ldx => {
                self.x = v;
                self.update_zn(v);
            }
            Op::Ldy => {
                self.y = v;
                self.update_zn(v);
            }
            Op::Lax => {
                self.a = v;
                self.x = v;
                self.update_zn(v);
            }
            Op::Adc => self.adc(v),
            Op::Sbc => self.adc(!v),
            Op::And => {
                self.a &= v;
                self.update_zn(self.a);
            }
            Op::Ora => {
                self.a |= v;
                self.update_zn(self.a);
            }
            Op::Eor => {
                self.a ^= v;
                self.update_zn(self.a);
            }
            Op::Cmp => self.compare(self.a, v),
            Op::Cpx => self.compare(self.x, v),
            Op::Cpy => self.compare(self.y, v),
            Op::Bit => {
                self.assign_flag(ZERO, self.a & v == 0);
                self.assign_flag(NEGATIVE, v & 0x80 != 0);
                self.assign_flag(OVERFLOW, v & 0x40 != 0);
            }
            Op::Anc => {
                self.a &= v;
                self.update_zn(self.a);
                self.assign_flag(CARRY, self.a & 0x80 != 0);
            }
            Op::Alr => {
                self.a &= v;
                self.a = self.lsr(self.a);
            }
            Op::Arr => {
                let t = self.a & v;
                let r = (t >> 1) | (self.carry() << 7);
                self.a = r;
                self.update_zn(r);
                self.assign_flag(CARRY, r & 0x40 != 0);
                self.assign_flag(OVERFLOW, ((r >> 6) ^ (r >> 5)) & 1 != 0);
            }
            Op::Axs => {
                let t = self.a & self.x;
                self.assign_flag(CARRY, t >= v);
                self.x = t.wrapping_sub(v);
                self.update_zn(self.x);
            }
            Op::Nop => {}
            _ => crate::trap!("{:?} is not a read operation", op),
        }
    }

    pub(crate) fn exec_write(&self, op: Op) -> u8 {
        match op {
            Op::Sta => self.a,
            Op::Stx => self.x,
            Op::Sty => self.y,
            Op::Sax => self.a & self.x,
            _ => {
                crate::trap!("{:?} is not a write operation", op);
                0
            }
        }
    }

    pub(crate) fn exec_modify(&mut self, op: Op, v: u8) -> u8 {
        match op {
            Op::Asl => self.asl(v),
            Op::Lsr => self.lsr(v),
            Op::Rol => self.rol(v),
            Op::Ror => self.ror(v),
            Op::Inc => {
                let r = v.wrapping_add(1);
                self.update_zn(r);
                r
            }
            Op::Dec => {
                let r = v.wrapping_sub(1);
                self.update_zn(r);
                r
            }
            Op::Slo => {
                let r = self.asl(v);
                self.a |= r;
                self.update_zn(self.a);
                r
            }
            Op::Rla => {
                let r = self.rol(v);
                self.a &= r;
                self.update_zn(self.a);
                r
            }
            Op::Sre => {
                let r = self.lsr(v);
                self.a ^= r;
                self.update_zn(self.a);
                r
            }
            Op::Rra => {
                let r = self.ror(v);
                self.adc(r);
                r
            }
            Op::Dcp => {
                let r = v.wrapping_sub(1);
                self.compare(self.a, r);
                r
            }
            Op::Isb => {
                let r = v.wrapping_add(1);
                self.adc(!r);
                r
            }
            _ => {
                crate::trap!("{:?} is not a read-modify-write operation", op);
                v
            }
        }
    }

    pub(crate) fn exec_implied(&mut self, op: Op) {
        match op {
            Op::Tax => {
                self.x = self.a;
                self.update_zn(self.x);
            }
            Op::Tay => {
                self.y = self.a;
                self.update_zn(self.y);
            }
            Op::Txa => {
                self.a = self.x;
                self.update_zn(self.a);
            }
            Op::Tya => {
                self.a = self.y;
                self.update_zn(self.a);
            }
            Op::Tsx => {
                self.x = self.sp;
                self.update_zn(self.x);
            }
            Op::Txs => self.sp = self.x,
            Op::Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zn(self.x);
            }
            Op::Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zn(self.y);
            }
            Op::Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zn(self.x);
            }
            Op::Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zn(self.y);
            }
            Op::Clc => self.assign_flag(CARRY, false),
            Op::Sec => self.assign_flag(CARRY, true),
            Op::Cli => self.assign_flag(IRQ_DISABLE, false),
            Op::Sei => self.assign_flag(IRQ_DISABLE, true),
            Op::Clv => self.assign_flag(OVERFLOW, false),
            Op::Cld => self.assign_flag(DECIMAL, false),
            Op::Sed => self.assign_flag(DECIMAL, true),
            Op::Nop => {}
            _ => crate::trap!("{:?} is not an implied operation", op),
        }
    }

    pub(crate) fn branch_taken(&self, op: Op) -> bool {
        match op {
            Op::Bpl => !self.is_flag_set(NEGATIVE),
            Op::Bmi => self.is_flag_set(NEGATIVE),
            Op::Bvc => !self.is_flag_set(OVERFLOW),
            Op::Bvs => self.is_flag_set(OVERFLOW),
            Op::Bcc => !self.is_flag_set(CARRY),
            Op::Bcs => self.is_flag_set(CARRY),
            Op::Bne => !self.is_flag_set(ZERO),
            Op::Beq => self.is_flag_set(ZERO),
            _ => false,
        }
    }

    /// Binary add with carry. V = (A ^ r) & (M ^ r) & 0x80.
    fn adc(&mut self, v: u8) {
        let sum = self.a as u16 + v as u16 + self.carry() as u16;
        let r = sum as u8;
        self.assign_flag(CARRY, sum > 0xFF);
        self.assign_flag(OVERFLOW, (self.a ^ r) & (v ^ r) & 0x80 != 0);
        self.a = r;
        self.update_zn(r);
    }

    fn compare(&mut self, reg: u8, v: u8) {
        self.assign_flag(CARRY, reg >= v);
        self.update_zn(reg.wrapping_sub(v));
    }

    fn asl(&mut self, v: u8) -> u8 {
        let r = v << 1;
        self.assign_flag(CARRY, v & 0x80 != 0);
        self.update_zn(r);
        r
    }

    fn lsr(&mut self, v: u8) -> u8 {
        let r = v >> 1;
        self.assign_flag(CARRY, v & 0x01 != 0);
        self.update_zn(r);
        r
    }

    fn rol(&mut self, v: u8) -> u8 {
        let r = (v << 1) | self.carry();
        self.assign_flag(CARRY, v & 0x80 != 0);
        self.update_zn(r);
        r
    }

    fn ror(&mut self, v: u8) -> u8 {
        let r = (v >> 1) | (self.carry() << 7);
        self.assign_flag(CARRY, v & 0x01 != 0);
        self.update_zn(r);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::state::UNUSED;

    fn state(a: u8, status: u8) -> CpuState {
        CpuState {
            a,
            status: status | UNUSED,
            ..CpuState::new()
        }
    }

    #[test]
    fn adc_signed_overflow() {
        let mut s = state(0x50, 0);
        s.exec_read(Op::Adc, 0x50);
        assert_eq!(s.a, 0xA0);
        assert!(s.is_flag_set(OVERFLOW));
        assert!(!s.is_flag_set(CARRY));
        assert!(s.is_flag_set(NEGATIVE));
        assert!(!s.is_flag_set(ZERO));
    }

    #[test]
    fn adc_carry_out_and_zero() {
        let mut s = state(0xFF, CARRY);
        s.exec_read(Op::Adc, 0x00);
        assert_eq!(s.a, 0x00);
        assert!(s.is_flag_set(CARRY));
        assert!(s.is_flag_set(ZERO));
        assert!(!s.is_flag_set(OVERFLOW));
    }

    #[test]
    fn sbc_borrow_and_overflow() {
        // 0x50 - 0xB0 with carry set: 0xA0, signed overflow, borrow.
        let mut s = state(0x50, CARRY);
        s.exec_read(Op::Sbc, 0xB0);
        assert_eq!(s.a, 0xA0);
        assert!(s.is_flag_set(OVERFLOW));
        assert!(!s.is_flag_set(CARRY));
    }

    #[test]
    fn decimal_flag_does_not_change_adc() {
        let mut s = state(0x09, DECIMAL);
        s.exec_read(Op::Adc, 0x01);
        assert_eq!(s.a, 0x0A);
    }

    #[test]
    fn compare_sets_carry_when_greater_or_equal() {
        let mut s = state(0x40, 0);
        s.exec_read(Op::Cmp, 0x40);
        assert!(s.is_flag_set(CARRY) && s.is_flag_set(ZERO));
        s.exec_read(Op::Cmp, 0x41);
        assert!(!s.is_flag_set(CARRY));
        assert!(s.is_flag_set(NEGATIVE));
    }

    #[test]
    fn bit_copies_operand_bits() {
        let mut s = state(0x01, 0);
        s.exec_read(Op::Bit, 0xC0);
        assert!(s.is_flag_set(ZERO));
        assert!(s.is_flag_set(NEGATIVE));
        assert!(s.is_flag_set(OVERFLOW));
    }

    #[test]
    fn rotates_through_carry() {
        let mut s = state(0, CARRY);
        assert_eq!(s.exec_modify(Op::Rol, 0x80), 0x01);
        assert!(s.is_flag_set(CARRY));
        assert_eq!(s.exec_modify(Op::Ror, 0x00), 0x80);
        assert!(!s.is_flag_set(CARRY));
    }

    #[test]
    fn unofficial_combined_ops() {
        let mut s = state(0x10, 0);
        assert_eq!(s.exec_modify(Op::Dcp, 0x11), 0x10);
        assert!(s.is_flag_set(ZERO) && s.is_flag_set(CARRY));

        let mut s = state(0x01, 0);
        assert_eq!(s.exec_modify(Op::Slo, 0x40), 0x80);
        assert_eq!(s.a, 0x81);

        let mut s = state(0x05, CARRY);
        assert_eq!(s.exec_modify(Op::Isb, 0x01), 0x02);
        assert_eq!(s.a, 0x03);

        let mut s = state(0xFF, 0);
        s.x = 0x0F;
        s.exec_read(Op::Axs, 0x05);
        assert_eq!(s.x, 0x0A);
        assert!(s.is_flag_set(CARRY));
    }

    #[test]
    fn arr_flags() {
        let mut s = state(0xFF, CARRY);
        s.exec_read(Op::Arr, 0xFF);
        assert_eq!(s.a, 0xFF);
        assert!(s.is_flag_set(CARRY));
        assert!(!s.is_flag_set(OVERFLOW));
    }

    #[test]
    fn txs_leaves_flags_alone() {
        let mut s = state(0, 0);
        s.x = 0x00;
        s.exec_implied(Op::Txs);
        assert_eq!(s.sp, 0);
        assert!(!s.is_flag_set(ZERO));
    }
}
