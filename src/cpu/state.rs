/*!
state.rs - 6502 architectural registers and status flag helpers.

6502 Status Register Bit Layout
===============================
Bit: 7 6 5 4 3 2 1 0
     N V 1 B D I Z C
Where:
  N = NEGATIVE
  V = OVERFLOW
  1 = UNUSED (always reads as 1)
  B = BREAK (only exists in the copy pushed by PHP/BRK)
  D = DECIMAL (stored, never used for arithmetic on the 2A03)
  I = IRQ_DISABLE
  Z = ZERO
  C = CARRY
*/

use crate::archive::{Archive, ArchiveError, SaveState};

/// Processor status flag bit masks.
pub const CARRY: u8 = 0b0000_0001;
pub const ZERO: u8 = 0b0000_0010;
pub const IRQ_DISABLE: u8 = 0b0000_0100;
pub const DECIMAL: u8 = 0b0000_1000;
pub const BREAK: u8 = 0b0001_0000;
pub const UNUSED: u8 = 0b0010_0000;
pub const OVERFLOW: u8 = 0b0100_0000;
pub const NEGATIVE: u8 = 0b1000_0000;

/// Registers visible to software.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuState {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
}

impl Default for CpuState {
    /// Power-on values. SP starts at 0 and the reset sequence moves it to $FD.
    fn default() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0x00,
            pc: 0x0000,
            status: IRQ_DISABLE | UNUSED,
        }
    }
}

impl CpuState {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_flag_set(&self, mask: u8) -> bool {
        self.status & mask != 0
    }

    #[inline]
    pub fn assign_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    #[inline]
    pub fn update_zn(&mut self, v: u8) {
        self.assign_flag(ZERO, v == 0);
        self.assign_flag(NEGATIVE, v & 0x80 != 0);
    }

    #[inline]
    pub fn carry(&self) -> u8 {
        self.status & CARRY
    }

    /// Status as pushed by PHP/BRK (B and bit 5 set).
    #[inline]
    pub fn status_for_push(&self, brk: bool) -> u8 {
        let p = self.status | UNUSED;
        if brk { p | BREAK } else { p & !BREAK }
    }

    /// Status as restored by PLP/RTI: B dropped, bit 5 forced.
    #[inline]
    pub fn restore_status(&mut self, v: u8) {
        self.status = (v & !BREAK) | UNUSED;
    }

    #[inline]
    pub fn stack_addr(&self) -> u16 {
        0x0100 | self.sp as u16
    }
}

impl SaveState for CpuState {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_u8(self.a);
        ar.write_u8(self.x);
        ar.write_u8(self.y);
        ar.write_u8(self.sp);
        ar.write_u16(self.pc);
        ar.write_u8(self.status);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.a = ar.read_u8()?;
        self.x = ar.read_u8()?;
        self.y = ar.read_u8()?;
        self.sp = ar.read_u8()?;
        self.pc = ar.read_u16()?;
        self.status = ar.read_u8()? | UNUSED;
        Ok(())
    }
}
