/*!
Standard controller behind $4016/$4017.

Buttons are a bitmask in the order the CPU shifts them out:
A, B, Select, Start, Up, Down, Left, Right (bit 0 through bit 7).

- A write to $4016 sets the strobe from bit 0. While the strobe is high the
  shift register reloads continuously and every read returns the A button.
- With the strobe low each read returns the next bit. After eight reads the
  register reports 1.
*/

use crate::archive::{Archive, ArchiveError, SaveState};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Button {
    A,
    B,
    Select,
    Start,
    Up,
    Down,
    Left,
    Right,
}

impl Button {
    #[inline]
    pub fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

#[derive(Clone, Debug, Default)]
pub struct Controller {
    buttons: u8,
    shift: u8,
    strobe: bool,
    reads: u8,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_button(&mut self, button: Button, pressed: bool) {
        if pressed {
            self.buttons |= button.mask();
        } else {
            self.buttons &= !button.mask();
        }
    }

    /// Replace the whole button state. Bit set = pressed.
    pub fn set_state_mask(&mut self, mask: u8) {
        self.buttons = mask;
    }

    pub fn state_mask(&self) -> u8 {
        self.buttons
    }

    pub fn write_strobe(&mut self, value: u8) {
        self.strobe = value & 1 != 0;
        if self.strobe {
            self.reload();
        }
    }

    pub fn read(&mut self) -> u8 {
        if self.strobe {
            self.reload();
            return self.shift & 1;
        }
        let bit = self.peek();
        if self.reads < 8 {
            self.reads += 1;
        }
        bit
    }

    /// Next bit without shifting.
    pub fn peek(&self) -> u8 {
        if self.strobe {
            self.buttons & 1
        } else if self.reads < 8 {
            (self.shift >> self.reads) & 1
        } else {
            1
        }
    }

    #[inline]
    fn reload(&mut self) {
        self.shift = self.buttons;
        self.reads = 0;
    }
}

impl SaveState for Controller {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_u8(self.buttons);
        ar.write_u8(self.shift);
        ar.write_bool(self.strobe);
        ar.write_u8(self.reads);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.buttons = ar.read_u8()?;
        self.shift = ar.read_u8()?;
        self.strobe = ar.read_bool()?;
        self.reads = ar.read_u8()?;
        Ok(())
    }
}
