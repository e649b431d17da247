/*!
APU register stub.

No audio is synthesised. The stub keeps the CPU-visible side of $4000-$4017
consistent so software that polls or configures the APU keeps running:

- $4000-$4013: channel registers are latched and ignored.
- $4015 write: channel enable mask (bits 0..4). Read: enable mask as "active"
  bits, bit 6 frame IRQ, bit 7 DMC IRQ. Reading clears the frame IRQ flag.
- $4017 write: bit 7 selects the 5-step sequence (no IRQ), bit 6 inhibits and
  clears the frame IRQ.

The frame sequencer is reduced to its IRQ: in 4-step mode the flag is raised
once every 29830 CPU cycles unless inhibited.
*/

use crate::archive::{Archive, ArchiveError, SaveState};

/// CPU cycles per 4-step frame sequence (NTSC).
const FOUR_STEP_PERIOD: u32 = 29830;

#[derive(Clone, Debug)]
pub struct Apu {
    regs: [u8; 0x18],
    enabled_mask: u8,
    five_step: bool,
    irq_inhibit: bool,
    frame_irq: bool,
    dmc_irq: bool,
    frame_cycle: u32,
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Apu {
    pub fn new() -> Self {
        Self {
            regs: [0; 0x18],
            enabled_mask: 0,
            five_step: false,
            irq_inhibit: false,
            frame_irq: false,
            dmc_irq: false,
            frame_cycle: 0,
        }
    }

    /// Reset silences every channel and restarts the sequencer. The $4017
    /// mode bits survive, as on hardware.
    pub fn reset(&mut self) {
        self.enabled_mask = 0;
        self.frame_irq = false;
        self.dmc_irq = false;
        self.frame_cycle = 0;
    }

    pub fn write_reg(&mut self, addr: u16, value: u8) {
        if !(0x4000..=0x4017).contains(&addr) {
            return;
        }
        self.regs[(addr - 0x4000) as usize] = value;

        match addr {
            0x4015 => {
                self.enabled_mask = value & 0x1F;
                self.dmc_irq = false;
            }
            0x4017 => {
                self.five_step = value & 0x80 != 0;
                self.irq_inhibit = value & 0x40 != 0;
                if self.irq_inhibit {
                    self.frame_irq = false;
                }
                self.frame_cycle = 0;
            }
            _ => {}
        }
    }

    /// $4015 is the only readable APU register. Returns `None` for the
    /// write-only ones so the bus can answer with open bus.
    pub fn read_reg(&mut self, addr: u16) -> Option<u8> {
        (addr == 0x4015).then(|| self.read_status())
    }

    /// Side-effect-free view of $4015.
    pub fn peek_status(&self) -> u8 {
        let mut status = self.enabled_mask;
        if self.frame_irq {
            status |= 0x40;
        }
        if self.dmc_irq {
            status |= 0x80;
        }
        status
    }

    fn read_status(&mut self) -> u8 {
        let status = self.peek_status();
        self.frame_irq = false;
        status
    }

    /// Level of the APU's contribution to the CPU IRQ line.
    pub fn irq_asserted(&self) -> bool {
        self.frame_irq || self.dmc_irq
    }

    /// Advance one CPU cycle.
    pub fn tick(&mut self) {
        self.frame_cycle += 1;
        if self.frame_cycle >= FOUR_STEP_PERIOD {
            self.frame_cycle = 0;
            if !self.five_step && !self.irq_inhibit {
                self.frame_irq = true;
            }
        }
    }
}

impl SaveState for Apu {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_bytes(&self.regs);
        ar.write_u8(self.enabled_mask);
        ar.write_bool(self.five_step);
        ar.write_bool(self.irq_inhibit);
        ar.write_bool(self.frame_irq);
        ar.write_bool(self.dmc_irq);
        ar.write_u32(self.frame_cycle);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        ar.read_into(&mut self.regs)?;
        self.enabled_mask = ar.read_u8()?;
        self.five_step = ar.read_bool()?;
        self.irq_inhibit = ar.read_bool()?;
        self.frame_irq = ar.read_bool()?;
        self.dmc_irq = ar.read_bool()?;
        self.frame_cycle = ar.read_u32()?;
        Ok(())
    }
}
