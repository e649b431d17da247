#![doc = r#"
PPU CPU ports

Purpose
- CPU-visible register semantics for $2000-$2007 (mirrored through $3FFF).

Notes
- Every write refreshes the open-bus latch; write-only ports read back the
  latch. PPUSTATUS drives only its top three bits.
- PPUDATA reads below $3F00 return the internal buffer and refill it.
  Palette reads return immediately and refill the buffer from the nametable
  underneath.
- A PPUDATA access while rendering bumps `v` with the coarse-X and Y
  increments instead of the normal +1/+32.
- Reading PPUSTATUS one dot before vblank starts returns it clear and
  suppresses both the flag and the NMI for that frame.
"#]

use super::*;

impl Ppu {
    /// CPU read of a PPU port. `addr` may be any mirror in $2000-$3FFF.
    pub fn cpu_read<B: IoBus + ?Sized>(&mut self, addr: u16, bus: &mut B) -> u8 {
        let value = match addr & 0x0007 {
            2 => {
                if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
                    self.suppress_vblank = true;
                }
                let v = (self.status.bits() & 0xE0) | (self.open_bus & 0x1F);
                self.status.remove(PpuStatus::VBLANK);
                self.w = false;
                v
            }
            4 => self.oam_byte(self.oam_addr),
            7 => self.read_data(bus),
            _ => self.open_bus,
        };
        self.open_bus = value;
        value
    }

    /// CPU write of a PPU port. `addr` may be any mirror in $2000-$3FFF.
    pub fn cpu_write<B: IoBus + ?Sized>(&mut self, addr: u16, value: u8, bus: &mut B) {
        self.open_bus = value;
        match addr & 0x0007 {
            0 => {
                let was_enabled = self.ctrl.contains(PpuCtrl::NMI_ENABLE);
                self.ctrl = PpuCtrl::from_bits_retain(value);
                self.t.set_nametable(value & 0x03);
                if !was_enabled
                    && self.ctrl.contains(PpuCtrl::NMI_ENABLE)
                    && self.status.contains(PpuStatus::VBLANK)
                {
                    bus.signal_nmi();
                }
            }
            1 => self.mask = PpuMask::from_bits_retain(value),
            2 => {}
            3 => self.oam_addr = value,
            4 => self.write_oam_data(value),
            5 => {
                if !self.w {
                    self.t.set_coarse_x(value >> 3);
                    self.fine_x = value & 0x07;
                } else {
                    self.t.set_coarse_y(value >> 3);
                    self.t.set_fine_y(value & 0x07);
                }
                self.w = !self.w;
            }
            6 => {
                if !self.w {
                    self.t.set_high(value);
                } else {
                    self.t.set_low(value);
                    self.v = self.t;
                }
                self.w = !self.w;
            }
            _ => {
                let addr = self.v.raw();
                self.mem_write(bus, addr, value);
                self.step_data_address();
            }
        }
    }

    /// Side-effect-free view of a port for debuggers and trace logging.
    pub fn peek_register(&self, addr: u16) -> u8 {
        match addr & 0x0007 {
            2 => (self.status.bits() & 0xE0) | (self.open_bus & 0x1F),
            4 => self.oam_byte(self.oam_addr),
            7 => {
                let addr = self.v.raw() & 0x3FFF;
                if addr >= 0x3F00 {
                    (self.mem.read_palette(addr) & self.grayscale_mask()) | (self.open_bus & 0xC0)
                } else {
                    self.read_buffer
                }
            }
            _ => self.open_bus,
        }
    }

    fn read_data<B: IoBus + ?Sized>(&mut self, bus: &mut B) -> u8 {
        let addr = self.v.raw() & 0x3FFF;
        let value = if addr >= 0x3F00 {
            self.read_buffer = self.mem_read(bus, addr - 0x1000);
            (self.mem.read_palette(addr) & self.grayscale_mask()) | (self.open_bus & 0xC0)
        } else {
            let buffered = self.read_buffer;
            self.read_buffer = self.mem_read(bus, addr);
            buffered
        };
        self.step_data_address();
        value
    }

    fn step_data_address(&mut self) {
        if self.rendering_enabled() && self.on_render_line() {
            self.v.increment_x();
            self.v.increment_y();
        } else {
            self.v.advance(self.ctrl.vram_increment());
        }
    }

    /// Attribute bytes have no storage for bits 2-4.
    fn oam_byte(&self, index: u8) -> u8 {
        let v = self.oam[index as usize];
        if index & 0x03 == 2 {
            v & 0xE3
        } else {
            v
        }
    }

    #[inline]
    pub(crate) fn grayscale_mask(&self) -> u8 {
        if self.mask.contains(PpuMask::GRAYSCALE) {
            0x30
        } else {
            0x3F
        }
    }
}
