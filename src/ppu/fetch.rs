#![doc = r#"
Background fetch pipeline

Purpose
- Per-dot nametable / attribute / pattern fetches into latches, and the
  16-bit shift registers the pixel output reads from.

Timing (rendering lines only)
- Fetch dots 1-256 and 321-336 run an 8-dot cycle keyed on (dot - 1) % 8:
  0 reload shifters + nametable byte, 2 attribute, 4 pattern low,
  6 pattern high, 7 coarse-X increment.
- Shifters move one bit per dot at 2-257 and 322-337.
- Dot 256 increments Y, dot 257 copies horizontal bits from `t`,
  pre-render dots 280-304 copy vertical bits.
- Dots 337 and 339 issue the two unused nametable fetches.
"#]

use super::*;

impl Ppu {
    pub(in crate::ppu) fn background_step<B: IoBus + ?Sized>(&mut self, bus: &mut B) {
        let dot = self.dot;
        let fetch_window = (1..=256).contains(&dot) || (321..=336).contains(&dot);

        if (2..=257).contains(&dot) || (322..=337).contains(&dot) {
            self.shift_background();
        }

        if fetch_window {
            match (dot - 1) % 8 {
                0 => {
                    self.reload_background_shifters();
                    self.next_tile = self.mem_read(bus, self.v.tile_address());
                }
                2 => {
                    let attr = self.mem_read(bus, self.v.attribute_address());
                    self.next_attr = (attr >> self.v.attribute_shift()) & 0x03;
                }
                4 => {
                    let addr = self.background_pattern_address();
                    self.next_lo = self.mem_read(bus, addr);
                }
                6 => {
                    let addr = self.background_pattern_address() + 8;
                    self.next_hi = self.mem_read(bus, addr);
                }
                7 => self.v.increment_x(),
                _ => {}
            }
        }

        match dot {
            256 => self.v.increment_y(),
            257 => {
                self.reload_background_shifters();
                self.v.copy_horizontal(self.t);
            }
            280..=304 if self.scanline == PRE_RENDER_SCANLINE => {
                self.v.copy_vertical(self.t);
            }
            337 | 339 => {
                let _ = self.mem_read(bus, self.v.tile_address());
            }
            _ => {}
        }
    }

    #[inline]
    fn background_pattern_address(&self) -> u16 {
        self.ctrl.background_table() + self.next_tile as u16 * 16 + self.v.fine_y() as u16
    }

    fn shift_background(&mut self) {
        self.bg_shift_lo <<= 1;
        self.bg_shift_hi <<= 1;
        self.attr_shift_lo <<= 1;
        self.attr_shift_hi <<= 1;
    }

    fn reload_background_shifters(&mut self) {
        self.bg_shift_lo = (self.bg_shift_lo & 0xFF00) | self.next_lo as u16;
        self.bg_shift_hi = (self.bg_shift_hi & 0xFF00) | self.next_hi as u16;
        let lo = if self.next_attr & 0x01 != 0 { 0xFF } else { 0x00 };
        let hi = if self.next_attr & 0x02 != 0 { 0xFF } else { 0x00 };
        self.attr_shift_lo = (self.attr_shift_lo & 0xFF00) | lo;
        self.attr_shift_hi = (self.attr_shift_hi & 0xFF00) | hi;
    }

    /// Background pixel under the current dot as (palette, color) with
    /// color 0 meaning transparent.
    pub(in crate::ppu) fn background_pixel(&self, x: u16) -> (u8, u8) {
        if !self.mask.contains(PpuMask::SHOW_BACKGROUND)
            || (x < 8 && !self.mask.contains(PpuMask::SHOW_BACKGROUND_LEFT))
        {
            return (0, 0);
        }
        let bit = 0x8000u16 >> self.fine_x;
        let p0 = (self.bg_shift_lo & bit != 0) as u8;
        let p1 = (self.bg_shift_hi & bit != 0) as u8;
        let a0 = (self.attr_shift_lo & bit != 0) as u8;
        let a1 = (self.attr_shift_hi & bit != 0) as u8;
        ((a1 << 1) | a0, (p1 << 1) | p0)
    }
}
