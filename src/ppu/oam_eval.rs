#![doc = r#"
Sprite evaluation

Purpose
- Secondary OAM clear (dots 1-64) and the sprite evaluation state machine
  (even dots 66-256) on visible scanlines.

Notes
- Evaluation walks primary OAM with a sprite index `n` and byte index `m`.
  Each step copies one byte, so an in-range sprite costs four steps.
- Once eight sprites are found the overflow search keeps testing
  `oam[n * 4 + m]` as a Y coordinate and increments both `n` and `m` on a
  miss. That diagonal walk is the hardware overflow bug and produces both
  false positives and false negatives.
- Sprites found on scanline N are drawn on N + 1.
"#]

use super::*;

impl Ppu {
    pub(in crate::ppu) fn sprite_evaluation_step(&mut self) {
        match self.dot {
            1 => {
                self.eval_n = 0;
                self.eval_m = 0;
                self.eval_found = 0;
                self.eval_done = false;
                self.sprite_zero_next = false;
            }
            2..=64 if self.dot % 2 == 0 => {
                self.secondary_oam[(self.dot / 2 - 1) as usize] = 0xFF;
            }
            66..=256 if self.dot % 2 == 0 => self.evaluate_one(),
            _ => {}
        }
    }

    #[inline]
    fn sprite_in_range(&self, y: u8) -> bool {
        let row = self.scanline as i16 - y as i16;
        row >= 0 && row < self.sprite_height() as i16
    }

    fn evaluate_one(&mut self) {
        if self.eval_done {
            return;
        }
        let n = self.eval_n as usize;
        let m = self.eval_m as usize;

        if self.eval_found < 8 {
            let slot = self.eval_found as usize * 4;
            let byte = self.oam[n * 4 + m];
            self.secondary_oam[slot + m] = byte;
            if m == 0 {
                if self.sprite_in_range(byte) {
                    if n == 0 {
                        self.sprite_zero_next = true;
                    }
                    self.eval_m = 1;
                } else {
                    self.advance_sprite();
                }
            } else if m == 3 {
                self.eval_m = 0;
                self.eval_found += 1;
                self.advance_sprite();
            } else {
                self.eval_m += 1;
            }
        } else {
            let y = self.oam[n * 4 + m];
            if self.sprite_in_range(y) {
                self.status.insert(PpuStatus::SPRITE_OVERFLOW);
                self.eval_done = true;
            } else {
                self.eval_m = (self.eval_m + 1) & 0x03;
                self.advance_sprite();
            }
        }
    }

    fn advance_sprite(&mut self) {
        self.eval_n += 1;
        if self.eval_n == 64 {
            self.eval_n = 0;
            self.eval_done = true;
        }
    }
}
