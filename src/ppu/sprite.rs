#![doc = r#"
Sprite line buffer

Purpose
- Pattern fetch for the eight sprite slots (dots 257-320) and per-pixel
  sprite lookup while the next scanline draws.

Notes
- Each slot takes eight dots: attributes are latched on the first, pattern
  low/high are fetched on the fifth and seventh.
- Empty slots still fetch tile $FF so the cartridge sees the same A12
  pattern as on hardware; the data is discarded.
- Horizontal flip is applied at fetch time by bit reversal.
- OAMADDR is held at zero throughout the fetch window.
"#]

use super::*;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SpriteSlot {
    pub(crate) pattern_lo: u8,
    pub(crate) pattern_hi: u8,
    pub(crate) attr: u8,
    pub(crate) x: u8,
    y: u8,
    tile: u8,
}

impl SpriteSlot {
    #[inline]
    pub(crate) fn behind_background(&self) -> bool {
        self.attr & 0x20 != 0
    }

    /// Color (0-3) of this sprite at screen column `x`, 0 when transparent
    /// or out of range.
    #[inline]
    fn color_at(&self, x: u16) -> u8 {
        let col = x.wrapping_sub(self.x as u16);
        if col >= 8 {
            return 0;
        }
        let shift = 7 - col;
        let lo = (self.pattern_lo >> shift) & 1;
        let hi = (self.pattern_hi >> shift) & 1;
        (hi << 1) | lo
    }
}

impl SaveState for SpriteSlot {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_bytes(&[self.pattern_lo, self.pattern_hi, self.attr, self.x, self.y, self.tile]);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        let mut raw = [0u8; 6];
        ar.read_into(&mut raw)?;
        [self.pattern_lo, self.pattern_hi, self.attr, self.x, self.y, self.tile] = raw;
        Ok(())
    }
}

/// Winning sprite for a pixel.
pub(crate) struct SpritePixel {
    pub(crate) palette: u8,
    pub(crate) color: u8,
    pub(crate) behind_background: bool,
    pub(crate) is_sprite_zero: bool,
}

impl Ppu {
    pub(in crate::ppu) fn sprite_fetch_step<B: IoBus + ?Sized>(&mut self, bus: &mut B) {
        let dot = self.dot;
        if !(257..=320).contains(&dot) {
            return;
        }
        self.oam_addr = 0;
        let i = ((dot - 257) / 8) as usize;
        let filled = i < self.eval_found as usize;
        match (dot - 257) % 8 {
            0 => {
                let slot = &mut self.sprites[i];
                if filled {
                    let base = i * 4;
                    slot.y = self.secondary_oam[base];
                    slot.tile = self.secondary_oam[base + 1];
                    slot.attr = self.secondary_oam[base + 2];
                    slot.x = self.secondary_oam[base + 3];
                } else {
                    *slot = SpriteSlot {
                        y: 0xFF,
                        tile: 0xFF,
                        attr: 0,
                        x: 0xFF,
                        pattern_lo: 0,
                        pattern_hi: 0,
                    };
                }
            }
            4 => {
                let addr = self.sprite_pattern_address(i, filled);
                let data = self.mem_read(bus, addr);
                self.sprites[i].pattern_lo = if filled { self.flip(i, data) } else { 0 };
            }
            6 => {
                let addr = self.sprite_pattern_address(i, filled) + 8;
                let data = self.mem_read(bus, addr);
                self.sprites[i].pattern_hi = if filled { self.flip(i, data) } else { 0 };
            }
            _ => {}
        }
        if dot == 320 {
            self.sprite_count = self.eval_found.min(8);
            self.sprite_zero_on_line = self.sprite_zero_next;
        }
    }

    #[inline]
    fn flip(&self, i: usize, data: u8) -> u8 {
        if self.sprites[i].attr & 0x40 != 0 {
            data.reverse_bits()
        } else {
            data
        }
    }

    fn sprite_pattern_address(&self, i: usize, filled: bool) -> u16 {
        let slot = &self.sprites[i];
        let height = self.sprite_height();
        let row = if filled {
            let row = (self.scanline as u8).wrapping_sub(slot.y) % height;
            if slot.attr & 0x80 != 0 {
                height - 1 - row
            } else {
                row
            }
        } else {
            0
        };
        if height == 16 {
            let table = (slot.tile as u16 & 0x01) * 0x1000;
            let tile = (slot.tile & 0xFE) as u16 + (row >= 8) as u16;
            table + tile * 16 + (row & 0x07) as u16
        } else {
            self.ctrl.sprite_table() + slot.tile as u16 * 16 + row as u16
        }
    }

    /// First opaque sprite at column `x` on the current line, if any.
    pub(in crate::ppu) fn sprite_pixel(&self, x: u16) -> Option<SpritePixel> {
        if !self.mask.contains(PpuMask::SHOW_SPRITES)
            || (x < 8 && !self.mask.contains(PpuMask::SHOW_SPRITES_LEFT))
        {
            return None;
        }
        self.sprites[..self.sprite_count as usize]
            .iter()
            .enumerate()
            .find_map(|(i, slot)| {
                let color = slot.color_at(x);
                (color != 0).then(|| SpritePixel {
                    palette: (slot.attr & 0x03) + 4,
                    color,
                    behind_background: slot.behind_background(),
                    is_sprite_zero: i == 0 && self.sprite_zero_on_line,
                })
            })
    }
}
