#![doc = r#"
PPU dot driver

Purpose
- `Ppu::tick`: advance one dot, running whichever of the background pipeline,
  sprite evaluation and sprite fetch are active, then produce the pixel.

Notes
- Pixel output happens on dots 1-256 of visible lines. With rendering
  disabled the backdrop color is written.
- VBlank sets at (241, 1) and raises NMI through the bus when enabled.
  PPUSTATUS flags clear at (261, 1).
- Odd frames with rendering enabled skip the last pre-render dot.
"#]

use super::*;

impl Ppu {
    /// Advance one PPU dot.
    pub fn tick<B: IoBus + ?Sized>(&mut self, bus: &mut B) {
        let rendering = self.rendering_enabled();

        if self.scanline < 240 {
            if rendering {
                self.sprite_evaluation_step();
                self.background_step(bus);
                self.sprite_fetch_step(bus);
            }
            if (1..=256).contains(&self.dot) {
                self.render_pixel();
            }
        } else if self.scanline == PRE_RENDER_SCANLINE {
            if self.dot == 1 {
                self.status.remove(
                    PpuStatus::VBLANK | PpuStatus::SPRITE_ZERO_HIT | PpuStatus::SPRITE_OVERFLOW,
                );
                self.eval_found = 0;
                self.sprite_zero_next = false;
                self.sprite_count = 0;
            }
            if rendering {
                self.background_step(bus);
                self.sprite_fetch_step(bus);
            }
        } else if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
            if std::mem::take(&mut self.suppress_vblank) {
                log::trace!("vblank suppressed by PPUSTATUS read, frame {}", self.frame);
            } else {
                self.status.insert(PpuStatus::VBLANK);
                if self.ctrl.contains(PpuCtrl::NMI_ENABLE) {
                    bus.signal_nmi();
                }
            }
            self.frame_complete = true;
        }

        self.advance_dot(rendering);
    }

    fn advance_dot(&mut self, rendering: bool) {
        if rendering && self.odd_frame && self.scanline == PRE_RENDER_SCANLINE && self.dot == 339 {
            self.dot = 340;
        }
        self.dot += 1;
        if self.dot == DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.frame += 1;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    fn render_pixel(&mut self) {
        let x = self.dot - 1;
        let (bg_palette, bg_color) = self.background_pixel(x);
        let index = match self.sprite_pixel(x) {
            None if bg_color == 0 => 0,
            None => bg_palette * 4 + bg_color,
            Some(sp) => {
                if bg_color != 0 && sp.is_sprite_zero && x != 255 {
                    self.status.insert(PpuStatus::SPRITE_ZERO_HIT);
                }
                if bg_color == 0 || !sp.behind_background {
                    sp.palette * 4 + sp.color
                } else {
                    bg_palette * 4 + bg_color
                }
            }
        };
        let color = self.mem.read_palette(0x3F00 + index as u16) & self.grayscale_mask();
        self.put_pixel(x as usize, self.scanline as usize, palette::argb(color));
    }

    #[inline]
    fn put_pixel(&mut self, x: usize, y: usize, argb: u32) {
        if let Some(px) = self
            .video
            .as_mut()
            .and_then(|buf| buf.get_mut(y * NES_WIDTH + x))
        {
            *px = argb;
        }
    }
}
