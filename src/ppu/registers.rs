#![doc = r#"
PPU register types

Purpose
- Typed views of PPUCTRL ($2000), PPUMASK ($2001) and PPUSTATUS ($2002).
- `VramAddr`: the 15-bit loopy address used for both `v` (current) and `t`
  (temporary) scroll registers.

Loopy layout
- yyy NN YYYYY XXXXX
- fine Y (3), nametable select (2), coarse Y (5), coarse X (5)

Notes
- Coarse Y wraps at 29 and flips the vertical nametable bit. Values 30 and 31
  are reachable through $2005/$2006 writes; from 31 it wraps to 0 without the
  flip.
"#]

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuCtrl: u8 {
        const NAMETABLE_X = 0b0000_0001;
        const NAMETABLE_Y = 0b0000_0010;
        const VRAM_INCREMENT_32 = 0b0000_0100;
        const SPRITE_TABLE_HIGH = 0b0000_1000;
        const BACKGROUND_TABLE_HIGH = 0b0001_0000;
        const SPRITE_SIZE_16 = 0b0010_0000;
        const MASTER_SLAVE = 0b0100_0000;
        const NMI_ENABLE = 0b1000_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuMask: u8 {
        const GRAYSCALE = 0b0000_0001;
        const SHOW_BACKGROUND_LEFT = 0b0000_0010;
        const SHOW_SPRITES_LEFT = 0b0000_0100;
        const SHOW_BACKGROUND = 0b0000_1000;
        const SHOW_SPRITES = 0b0001_0000;
        const EMPHASIZE_RED = 0b0010_0000;
        const EMPHASIZE_GREEN = 0b0100_0000;
        const EMPHASIZE_BLUE = 0b1000_0000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuStatus: u8 {
        const SPRITE_OVERFLOW = 0b0010_0000;
        const SPRITE_ZERO_HIT = 0b0100_0000;
        const VBLANK = 0b1000_0000;
    }
}

impl PpuCtrl {
    #[inline]
    pub fn vram_increment(self) -> u16 {
        if self.contains(Self::VRAM_INCREMENT_32) {
            32
        } else {
            1
        }
    }

    #[inline]
    pub fn background_table(self) -> u16 {
        if self.contains(Self::BACKGROUND_TABLE_HIGH) {
            0x1000
        } else {
            0x0000
        }
    }

    /// Pattern table for 8x8 sprites; 8x16 sprites pick it from the tile index.
    #[inline]
    pub fn sprite_table(self) -> u16 {
        if self.contains(Self::SPRITE_TABLE_HIGH) {
            0x1000
        } else {
            0x0000
        }
    }
}

const COARSE_X: u16 = 0x001F;
const COARSE_Y: u16 = 0x03E0;
const NAMETABLE: u16 = 0x0C00;
const NAMETABLE_X: u16 = 0x0400;
const NAMETABLE_Y: u16 = 0x0800;
const FINE_Y: u16 = 0x7000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VramAddr(u16);

impl VramAddr {
    pub fn new(raw: u16) -> Self {
        Self(raw & 0x7FFF)
    }

    #[inline]
    pub fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub fn coarse_x(self) -> u8 {
        (self.0 & COARSE_X) as u8
    }

    #[inline]
    pub fn coarse_y(self) -> u8 {
        ((self.0 & COARSE_Y) >> 5) as u8
    }

    #[inline]
    pub fn nametable(self) -> u8 {
        ((self.0 & NAMETABLE) >> 10) as u8
    }

    #[inline]
    pub fn fine_y(self) -> u8 {
        ((self.0 & FINE_Y) >> 12) as u8
    }

    pub fn set_coarse_x(&mut self, value: u8) {
        self.0 = (self.0 & !COARSE_X) | (value as u16 & 0x1F);
    }

    pub fn set_coarse_y(&mut self, value: u8) {
        self.0 = (self.0 & !COARSE_Y) | ((value as u16 & 0x1F) << 5);
    }

    pub fn set_nametable(&mut self, value: u8) {
        self.0 = (self.0 & !NAMETABLE) | ((value as u16 & 0x03) << 10);
    }

    pub fn set_fine_y(&mut self, value: u8) {
        self.0 = (self.0 & !FINE_Y) | ((value as u16 & 0x07) << 12);
    }

    /// High byte write through $2006 (first write). Bit 14 is cleared.
    pub fn set_high(&mut self, value: u8) {
        self.0 = (self.0 & 0x00FF) | ((value as u16 & 0x3F) << 8);
    }

    /// Low byte write through $2006 (second write).
    pub fn set_low(&mut self, value: u8) {
        self.0 = (self.0 & 0x7F00) | value as u16;
    }

    /// PPUDATA step, wrapping within 15 bits.
    pub fn advance(&mut self, amount: u16) {
        self.0 = self.0.wrapping_add(amount) & 0x7FFF;
    }

    pub fn increment_x(&mut self) {
        if self.coarse_x() == 31 {
            self.0 &= !COARSE_X;
            self.0 ^= NAMETABLE_X;
        } else {
            self.0 += 1;
        }
    }

    pub fn increment_y(&mut self) {
        if self.fine_y() < 7 {
            self.0 += 0x1000;
            return;
        }
        self.0 &= !FINE_Y;
        let y = match self.coarse_y() {
            29 => {
                self.0 ^= NAMETABLE_Y;
                0
            }
            31 => 0,
            y => y + 1,
        };
        self.set_coarse_y(y);
    }

    /// Dot 257: horizontal scroll bits from `t`.
    pub fn copy_horizontal(&mut self, t: VramAddr) {
        let bits = COARSE_X | NAMETABLE_X;
        self.0 = (self.0 & !bits) | (t.0 & bits);
    }

    /// Pre-render dots 280-304: vertical scroll bits from `t`.
    pub fn copy_vertical(&mut self, t: VramAddr) {
        let bits = FINE_Y | NAMETABLE_Y | COARSE_Y;
        self.0 = (self.0 & !bits) | (t.0 & bits);
    }

    #[inline]
    pub fn tile_address(self) -> u16 {
        0x2000 | (self.0 & 0x0FFF)
    }

    #[inline]
    pub fn attribute_address(self) -> u16 {
        0x23C0 | (self.0 & 0x0C00) | ((self.0 >> 4) & 0x38) | ((self.0 >> 2) & 0x07)
    }

    /// Shift selecting this tile's 2-bit quadrant inside an attribute byte.
    #[inline]
    pub fn attribute_shift(self) -> u8 {
        ((self.coarse_y() & 0x02) << 1) | (self.coarse_x() & 0x02)
    }
}
