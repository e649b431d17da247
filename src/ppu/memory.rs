#![doc = r#"
PPU-internal memory

Purpose
- Nametable RAM ($2000-$2FFF, mirrored at $3000-$3EFF) and palette RAM
  ($3F00-$3F1F, mirrored through $3FFF).

Nametable mirroring
- The four logical tables map onto physical 1 KiB pages:
  - Horizontal: 0 0 1 1
  - Vertical: 0 1 0 1
  - Single-screen lower / upper: all 0 / all 1
  - Four-screen: 0 1 2 3 (the extra 2 KiB stands in for cartridge VRAM)

Palette aliases
- $3F10/$3F14/$3F18/$3F1C alias $3F00/$3F04/$3F08/$3F0C.
"#]

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::Mirroring;

const PAGE: usize = 0x400;

#[derive(Clone)]
pub(crate) struct PpuMemory {
    nametables: [u8; 4 * PAGE],
    palette: [u8; 32],
    pub(crate) mirroring: Mirroring,
}

impl PpuMemory {
    pub(crate) fn new() -> Self {
        Self {
            nametables: [0; 4 * PAGE],
            palette: [0; 32],
            mirroring: Mirroring::Horizontal,
        }
    }

    /// Physical nametable RAM index for a PPU address in $2000-$3EFF.
    pub(crate) fn nametable_index(&self, addr: u16) -> usize {
        let table = ((addr as usize - 0x2000) / PAGE) & 0x03;
        let page = match self.mirroring {
            Mirroring::Horizontal => [0, 0, 1, 1][table],
            Mirroring::Vertical => [0, 1, 0, 1][table],
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
            Mirroring::FourScreen => table,
        };
        page * PAGE + (addr as usize & (PAGE - 1))
    }

    pub(crate) fn read_nametable(&self, addr: u16) -> u8 {
        let idx = self.nametable_index(addr);
        match self.nametables.get(idx) {
            Some(&v) => v,
            None => {
                crate::trap!("nametable index {idx:#06X} out of range (addr {addr:#06X})");
                0
            }
        }
    }

    pub(crate) fn write_nametable(&mut self, addr: u16, value: u8) {
        let idx = self.nametable_index(addr);
        match self.nametables.get_mut(idx) {
            Some(slot) => *slot = value,
            None => crate::trap!("nametable index {idx:#06X} out of range (addr {addr:#06X})"),
        }
    }

    #[inline]
    pub(crate) fn palette_index(addr: u16) -> usize {
        let i = (addr & 0x1F) as usize;
        if i & 0x13 == 0x10 {
            i & !0x10
        } else {
            i
        }
    }

    pub(crate) fn read_palette(&self, addr: u16) -> u8 {
        self.palette[Self::palette_index(addr)]
    }

    pub(crate) fn write_palette(&mut self, addr: u16, value: u8) {
        self.palette[Self::palette_index(addr)] = value & 0x3F;
    }
}

impl SaveState for PpuMemory {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_u8(self.mirroring.to_u8());
        ar.write_bytes(&self.nametables);
        ar.write_bytes(&self.palette);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.mirroring = Mirroring::from_u8(ar.read_u8()?);
        ar.read_into(&mut self.nametables)?;
        ar.read_into(&mut self.palette)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem(m: Mirroring) -> PpuMemory {
        let mut mem = PpuMemory::new();
        mem.mirroring = m;
        mem
    }

    #[test]
    fn horizontal_pairs_top_and_bottom() {
        let mut m = mem(Mirroring::Horizontal);
        m.write_nametable(0x2005, 0x11);
        assert_eq!(m.read_nametable(0x2405), 0x11);
        assert_eq!(m.read_nametable(0x2805), 0);
        m.write_nametable(0x2C05, 0x22);
        assert_eq!(m.read_nametable(0x2805), 0x22);
    }

    #[test]
    fn vertical_pairs_left_and_right() {
        let mut m = mem(Mirroring::Vertical);
        m.write_nametable(0x2005, 0x11);
        assert_eq!(m.read_nametable(0x2805), 0x11);
        assert_eq!(m.read_nametable(0x2405), 0);
    }

    #[test]
    fn single_screen_and_four_screen_pages() {
        let lower = mem(Mirroring::SingleScreenLower);
        let upper = mem(Mirroring::SingleScreenUpper);
        let four = mem(Mirroring::FourScreen);
        for (i, addr) in [0x2000u16, 0x2400, 0x2800, 0x2C00].into_iter().enumerate() {
            assert_eq!(lower.nametable_index(addr + 7), 7);
            assert_eq!(upper.nametable_index(addr + 7), PAGE + 7);
            assert_eq!(four.nametable_index(addr + 7), i * PAGE + 7);
        }
    }

    #[test]
    fn upper_mirror_region_follows_2000() {
        let mut m = mem(Mirroring::Vertical);
        m.write_nametable(0x3123, 0x5A);
        assert_eq!(m.read_nametable(0x2123), 0x5A);
    }

    #[test]
    fn palette_aliases() {
        let mut m = PpuMemory::new();
        m.write_palette(0x3F10, 0x21);
        assert_eq!(m.read_palette(0x3F00), 0x21);
        m.write_palette(0x3F04, 0x0F);
        assert_eq!(m.read_palette(0x3F14), 0x0F);
        m.write_palette(0x3F11, 0x07);
        assert_eq!(m.read_palette(0x3F01), 0);
        assert_eq!(m.read_palette(0x3F31), 0x07);
    }
}
