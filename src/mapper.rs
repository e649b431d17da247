/*!
Mapper subsystem: trait definition, factory, shared bank arithmetic, and the
NROM (mapper 0) implementation.

Purpose:
- Decouple CPU/PPU address mapping from the `Cartridge` so each board only
  holds the registers it needs.
- Keep ROM/RAM images in `CartridgeMemory`; mappers store integer bank
  offsets into them (`BankMap`), so save states persist plain numbers.

Bank arithmetic:
- Bank indices wrap to the number of banks actually present: masked when the
  count is a power of two, reduced modulo the count otherwise. Every offset a
  mapper computes therefore stays inside the image.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{CartridgeMemory, Mirroring};
use crate::mappers::{Axrom, Bandai152, Cnrom, Fme7, Gxrom, Mmc1, Mmc2, Mmc3, Uxrom};

pub const PRG_BANK_8K: usize = 0x2000;
pub const PRG_BANK_16K: usize = 0x4000;
pub const PRG_BANK_32K: usize = 0x8000;
pub const CHR_BANK_1K: usize = 0x0400;
pub const CHR_BANK_2K: usize = 0x0800;
pub const CHR_BANK_4K: usize = 0x1000;
pub const CHR_BANK_8K: usize = 0x2000;

/// Common interface all cartridge mappers must implement.
///
/// Semantics:
/// - CPU methods see full addresses in $4020..=$FFFF; PPU methods see $0000..=$1FFF.
/// - `peek` must not change mapper state; `cpu_read` defaults to it and is
///   overridden only by boards whose reads have side effects.
/// - `None` from a CPU read means the board does not drive the data bus.
pub trait Mapper: SaveState {
    /// iNES mapper number.
    fn mapper_id(&self) -> u16;

    /// Power-on register values and bank layout.
    fn initialise(&mut self, mem: &CartridgeMemory);

    fn peek(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8>;

    fn cpu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        self.peek(mem, addr)
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8);

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8;

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8);

    /// Mirroring selected by mapper registers, `None` to keep the header's.
    fn mirroring(&self) -> Option<Mirroring> {
        None
    }

    /// Whether this mapper is asserting its IRQ output line at the moment.
    fn irq_asserted(&self) -> bool {
        false
    }

    /// Called once per CPU cycle.
    fn cpu_tick(&mut self) {}
}

/// Build the mapper for an iNES mapper number. `None` for unsupported boards.
pub fn create_mapper(mapper_id: u16) -> Option<Box<dyn Mapper>> {
    let mapper: Box<dyn Mapper> = match mapper_id {
        0 => Box::new(Nrom::default()),
        1 => Box::new(Mmc1::default()),
        2 => Box::new(Uxrom::default()),
        3 => Box::new(Cnrom::default()),
        4 => Box::new(Mmc3::default()),
        7 => Box::new(Axrom::default()),
        9 => Box::new(Mmc2::default()),
        66 => Box::new(Gxrom::default()),
        69 => Box::new(Fme7::default()),
        152 => Box::new(Bandai152::default()),
        _ => return None,
    };
    Some(mapper)
}

/// Board name for diagnostics.
pub fn mapper_name(mapper_id: u16) -> &'static str {
    match mapper_id {
        0 => "NROM",
        1 => "MMC1",
        2 => "UxROM",
        3 => "CNROM",
        4 => "MMC3",
        7 => "AxROM",
        9 => "MMC2",
        66 => "GxROM",
        69 => "Sunsoft FME-7",
        152 => "Bandai 74161/7432",
        _ => "unsupported",
    }
}

/// Byte offset of `bank` (counted in `bank_size` units) inside an image of
/// `len` bytes.
#[inline]
pub fn bank_offset(bank: usize, bank_size: usize, len: usize) -> usize {
    let count = (len / bank_size).max(1);
    let bank = if count.is_power_of_two() {
        bank & (count - 1)
    } else {
        bank % count
    };
    bank * bank_size
}

/// Index of the last `bank_size` bank in an image of `len` bytes.
#[inline]
pub fn last_bank(bank_size: usize, len: usize) -> usize {
    (len / bank_size).max(1) - 1
}

/// Read `data[offset]`, wrapping images smaller than the window.
#[inline]
pub fn wrapped_read(data: &[u8], offset: usize) -> u8 {
    match data.len() {
        0 => 0,
        len if offset < len => data[offset],
        len => data[offset % len],
    }
}

/// Current bank layout: 4 PRG windows of 8 KiB ($8000..=$FFFF) and 8 CHR
/// windows of 1 KiB ($0000..=$1FFF), each holding a byte offset into the image.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BankMap {
    prg: [usize; 4],
    chr: [usize; 8],
}

impl BankMap {
    /// Map `size` bytes of PRG starting at `bank * size` into the windows
    /// beginning at `slot` (in 8 KiB units).
    fn map_prg(&mut self, slot: usize, bank: usize, size: usize, mem: &CartridgeMemory) {
        let base = bank_offset(bank, size, mem.prg_rom.len());
        for i in 0..size / PRG_BANK_8K {
            self.prg[slot + i] = base + i * PRG_BANK_8K;
        }
    }

    #[inline]
    pub fn map_prg_8k(&mut self, slot: usize, bank: usize, mem: &CartridgeMemory) {
        self.map_prg(slot, bank, PRG_BANK_8K, mem);
    }

    /// `slot` is 0 for $8000 and 1 for $C000.
    #[inline]
    pub fn map_prg_16k(&mut self, slot: usize, bank: usize, mem: &CartridgeMemory) {
        self.map_prg(slot * 2, bank, PRG_BANK_16K, mem);
    }

    #[inline]
    pub fn map_prg_32k(&mut self, bank: usize, mem: &CartridgeMemory) {
        self.map_prg(0, bank, PRG_BANK_32K, mem);
    }

    fn map_chr(&mut self, slot: usize, bank: usize, size: usize, mem: &CartridgeMemory) {
        let base = bank_offset(bank, size, mem.chr.len());
        for i in 0..size / CHR_BANK_1K {
            self.chr[slot + i] = base + i * CHR_BANK_1K;
        }
    }

    #[inline]
    pub fn map_chr_1k(&mut self, slot: usize, bank: usize, mem: &CartridgeMemory) {
        self.map_chr(slot, bank, CHR_BANK_1K, mem);
    }

    /// `slot` counts 1 KiB windows, so 4 KiB halves sit at slots 0 and 4.
    #[inline]
    pub fn map_chr_4k(&mut self, slot: usize, bank: usize, mem: &CartridgeMemory) {
        self.map_chr(slot, bank, CHR_BANK_4K, mem);
    }

    #[inline]
    pub fn map_chr_8k(&mut self, bank: usize, mem: &CartridgeMemory) {
        self.map_chr(0, bank, CHR_BANK_8K, mem);
    }

    /// PRG ROM byte at CPU address $8000..=$FFFF.
    #[inline]
    pub fn read_prg(&self, mem: &CartridgeMemory, addr: u16) -> u8 {
        let a = (addr as usize) & 0x7FFF;
        mem.read_prg(self.prg[a / PRG_BANK_8K] + (a & (PRG_BANK_8K - 1)))
    }

    #[inline]
    fn chr_index(&self, addr: u16) -> usize {
        let a = (addr as usize) & 0x1FFF;
        self.chr[a / CHR_BANK_1K] + (a & (CHR_BANK_1K - 1))
    }

    #[inline]
    pub fn read_chr(&self, mem: &CartridgeMemory, addr: u16) -> u8 {
        mem.read_chr(self.chr_index(addr))
    }

    /// Ignored unless the cartridge carries CHR RAM.
    #[inline]
    pub fn write_chr(&self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        mem.write_chr(self.chr_index(addr), value);
    }
}

impl SaveState for BankMap {
    fn save_state(&self, ar: &mut Archive) {
        for &o in self.prg.iter().chain(self.chr.iter()) {
            ar.write_u32(o as u32);
        }
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        for o in self.prg.iter_mut().chain(self.chr.iter_mut()) {
            *o = ar.read_u32()? as usize;
        }
        Ok(())
    }
}

/// $6000..=$7FFF work RAM, common to most boards.
#[inline]
pub fn read_work_ram(mem: &CartridgeMemory, addr: u16) -> Option<u8> {
    mem.read_work_ram((addr as usize) - 0x6000)
}

#[inline]
pub fn write_work_ram(mem: &mut CartridgeMemory, addr: u16, value: u8) {
    mem.write_work_ram((addr as usize) - 0x6000, value);
}

/// NROM (mapper 0).
///
/// - PRG ROM: 16 KiB (NROM-128) mirrored into both halves, or 32 KiB (NROM-256).
/// - PRG RAM at $6000..=$7FFF when present.
/// - CHR: 8 KiB ROM, or RAM when the header declares no CHR.
#[derive(Clone, Debug, Default)]
pub struct Nrom {
    banks: BankMap,
}

impl Mapper for Nrom {
    #[inline]
    fn mapper_id(&self) -> u16 {
        0
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        self.banks.map_prg_32k(0, mem);
        self.banks.map_chr_8k(0, mem);
    }

    fn peek(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF => read_work_ram(mem, addr),
            0x8000..=0xFFFF => Some(self.banks.read_prg(mem, addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        if let 0x6000..=0x7FFF = addr {
            write_work_ram(mem, addr, value);
        }
    }

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        self.banks.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        self.banks.write_chr(mem, addr, value);
    }
}

impl SaveState for Nrom {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_with;

    #[test]
    fn bank_offset_masks_power_of_two_counts() {
        // 8 banks of 16 KiB: bank 9 wraps to 1.
        assert_eq!(bank_offset(9, PRG_BANK_16K, 8 * PRG_BANK_16K), PRG_BANK_16K);
    }

    #[test]
    fn bank_offset_uses_modulo_for_other_counts() {
        // 3 banks of 16 KiB (48 KiB image): bank 4 -> 4 % 3 = 1.
        assert_eq!(bank_offset(4, PRG_BANK_16K, 3 * PRG_BANK_16K), PRG_BANK_16K);
        assert_eq!(last_bank(PRG_BANK_16K, 3 * PRG_BANK_16K), 2);
    }

    #[test]
    fn nrom_32k_prg_basic() {
        let mut mem = memory_with(2, 1);
        mem.prg_rom[0] = 0x11;
        mem.prg_rom[0x7FFF] = 0x22;
        let mut nrom = Nrom::default();
        nrom.initialise(&mem);

        assert_eq!(nrom.cpu_read(&mem, 0x8000), Some(0x11));
        assert_eq!(nrom.cpu_read(&mem, 0xFFFF), Some(0x22));
        assert_eq!(nrom.cpu_read(&mem, 0x5000), None);

        nrom.cpu_write(&mut mem, 0x6000, 0x42);
        assert_eq!(nrom.cpu_read(&mem, 0x6000), Some(0x42));

        // CHR ROM read, write ignored
        assert_eq!(nrom.ppu_read(&mem, 0x0000), 0xCC);
        nrom.ppu_write(&mut mem, 0x0000, 0x11);
        assert_eq!(nrom.ppu_read(&mem, 0x0000), 0xCC);
    }

    #[test]
    fn nrom_16k_prg_mirroring() {
        let mut mem = memory_with(1, 1);
        mem.prg_rom[0] = 0x12;
        mem.prg_rom[0x3FFF] = 0x34;
        let mut nrom = Nrom::default();
        nrom.initialise(&mem);

        assert_eq!(nrom.peek(&mem, 0x8000), Some(0x12));
        assert_eq!(nrom.peek(&mem, 0xBFFF), Some(0x34));
        assert_eq!(nrom.peek(&mem, 0xC000), Some(0x12));
        assert_eq!(nrom.peek(&mem, 0xFFFF), Some(0x34));
    }

    #[test]
    fn chr_ram_is_writable() {
        let mut mem = memory_with(2, 0);
        let mut nrom = Nrom::default();
        nrom.initialise(&mem);
        assert_eq!(nrom.ppu_read(&mem, 0x0001), 0x00);
        nrom.ppu_write(&mut mem, 0x0001, 0x77);
        assert_eq!(nrom.ppu_read(&mem, 0x0001), 0x77);
    }

    #[test]
    fn factory_covers_supported_boards() {
        for id in [0u16, 1, 2, 3, 4, 7, 9, 66, 69, 152] {
            let m = create_mapper(id).expect("supported mapper");
            assert_eq!(m.mapper_id(), id);
            assert_ne!(mapper_name(id), "unsupported");
        }
        assert!(create_mapper(5).is_none());
    }
}
