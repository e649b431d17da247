//! MMC1 (Mapper 1) implementation.
//!
//! Implements:
//! - Serial shift register writes (5 bits, LSB first) to control / CHR0 / CHR1 / PRG
//! - PRG banking modes (32K switch, or 16K with fixed low or high)
//! - CHR banking (8K or 4K+4K)
//! - Mirroring control (single-screen lower/upper, vertical, horizontal)
//! - PRG RAM disable bit (PRG register bit 4)
//! - SUROM-style 512 KiB PRG: CHR0 bit 4 selects the 256 KiB outer bank
//! - Writes on consecutive CPU cycles are ignored (only the first of a
//!   read-modify-write double write reaches the shift register)
use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{CartridgeMemory, Mirroring};
use crate::mapper::{BankMap, Mapper, read_work_ram, write_work_ram};

const OUTER_BANK_THRESHOLD: usize = 256 * 1024;

/// MMC1 mapper core state.
#[derive(Debug, Clone, Default)]
pub struct Mmc1 {
    banks: BankMap,

    // 5-bit registers
    control: u8,
    chr_bank0: u8,
    chr_bank1: u8,
    prg_bank: u8,

    // Serial latch
    shift_reg: u8,
    shift_count: u8,

    // CPU cycle bookkeeping for the consecutive-write filter
    cycle: u64,
    last_write_cycle: Option<u64>,

    large_prg: bool,
}

impl Mmc1 {
    #[inline]
    fn prg_mode(&self) -> u8 {
        (self.control >> 2) & 0x03
    }

    #[inline]
    fn chr_mode(&self) -> u8 {
        (self.control >> 4) & 0x01
    }

    #[inline]
    fn prg_ram_enabled(&self) -> bool {
        self.prg_bank & 0x10 == 0
    }

    fn recompute_banks(&mut self, mem: &CartridgeMemory) {
        // 16 KiB units; the outer bit lives in CHR0 bit 4 on 512 KiB boards.
        let outer = if self.large_prg {
            self.chr_bank0 as usize & 0x10
        } else {
            0
        };
        let bank = (self.prg_bank & 0x0F) as usize;
        match self.prg_mode() {
            0 | 1 => {
                let base = outer | (bank & !1);
                self.banks.map_prg_16k(0, base, mem);
                self.banks.map_prg_16k(1, base | 1, mem);
            }
            2 => {
                self.banks.map_prg_16k(0, outer, mem);
                self.banks.map_prg_16k(1, outer | bank, mem);
            }
            _ => {
                self.banks.map_prg_16k(0, outer | bank, mem);
                self.banks.map_prg_16k(1, outer | 0x0F, mem);
            }
        }

        if self.chr_mode() == 0 {
            let bank8k = (self.chr_bank0 & 0x1E) as usize;
            self.banks.map_chr_4k(0, bank8k, mem);
            self.banks.map_chr_4k(4, bank8k | 1, mem);
        } else {
            self.banks.map_chr_4k(0, self.chr_bank0 as usize, mem);
            self.banks.map_chr_4k(4, self.chr_bank1 as usize, mem);
        }
    }

    fn commit_register(&mut self, addr: u16, value5: u8, mem: &CartridgeMemory) {
        match addr {
            0x8000..=0x9FFF => self.control = value5,
            0xA000..=0xBFFF => self.chr_bank0 = value5,
            0xC000..=0xDFFF => self.chr_bank1 = value5,
            _ => self.prg_bank = value5,
        }
        self.recompute_banks(mem);
    }

    fn serial_write(&mut self, addr: u16, data: u8, mem: &CartridgeMemory) {
        if data & 0x80 != 0 {
            self.shift_reg = 0;
            self.shift_count = 0;
            self.control |= 0x0C;
            self.recompute_banks(mem);
            return;
        }
        self.shift_reg = (self.shift_reg >> 1) | ((data & 1) << 4);
        self.shift_count += 1;
        if self.shift_count == 5 {
            let value5 = self.shift_reg & 0x1F;
            self.shift_reg = 0;
            self.shift_count = 0;
            self.commit_register(addr, value5, mem);
        }
    }

    #[cfg(test)]
    pub(crate) fn debug_registers(&self) -> (u8, u8, u8, u8) {
        (self.control, self.chr_bank0, self.chr_bank1, self.prg_bank)
    }
}

impl Mapper for Mmc1 {
    fn mapper_id(&self) -> u16 {
        1
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        self.control = 0x0C;
        self.chr_bank0 = 0;
        self.chr_bank1 = 0;
        self.prg_bank = 0;
        self.shift_reg = 0;
        self.shift_count = 0;
        self.last_write_cycle = None;
        self.large_prg = mem.prg_rom.len() > OUTER_BANK_THRESHOLD;
        self.recompute_banks(mem);
    }

    fn peek(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF if self.prg_ram_enabled() => read_work_ram(mem, addr),
            0x8000..=0xFFFF => Some(self.banks.read_prg(mem, addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled() {
                    write_work_ram(mem, addr, value);
                }
            }
            0x8000..=0xFFFF => {
                let consecutive = self
                    .last_write_cycle
                    .is_some_and(|c| self.cycle == c + 1);
                self.last_write_cycle = Some(self.cycle);
                if !consecutive {
                    self.serial_write(addr, value, mem);
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        self.banks.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        self.banks.write_chr(mem, addr, value);
    }

    fn mirroring(&self) -> Option<Mirroring> {
        Some(match self.control & 0x03 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        })
    }

    fn cpu_tick(&mut self) {
        self.cycle = self.cycle.wrapping_add(1);
    }
}

impl SaveState for Mmc1 {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
        ar.write_u8(self.control);
        ar.write_u8(self.chr_bank0);
        ar.write_u8(self.chr_bank1);
        ar.write_u8(self.prg_bank);
        ar.write_u8(self.shift_reg);
        ar.write_u8(self.shift_count);
        ar.write_u64(self.cycle);
        ar.write_bool(self.last_write_cycle.is_some());
        ar.write_u64(self.last_write_cycle.unwrap_or(0));
        ar.write_bool(self.large_prg);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)?;
        self.control = ar.read_u8()?;
        self.chr_bank0 = ar.read_u8()?;
        self.chr_bank1 = ar.read_u8()?;
        self.prg_bank = ar.read_u8()?;
        self.shift_reg = ar.read_u8()?;
        self.shift_count = ar.read_u8()?;
        self.cycle = ar.read_u64()?;
        let has_last = ar.read_bool()?;
        let last = ar.read_u64()?;
        self.last_write_cycle = has_last.then_some(last);
        self.large_prg = ar.read_bool()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Mmc1;
    use crate::cartridge::{CartridgeMemory, Mirroring};
    use crate::mapper::Mapper;
    use crate::test_utils::banked_memory;

    fn setup(prg_16k: usize, chr_8k: usize) -> (Mmc1, CartridgeMemory) {
        let mem = banked_memory(prg_16k, chr_8k);
        let mut m = Mmc1::default();
        m.initialise(&mem);
        (m, mem)
    }

    // One bit per write, separated by a CPU cycle like a real STA loop.
    fn write_serial(m: &mut Mmc1, mem: &mut CartridgeMemory, addr: u16, value5: u8) {
        for i in 0..5 {
            m.cpu_write(mem, addr, (value5 >> i) & 1);
            m.cpu_tick();
            m.cpu_tick();
        }
    }

    #[test]
    fn power_on_fixes_last_bank_high() {
        let (mut m, mem) = setup(8, 1);
        // 128 KiB PRG: 16 8 KiB banks, last 16 KiB = banks 14/15.
        assert_eq!(m.cpu_read(&mem, 0x8000), Some(0));
        assert_eq!(m.cpu_read(&mem, 0xC000), Some(14));
        assert_eq!(m.cpu_read(&mem, 0xE000), Some(15));
    }

    #[test]
    fn fifth_write_commits_to_register_of_its_address() {
        let (mut m, mut mem) = setup(8, 2);
        // First four bits go to $8000, the fifth to $E000: PRG register gets the value.
        for i in 0..4 {
            m.cpu_write(&mut mem, 0x8000, (0b00101 >> i) & 1);
            m.cpu_tick();
            m.cpu_tick();
        }
        m.cpu_write(&mut mem, 0xE000, 0);
        let (control, _, _, prg) = m.debug_registers();
        assert_eq!(control, 0x0C);
        assert_eq!(prg, 0b00101);
        // Mode 3: $8000 switchable 16 KiB bank 5 -> 8 KiB banks 10/11.
        assert_eq!(m.cpu_read(&mem, 0x8000), Some(10));
        assert_eq!(m.cpu_read(&mem, 0xA000), Some(11));
    }

    #[test]
    fn reset_bit_clears_shift_without_commit() {
        let (mut m, mut mem) = setup(8, 2);
        m.cpu_write(&mut mem, 0xE000, 1);
        m.cpu_tick();
        m.cpu_tick();
        m.cpu_write(&mut mem, 0xE000, 1);
        m.cpu_tick();
        m.cpu_tick();
        m.cpu_write(&mut mem, 0x8000, 0x80);
        m.cpu_tick();
        m.cpu_tick();
        // A fresh 5-bit sequence must be fully consumed before anything commits.
        write_serial(&mut m, &mut mem, 0xE000, 0b00011);
        let (control, _, _, prg) = m.debug_registers();
        assert_eq!(control & 0x0C, 0x0C);
        assert_eq!(prg, 0b00011);
    }

    #[test]
    fn consecutive_cycle_write_is_ignored() {
        let (mut m, mut mem) = setup(8, 2);
        // Dummy write then real write on the next cycle (RMW instruction).
        m.cpu_write(&mut mem, 0xE000, 1);
        m.cpu_tick();
        m.cpu_write(&mut mem, 0xE000, 0);
        m.cpu_tick();
        m.cpu_tick();
        for _ in 0..4 {
            m.cpu_write(&mut mem, 0xE000, 0);
            m.cpu_tick();
            m.cpu_tick();
        }
        let (_, _, _, prg) = m.debug_registers();
        assert_eq!(prg, 0b00001);
    }

    #[test]
    fn chr_4k_mode_mapping() {
        let (mut m, mut mem) = setup(2, 2);
        write_serial(&mut m, &mut mem, 0x8000, 0b10000); // chr_mode=1, one-screen lower
        write_serial(&mut m, &mut mem, 0xA000, 1);
        write_serial(&mut m, &mut mem, 0xC000, 2);
        // 4 KiB bank 1 starts at 1 KiB bank 4; bank 2 at 1 KiB bank 8.
        assert_eq!(m.ppu_read(&mem, 0x0000), 4);
        assert_eq!(m.ppu_read(&mem, 0x1000), 8);
        assert_eq!(m.mirroring(), Some(Mirroring::SingleScreenLower));
    }

    #[test]
    fn chr_8k_mode_ignores_low_bit() {
        let (mut m, mut mem) = setup(2, 2);
        write_serial(&mut m, &mut mem, 0x8000, 0b00010);
        write_serial(&mut m, &mut mem, 0xA000, 0b00011);
        assert_eq!(m.ppu_read(&mem, 0x0000), 8);
        assert_eq!(m.ppu_read(&mem, 0x1000), 12);
        assert_eq!(m.mirroring(), Some(Mirroring::Vertical));
    }

    #[test]
    fn prg_ram_disable_bit() {
        let (mut m, mut mem) = setup(2, 1);
        m.cpu_write(&mut mem, 0x6000, 0x42);
        assert_eq!(m.cpu_read(&mem, 0x6000), Some(0x42));
        m.cpu_tick();
        m.cpu_tick();
        write_serial(&mut m, &mut mem, 0xE000, 0x10);
        assert_eq!(m.cpu_read(&mem, 0x6000), None);
    }

    #[test]
    fn outer_bank_on_512k_boards() {
        let (mut m, mut mem) = setup(32, 0);
        write_serial(&mut m, &mut mem, 0xA000, 0x10);
        // Outer bank 1: fixed last bank is 16 KiB bank 31 -> 8 KiB banks 62/63.
        assert_eq!(m.cpu_read(&mem, 0xC000), Some(62));
        assert_eq!(m.cpu_read(&mem, 0x8000), Some(32));
    }
}
