/*!
MMC3 (Mapper 4)

Banking:
- Bank select ($8000 even) / bank data ($8001 odd) registers R0..R7
- PRG banking modes (bit 6) with two switchable 8K banks + fixed second-last + fixed last
- CHR banking (two 2KB + four 1KB banks) with inversion (bit 7)
- Runtime nametable mirroring ($A000 even, bit 0: 0=Vertical, 1=Horizontal);
  the header arrangement applies until the first write
- PRG RAM enable (bit 7) and write protect (bit 6) via $A001 odd writes

Scanline IRQ:
- $C000 even: latch; $C001 odd: request reload; $E000 even: disable and
  acknowledge; $E001 odd: enable.
- The counter is clocked on a rising edge of PPU A12 observed on pattern
  fetches. An edge only counts when A12 has been low for at least
  `a12_filter` CPU cycles (default 3), which rejects the rapid toggles of
  8x16 sprite fetches and PPUDATA traffic.
- On a clock: if the counter is 0 or a reload is pending it is loaded from
  the latch, otherwise decremented. Reaching 0 with IRQs enabled asserts the line.

Notes:
- Disabled PRG RAM leaves the bus floating (open bus).
- Write-protected PRG RAM ignores writes.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{CartridgeMemory, Mirroring};
use crate::mapper::{BankMap, Mapper, PRG_BANK_8K, last_bank, read_work_ram, write_work_ram};

/// Default minimum number of CPU cycles A12 must stay low between counted edges.
pub const DEFAULT_A12_FILTER: u64 = 3;

#[derive(Debug, Clone)]
pub struct Mmc3 {
    banks: BankMap,

    bank_regs: [u8; 8],
    bank_select: u8,

    // None until the first $A000 write; the header arrangement applies.
    mirroring: Option<Mirroring>,
    prg_ram_enabled: bool,
    prg_ram_write_protect: bool,

    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,

    // A12 edge detection
    a12_high: bool,
    a12_low_since: u64,
    a12_filter: u64,
    cycle: u64,
}

impl Default for Mmc3 {
    fn default() -> Self {
        Self {
            banks: BankMap::default(),
            bank_regs: [0; 8],
            bank_select: 0,
            mirroring: None,
            prg_ram_enabled: true,
            prg_ram_write_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
            a12_high: false,
            a12_low_since: 0,
            a12_filter: DEFAULT_A12_FILTER,
            cycle: 0,
        }
    }
}

impl Mmc3 {
    /// Minimum low time of A12 (in CPU cycles) before a rising edge clocks the counter.
    pub fn set_a12_filter(&mut self, cycles: u64) {
        self.a12_filter = cycles;
    }

    pub fn a12_filter(&self) -> u64 {
        self.a12_filter
    }

    #[inline]
    fn prg_mode(&self) -> bool {
        self.bank_select & 0x40 != 0
    }

    #[inline]
    fn chr_inverted(&self) -> bool {
        self.bank_select & 0x80 != 0
    }

    fn update_banks(&mut self, mem: &CartridgeMemory) {
        let last = last_bank(PRG_BANK_8K, mem.prg_rom.len());
        let second_last = last.saturating_sub(1);
        let r6 = self.bank_regs[6] as usize;
        let r7 = self.bank_regs[7] as usize;
        if self.prg_mode() {
            self.banks.map_prg_8k(0, second_last, mem);
            self.banks.map_prg_8k(2, r6, mem);
        } else {
            self.banks.map_prg_8k(0, r6, mem);
            self.banks.map_prg_8k(2, second_last, mem);
        }
        self.banks.map_prg_8k(1, r7, mem);
        self.banks.map_prg_8k(3, last, mem);

        // 2 KiB banks ignore the low bit of R0/R1.
        let r = self.bank_regs.map(|b| b as usize);
        let layout = [r[0] & !1, r[0] | 1, r[1] & !1, r[1] | 1, r[2], r[3], r[4], r[5]];
        let flip = if self.chr_inverted() { 4 } else { 0 };
        for (i, &bank) in layout.iter().enumerate() {
            self.banks.map_chr_1k(i ^ flip, bank, mem);
        }
    }

    fn clock_irq_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }

    fn observe_a12(&mut self, addr: u16) {
        let high = addr & 0x1000 != 0;
        if high && !self.a12_high {
            if self.cycle.wrapping_sub(self.a12_low_since) >= self.a12_filter {
                self.clock_irq_counter();
            }
        } else if !high && self.a12_high {
            self.a12_low_since = self.cycle;
        }
        self.a12_high = high;
    }

    #[cfg(test)]
    pub(crate) fn irq_counter(&self) -> u8 {
        self.irq_counter
    }
}

impl Mapper for Mmc3 {
    fn mapper_id(&self) -> u16 {
        4
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        let filter = self.a12_filter;
        *self = Self::default();
        self.a12_filter = filter;
        self.bank_regs = [0, 2, 4, 5, 6, 7, 0, 1];
        self.update_banks(mem);
    }

    fn peek(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF if self.prg_ram_enabled => read_work_ram(mem, addr),
            0x8000..=0xFFFF => Some(self.banks.read_prg(mem, addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        let even = addr & 1 == 0;
        match addr {
            0x6000..=0x7FFF => {
                if self.prg_ram_enabled && !self.prg_ram_write_protect {
                    write_work_ram(mem, addr, value);
                }
            }
            0x8000..=0x9FFF => {
                if even {
                    self.bank_select = value;
                } else {
                    self.bank_regs[(self.bank_select & 0x07) as usize] = value;
                }
                self.update_banks(mem);
            }
            0xA000..=0xBFFF => {
                if even {
                    self.mirroring = Some(if value & 1 == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    });
                } else {
                    self.prg_ram_enabled = value & 0x80 != 0;
                    self.prg_ram_write_protect = value & 0x40 != 0;
                }
            }
            0xC000..=0xDFFF => {
                if even {
                    self.irq_latch = value;
                } else {
                    self.irq_counter = 0;
                    self.irq_reload = true;
                }
            }
            0xE000..=0xFFFF => {
                if even {
                    self.irq_enabled = false;
                    self.irq_pending = false;
                } else {
                    self.irq_enabled = true;
                }
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        self.observe_a12(addr);
        self.banks.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        self.observe_a12(addr);
        self.banks.write_chr(mem, addr, value);
    }

    fn mirroring(&self) -> Option<Mirroring> {
        self.mirroring
    }

    fn irq_asserted(&self) -> bool {
        self.irq_pending
    }

    fn cpu_tick(&mut self) {
        self.cycle = self.cycle.wrapping_add(1);
    }
}

impl SaveState for Mmc3 {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
        ar.write_bytes(&self.bank_regs);
        ar.write_u8(self.bank_select);
        ar.write_bool(self.mirroring.is_some());
        ar.write_u8(self.mirroring.map_or(0, Mirroring::to_u8));
        ar.write_bool(self.prg_ram_enabled);
        ar.write_bool(self.prg_ram_write_protect);
        ar.write_u8(self.irq_latch);
        ar.write_u8(self.irq_counter);
        ar.write_bool(self.irq_reload);
        ar.write_bool(self.irq_enabled);
        ar.write_bool(self.irq_pending);
        ar.write_bool(self.a12_high);
        ar.write_u64(self.a12_low_since);
        ar.write_u64(self.a12_filter);
        ar.write_u64(self.cycle);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)?;
        ar.read_into(&mut self.bank_regs)?;
        self.bank_select = ar.read_u8()?;
        let selected = ar.read_bool()?;
        let mode = Mirroring::from_u8(ar.read_u8()?);
        self.mirroring = selected.then_some(mode);
        self.prg_ram_enabled = ar.read_bool()?;
        self.prg_ram_write_protect = ar.read_bool()?;
        self.irq_latch = ar.read_u8()?;
        self.irq_counter = ar.read_u8()?;
        self.irq_reload = ar.read_bool()?;
        self.irq_enabled = ar.read_bool()?;
        self.irq_pending = ar.read_bool()?;
        self.a12_high = ar.read_bool()?;
        self.a12_low_since = ar.read_u64()?;
        self.a12_filter = ar.read_u64()?;
        self.cycle = ar.read_u64()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::banked_memory;

    fn setup() -> (Mmc3, CartridgeMemory) {
        // 128 KiB PRG (16 x 8 KiB), 128 KiB CHR (128 x 1 KiB)
        let mem = banked_memory(8, 16);
        let mut m = Mmc3::default();
        m.initialise(&mem);
        (m, mem)
    }

    fn set_reg(m: &mut Mmc3, mem: &mut CartridgeMemory, select: u8, value: u8) {
        m.cpu_write(mem, 0x8000, select);
        m.cpu_write(mem, 0x8001, value);
    }

    // One scanline's worth of A12 activity: low for a while, then a rising edge.
    fn scanline(m: &mut Mmc3, mem: &CartridgeMemory) {
        m.ppu_read(mem, 0x0000);
        for _ in 0..100 {
            m.cpu_tick();
        }
        m.ppu_read(mem, 0x1000);
    }

    #[test]
    fn prg_mode0_layout() {
        let (mut m, mut mem) = setup();
        set_reg(&mut m, &mut mem, 6, 3);
        set_reg(&mut m, &mut mem, 7, 5);
        assert_eq!(m.peek(&mem, 0x8000), Some(3));
        assert_eq!(m.peek(&mem, 0xA000), Some(5));
        assert_eq!(m.peek(&mem, 0xC000), Some(14));
        assert_eq!(m.peek(&mem, 0xE000), Some(15));
    }

    #[test]
    fn prg_mode1_swaps_fixed_bank() {
        let (mut m, mut mem) = setup();
        set_reg(&mut m, &mut mem, 0x46, 3);
        assert_eq!(m.peek(&mem, 0x8000), Some(14));
        assert_eq!(m.peek(&mem, 0xC000), Some(3));
        assert_eq!(m.peek(&mem, 0xE000), Some(15));
    }

    #[test]
    fn chr_inversion_switch() {
        let (mut m, mut mem) = setup();
        set_reg(&mut m, &mut mem, 0, 9); // 2 KiB bank: low bit ignored -> 8, 9
        set_reg(&mut m, &mut mem, 2, 40);
        assert_eq!(m.ppu_read(&mem, 0x0000), 8);
        assert_eq!(m.ppu_read(&mem, 0x0400), 9);
        assert_eq!(m.ppu_read(&mem, 0x1000), 40);

        m.cpu_write(&mut mem, 0x8000, 0x80);
        assert_eq!(m.ppu_read(&mem, 0x1000), 8);
        assert_eq!(m.ppu_read(&mem, 0x0000), 40);
    }

    #[test]
    fn mirroring_and_prg_ram_protect() {
        let (mut m, mut mem) = setup();
        assert_eq!(m.mirroring(), None);
        m.cpu_write(&mut mem, 0xA000, 1);
        assert_eq!(m.mirroring(), Some(Mirroring::Horizontal));
        m.cpu_write(&mut mem, 0xA000, 0);
        assert_eq!(m.mirroring(), Some(Mirroring::Vertical));

        m.cpu_write(&mut mem, 0x6000, 0x11);
        assert_eq!(m.peek(&mem, 0x6000), Some(0x11));
        m.cpu_write(&mut mem, 0xA001, 0xC0); // enabled + write protect
        m.cpu_write(&mut mem, 0x6000, 0x22);
        assert_eq!(m.peek(&mem, 0x6000), Some(0x11));
        m.cpu_write(&mut mem, 0xA001, 0x00);
        assert_eq!(m.peek(&mem, 0x6000), None);
    }

    #[test]
    fn irq_fires_after_latch_plus_one_edges() {
        let (mut m, mut mem) = setup();
        m.cpu_write(&mut mem, 0xC000, 3);
        m.cpu_write(&mut mem, 0xC001, 0);
        m.cpu_write(&mut mem, 0xE001, 0);

        scanline(&mut m, &mem); // reload -> 3
        assert_eq!(m.irq_counter(), 3);
        scanline(&mut m, &mem); // 2
        scanline(&mut m, &mem); // 1
        assert!(!m.irq_asserted());
        scanline(&mut m, &mem); // 0 -> IRQ
        assert!(m.irq_asserted());

        m.cpu_write(&mut mem, 0xE000, 0);
        assert!(!m.irq_asserted());
    }

    #[test]
    fn a12_filter_rejects_fast_toggles() {
        let (mut m, mut mem) = setup();
        m.cpu_write(&mut mem, 0xC000, 5);
        m.cpu_write(&mut mem, 0xC001, 0);
        scanline(&mut m, &mem);
        assert_eq!(m.irq_counter(), 5);
        // Low for a single CPU cycle: edge is filtered out.
        m.ppu_read(&mem, 0x0000);
        m.cpu_tick();
        m.ppu_read(&mem, 0x1000);
        assert_eq!(m.irq_counter(), 5);

        m.set_a12_filter(0);
        m.ppu_read(&mem, 0x0000);
        m.ppu_read(&mem, 0x1000);
        assert_eq!(m.irq_counter(), 4);
    }

    #[test]
    fn save_state_round_trip() {
        let (mut m, mut mem) = setup();
        set_reg(&mut m, &mut mem, 0x46, 7);
        m.cpu_write(&mut mem, 0xC000, 9);
        m.cpu_write(&mut mem, 0xC001, 0);
        m.cpu_write(&mut mem, 0xE001, 0);
        scanline(&mut m, &mem);
        scanline(&mut m, &mem);

        let mut ar = Archive::new();
        m.save_state(&mut ar);

        let mut restored = Mmc3::default();
        restored.initialise(&mem);
        restored.load_state(&mut ar).expect("load");
        assert_eq!(restored.banks, m.banks);
        assert_eq!(restored.bank_regs, m.bank_regs);
        assert_eq!(restored.bank_select, m.bank_select);
        assert_eq!(restored.irq_counter, m.irq_counter);
        assert_eq!(restored.irq_latch, m.irq_latch);
        assert_eq!(restored.irq_enabled, m.irq_enabled);
        assert_eq!(restored.a12_high, m.a12_high);
        assert_eq!(restored.a12_low_since, m.a12_low_since);
        assert_eq!(restored.cycle, m.cycle);
        assert_eq!(restored.peek(&mem, 0xC000), Some(7));
    }
}
