/*
UxROM (Mapper 2) implementation.

Characteristics:
- PRG: 16 KiB switchable bank at $8000-$BFFF, last 16 KiB bank fixed at $C000-$FFFF.
- CHR: 8 KiB, almost always RAM; no CHR banking.
- Mirroring: header only. No IRQ.

Bank Select:
- Any write to $8000-$FFFF selects the $8000 bank; the value wraps to the
  number of 16 KiB banks present.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::CartridgeMemory;
use crate::mapper::{BankMap, Mapper, PRG_BANK_16K, last_bank, read_work_ram, write_work_ram};

#[derive(Debug, Clone, Default)]
pub struct Uxrom {
    banks: BankMap,
    bank_select: u8,
}

impl Mapper for Uxrom {
    fn mapper_id(&self) -> u16 {
        2
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        self.bank_select = 0;
        self.banks.map_prg_16k(0, 0, mem);
        self.banks
            .map_prg_16k(1, last_bank(PRG_BANK_16K, mem.prg_rom.len()), mem);
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
        match addr {
            0x6000..=0x7FFF => write_work_ram(mem, addr, value),
            0x8000..=0xFFFF => {
                self.bank_select = value;
                self.banks.map_prg_16k(0, value as usize, mem);
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
}

impl SaveState for Uxrom {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
        ar.write_u8(self.bank_select);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)?;
        self.bank_select = ar.read_u8()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::banked_memory;

    #[test]
    fn switchable_low_fixed_high() {
        let mut mem = banked_memory(8, 0);
        let mut m = Uxrom::default();
        m.initialise(&mem);
        assert_eq!(m.peek(&mem, 0x8000), Some(0));
        assert_eq!(m.peek(&mem, 0xC000), Some(14));

        m.cpu_write(&mut mem, 0x8000, 3);
        assert_eq!(m.peek(&mem, 0x8000), Some(6));
        assert_eq!(m.peek(&mem, 0xA000), Some(7));
        assert_eq!(m.peek(&mem, 0xE000), Some(15));

        // 8 banks present: 11 wraps to 3.
        m.cpu_write(&mut mem, 0xFFFF, 11);
        assert_eq!(m.peek(&mem, 0x8000), Some(6));
    }

    #[test]
    fn non_power_of_two_bank_count_wraps_with_modulo() {
        // 3 x 16 KiB: fixed bank is 2, bank 4 -> 1.
        let mut mem = banked_memory(3, 0);
        let mut m = Uxrom::default();
        m.initialise(&mem);
        assert_eq!(m.peek(&mem, 0xC000), Some(4));
        m.cpu_write(&mut mem, 0x8000, 4);
        assert_eq!(m.peek(&mem, 0x8000), Some(2));
    }
}
