/*
CNROM (Mapper 3) implementation.

Characteristics:
- PRG: Fixed (16 KiB mirrored or 32 KiB direct) at $8000-$FFFF; no PRG banking.
- CHR: Switchable in 8 KiB banks via CPU writes to $8000-$FFFF.
- Mirroring: header only. No IRQ.

Bank Select:
- The written value selects the CHR bank, wrapped to the number of 8 KiB banks present.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::CartridgeMemory;
use crate::mapper::{BankMap, Mapper, read_work_ram, write_work_ram};

#[derive(Debug, Clone, Default)]
pub struct Cnrom {
    banks: BankMap,
    chr_bank: u8,
}

impl Mapper for Cnrom {
    fn mapper_id(&self) -> u16 {
        3
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        self.chr_bank = 0;
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
        match addr {
            0x6000..=0x7FFF => write_work_ram(mem, addr, value),
            0x8000..=0xFFFF => {
                self.chr_bank = value;
                self.banks.map_chr_8k(value as usize, mem);
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

impl SaveState for Cnrom {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
        ar.write_u8(self.chr_bank);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)?;
        self.chr_bank = ar.read_u8()?;
        Ok(())
    }
}
