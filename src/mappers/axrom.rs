/*
AxROM (Mapper 7) implementation.

Characteristics:
- PRG: 32 KiB switchable bank at $8000-$FFFF (value bits 0..2).
- CHR: 8 KiB RAM, unbanked.
- Mirroring: single-screen, nametable chosen by value bit 4.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{CartridgeMemory, Mirroring};
use crate::mapper::{BankMap, Mapper};

#[derive(Debug, Clone, Default)]
pub struct Axrom {
    banks: BankMap,
    reg: u8,
}

impl Mapper for Axrom {
    fn mapper_id(&self) -> u16 {
        7
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        self.reg = 0;
        self.banks.map_prg_32k(0, mem);
        self.banks.map_chr_8k(0, mem);
    }

    fn peek(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            0x8000..=0xFFFF => Some(self.banks.read_prg(mem, addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        if addr >= 0x8000 {
            self.reg = value;
            self.banks.map_prg_32k((value & 0x07) as usize, mem);
        }
    }

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        self.banks.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        self.banks.write_chr(mem, addr, value);
    }

    fn mirroring(&self) -> Option<Mirroring> {
        Some(if self.reg & 0x10 != 0 {
            Mirroring::SingleScreenUpper
        } else {
            Mirroring::SingleScreenLower
        })
    }
}

impl SaveState for Axrom {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
        ar.write_u8(self.reg);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)?;
        self.reg = ar.read_u8()?;
        Ok(())
    }
}
