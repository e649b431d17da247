/*
Bandai 74161/7432 (Mapper 152) implementation.

Characteristics:
- One register at $8000-$FFFF:
  - bit 7: single-screen nametable select
  - bits 4..6: 16 KiB PRG bank at $8000-$BFFF
  - bits 0..3: 8 KiB CHR bank
- $C000-$FFFF is fixed to the last 16 KiB bank.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{CartridgeMemory, Mirroring};
use crate::mapper::{BankMap, Mapper, PRG_BANK_16K, last_bank};

#[derive(Debug, Clone, Default)]
pub struct Bandai152 {
    banks: BankMap,
    reg: u8,
}

impl Mapper for Bandai152 {
    fn mapper_id(&self) -> u16 {
        152
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        self.reg = 0;
        self.banks.map_prg_16k(0, 0, mem);
        self.banks
            .map_prg_16k(1, last_bank(PRG_BANK_16K, mem.prg_rom.len()), mem);
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
            self.banks.map_prg_16k(0, ((value >> 4) & 0x07) as usize, mem);
            self.banks.map_chr_8k((value & 0x0F) as usize, mem);
        }
    }

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        self.banks.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        self.banks.write_chr(mem, addr, value);
    }

    fn mirroring(&self) -> Option<Mirroring> {
        Some(if self.reg & 0x80 != 0 {
            Mirroring::SingleScreenUpper
        } else {
            Mirroring::SingleScreenLower
        })
    }
}

impl SaveState for Bandai152 {
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
