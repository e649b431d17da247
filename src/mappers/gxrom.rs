/*
GxROM (Mapper 66) implementation.

Characteristics:
- One register at $8000-$FFFF: bits 4..5 select a 32 KiB PRG bank,
  bits 0..1 select an 8 KiB CHR bank.
- Mirroring: header only. No IRQ.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::CartridgeMemory;
use crate::mapper::{BankMap, Mapper};

#[derive(Debug, Clone, Default)]
pub struct Gxrom {
    banks: BankMap,
    reg: u8,
}

impl Mapper for Gxrom {
    fn mapper_id(&self) -> u16 {
        66
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
            self.banks.map_prg_32k(((value >> 4) & 0x03) as usize, mem);
            self.banks.map_chr_8k((value & 0x03) as usize, mem);
        }
    }

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        self.banks.read_chr(mem, addr)
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        self.banks.write_chr(mem, addr, value);
    }
}

impl SaveState for Gxrom {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::banked_memory;

    #[test]
    fn prg_and_chr_from_one_register() {
        let mut mem = banked_memory(8, 4);
        let mut m = Gxrom::default();
        m.initialise(&mem);
        m.cpu_write(&mut mem, 0x8000, 0x21);
        assert_eq!(m.peek(&mem, 0x8000), Some(8));
        assert_eq!(m.ppu_read(&mem, 0x0000), 8);
        assert_eq!(m.ppu_read(&mem, 0x1C00), 15);
    }
}
