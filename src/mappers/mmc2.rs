/*!
MMC2 (Mapper 9)

Banking:
- $A000-$AFFF: 8 KiB PRG bank at $8000; the last three 8 KiB banks are fixed
  at $A000, $C000 and $E000.
- $B000/$C000: 4 KiB CHR bank for $0000 when latch 0 holds $FD / $FE.
- $D000/$E000: 4 KiB CHR bank for $1000 when latch 1 holds $FD / $FE.
- $F000: mirroring (bit 0: 0=Vertical, 1=Horizontal).

Latches:
- Pattern reads of $0FD8 / $0FE8 set latch 0 to $FD / $FE.
- Pattern reads of $1FD8-$1FDF / $1FE8-$1FEF set latch 1 to $FD / $FE.
- The switch takes effect after the triggering read, so the sentinel tile
  itself still comes from the old bank.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{CartridgeMemory, Mirroring};
use crate::mapper::{BankMap, Mapper, PRG_BANK_8K, last_bank, read_work_ram, write_work_ram};

const LATCH_FD: u8 = 0xFD;
const LATCH_FE: u8 = 0xFE;

#[derive(Debug, Clone)]
pub struct Mmc2 {
    banks: BankMap,
    prg_bank: u8,
    // [latch0 FD, latch0 FE, latch1 FD, latch1 FE]
    chr_banks: [u8; 4],
    latch: [u8; 2],
    mirroring: Mirroring,
}

impl Default for Mmc2 {
    fn default() -> Self {
        Self {
            banks: BankMap::default(),
            prg_bank: 0,
            chr_banks: [0; 4],
            latch: [LATCH_FE; 2],
            mirroring: Mirroring::Vertical,
        }
    }
}

impl Mmc2 {
    fn update_chr(&mut self, mem: &CartridgeMemory) {
        for half in 0..2 {
            let sel = if self.latch[half] == LATCH_FD { 0 } else { 1 };
            let bank = self.chr_banks[half * 2 + sel] as usize;
            self.banks.map_chr_4k(half * 4, bank, mem);
        }
    }

    fn update_prg(&mut self, mem: &CartridgeMemory) {
        let last = last_bank(PRG_BANK_8K, mem.prg_rom.len());
        self.banks.map_prg_8k(0, self.prg_bank as usize, mem);
        self.banks.map_prg_8k(1, last.saturating_sub(2), mem);
        self.banks.map_prg_8k(2, last.saturating_sub(1), mem);
        self.banks.map_prg_8k(3, last, mem);
    }
}

impl Mapper for Mmc2 {
    fn mapper_id(&self) -> u16 {
        9
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        *self = Self::default();
        self.update_prg(mem);
        self.update_chr(mem);
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
            0xA000..=0xAFFF => {
                self.prg_bank = value & 0x0F;
                self.update_prg(mem);
            }
            0xB000..=0xEFFF => {
                let idx = ((addr - 0xB000) >> 12) as usize;
                self.chr_banks[idx] = value & 0x1F;
                self.update_chr(mem);
            }
            0xF000..=0xFFFF => {
                self.mirroring = if value & 1 == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
            }
            _ => {}
        }
    }

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        let value = self.banks.read_chr(mem, addr);
        let new_latch = match addr {
            0x0FD8 => Some((0, LATCH_FD)),
            0x0FE8 => Some((0, LATCH_FE)),
            0x1FD8..=0x1FDF => Some((1, LATCH_FD)),
            0x1FE8..=0x1FEF => Some((1, LATCH_FE)),
            _ => None,
        };
        if let Some((half, v)) = new_latch {
            self.latch[half] = v;
            self.update_chr(mem);
        }
        value
    }

    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        self.banks.write_chr(mem, addr, value);
    }

    fn mirroring(&self) -> Option<Mirroring> {
        Some(self.mirroring)
    }
}

impl SaveState for Mmc2 {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
        ar.write_u8(self.prg_bank);
        ar.write_bytes(&self.chr_banks);
        ar.write_bytes(&self.latch);
        ar.write_u8(self.mirroring.to_u8());
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)?;
        self.prg_bank = ar.read_u8()?;
        ar.read_into(&mut self.chr_banks)?;
        ar.read_into(&mut self.latch)?;
        self.mirroring = Mirroring::from_u8(ar.read_u8()?);
        Ok(())
    }
}
