/*!
Sunsoft FME-7 (Mapper 69)

Registers:
- $8000-$9FFF: command register (low 4 bits select the target).
- $A000-$BFFF: parameter register, written to the selected target:
  * $0-$7: 1 KiB CHR bank for $0000 + n * $400
  * $8:    $6000 window. Bits 0..5 bank, bit 6 RAM select, bit 7 RAM enable
  * $9-$B: 8 KiB PRG bank for $8000 / $A000 / $C000 ($E000 is fixed to the last bank)
  * $C:    mirroring (0 vertical, 1 horizontal, 2 one-screen lower, 3 one-screen upper)
  * $D:    IRQ control. Bit 0 enables the IRQ, bit 7 enables counting; any write acknowledges
  * $E/$F: IRQ counter low / high byte

IRQ:
- While counting is enabled the 16-bit counter decrements once per CPU cycle.
  Wrapping from $0000 to $FFFF asserts the IRQ if it is enabled.
*/

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{CartridgeMemory, Mirroring};
use crate::mapper::{BankMap, Mapper, PRG_BANK_8K, bank_offset, last_bank};

#[derive(Debug, Clone)]
pub struct Fme7 {
    banks: BankMap,
    command: u8,
    chr_regs: [u8; 8],
    prg_regs: [u8; 4],
    mirroring: Mirroring,

    irq_enabled: bool,
    counter_enabled: bool,
    irq_counter: u16,
    irq_pending: bool,
}

impl Default for Fme7 {
    fn default() -> Self {
        Self {
            banks: BankMap::default(),
            command: 0,
            chr_regs: [0; 8],
            prg_regs: [0; 4],
            mirroring: Mirroring::Vertical,
            irq_enabled: false,
            counter_enabled: false,
            irq_counter: 0,
            irq_pending: false,
        }
    }
}

impl Fme7 {
    #[inline]
    fn ram_selected(&self) -> bool {
        self.prg_regs[0] & 0x40 != 0
    }

    #[inline]
    fn ram_enabled(&self) -> bool {
        self.prg_regs[0] & 0x80 != 0
    }

    fn update_banks(&mut self, mem: &CartridgeMemory) {
        for slot in 0..3 {
            self.banks
                .map_prg_8k(slot, self.prg_regs[slot + 1] as usize, mem);
        }
        self.banks
            .map_prg_8k(3, last_bank(PRG_BANK_8K, mem.prg_rom.len()), mem);
        for (slot, &bank) in self.chr_regs.iter().enumerate() {
            self.banks.map_chr_1k(slot, bank as usize, mem);
        }
    }

    fn write_parameter(&mut self, mem: &CartridgeMemory, value: u8) {
        match self.command {
            0x0..=0x7 => {
                self.chr_regs[self.command as usize] = value;
                self.update_banks(mem);
            }
            0x8 => self.prg_regs[0] = value,
            0x9..=0xB => {
                self.prg_regs[(self.command - 0x8) as usize] = value & 0x3F;
                self.update_banks(mem);
            }
            0xC => {
                self.mirroring = match value & 0x03 {
                    0 => Mirroring::Vertical,
                    1 => Mirroring::Horizontal,
                    2 => Mirroring::SingleScreenLower,
                    _ => Mirroring::SingleScreenUpper,
                };
            }
            0xD => {
                self.irq_enabled = value & 0x01 != 0;
                self.counter_enabled = value & 0x80 != 0;
                self.irq_pending = false;
            }
            0xE => self.irq_counter = (self.irq_counter & 0xFF00) | value as u16,
            _ => self.irq_counter = (self.irq_counter & 0x00FF) | ((value as u16) << 8),
        }
    }
}

impl Mapper for Fme7 {
    fn mapper_id(&self) -> u16 {
        69
    }

    fn initialise(&mut self, mem: &CartridgeMemory) {
        *self = Self::default();
        self.update_banks(mem);
    }

    fn peek(&self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            0x6000..=0x7FFF => {
                if self.ram_selected() {
                    if self.ram_enabled() {
                        mem.read_work_ram((addr as usize) - 0x6000)
                    } else {
                        None
                    }
                } else {
                    let base = bank_offset(
                        (self.prg_regs[0] & 0x3F) as usize,
                        PRG_BANK_8K,
                        mem.prg_rom.len(),
                    );
                    Some(mem.read_prg(base + (addr as usize & 0x1FFF)))
                }
            }
            0x8000..=0xFFFF => Some(self.banks.read_prg(mem, addr)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, value: u8) {
        match addr {
            0x6000..=0x7FFF => {
                if self.ram_selected() && self.ram_enabled() {
                    mem.write_work_ram((addr as usize) - 0x6000, value);
                }
            }
            0x8000..=0x9FFF => self.command = value & 0x0F,
            0xA000..=0xBFFF => self.write_parameter(mem, value),
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
        Some(self.mirroring)
    }

    fn irq_asserted(&self) -> bool {
        self.irq_pending
    }

    fn cpu_tick(&mut self) {
        if self.counter_enabled {
            self.irq_counter = self.irq_counter.wrapping_sub(1);
            if self.irq_counter == 0xFFFF && self.irq_enabled {
                self.irq_pending = true;
            }
        }
    }
}

impl SaveState for Fme7 {
    fn save_state(&self, ar: &mut Archive) {
        self.banks.save_state(ar);
        ar.write_u8(self.command);
        ar.write_bytes(&self.chr_regs);
        ar.write_bytes(&self.prg_regs);
        ar.write_u8(self.mirroring.to_u8());
        ar.write_bool(self.irq_enabled);
        ar.write_bool(self.counter_enabled);
        ar.write_u16(self.irq_counter);
        ar.write_bool(self.irq_pending);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.banks.load_state(ar)?;
        self.command = ar.read_u8()?;
        ar.read_into(&mut self.chr_regs)?;
        ar.read_into(&mut self.prg_regs)?;
        self.mirroring = Mirroring::from_u8(ar.read_u8()?);
        self.irq_enabled = ar.read_bool()?;
        self.counter_enabled = ar.read_bool()?;
        self.irq_counter = ar.read_u16()?;
        self.irq_pending = ar.read_bool()?;
        Ok(())
    }
}
