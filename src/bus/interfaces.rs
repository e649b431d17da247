/*!
interfaces: the bus contract shared by every component, plus the small views
the orchestrator hands to the PPU.

Contract
- `IoBus` exposes the CPU address space (`cpu_read`/`cpu_write`) and the PPU
  address space (`ppu_read`/`ppu_write`).
- Signal methods (`signal_reset`, `signal_nmi`, `signal_irq`, `set_mirror_mode`)
  default to no-ops so components that never originate a signal need not
  implement them.
- Reads take `&mut self`: on real hardware a read is a bus transaction and may
  have side effects (PPU ports, mapper latches, A12 edge detection).

Views
- `OpenBus` answers every read with 0 and ignores writes. Used when no
  cartridge is inserted.
- `PpuPort` borrows the cartridge slot and an NMI latch so the PPU can fetch
  pattern data and raise NMI without borrowing the whole `Bus`.
*/

use crate::cartridge::{Cartridge, Mirroring};

/// Read/write contract all bus participants implement.
pub trait IoBus {
    /// CPU-visible read (full 16-bit address).
    fn cpu_read(&mut self, addr: u16) -> u8;

    /// CPU-visible write (full 16-bit address).
    fn cpu_write(&mut self, addr: u16, value: u8);

    /// PPU-visible read ($0000..=$3FFF).
    fn ppu_read(&mut self, _addr: u16) -> u8 {
        0
    }

    /// PPU-visible write ($0000..=$3FFF).
    fn ppu_write(&mut self, _addr: u16, _value: u8) {}

    /// Request a CPU reset sequence.
    fn signal_reset(&mut self) {}

    /// Rising edge on the NMI line.
    fn signal_nmi(&mut self) {}

    /// Level of the shared IRQ line.
    fn signal_irq(&mut self, _asserted: bool) {}

    /// Nametable mirroring changed.
    fn set_mirror_mode(&mut self, _mode: Mirroring) {}
}

/// Bus with nothing attached: reads return 0, writes vanish.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenBus;

impl IoBus for OpenBus {
    #[inline]
    fn cpu_read(&mut self, _addr: u16) -> u8 {
        0
    }

    #[inline]
    fn cpu_write(&mut self, _addr: u16, _value: u8) {}
}

/// PPU-side view of the bus: pattern-table traffic goes to the cartridge,
/// NMI edges are latched for the orchestrator to deliver to the CPU.
pub(crate) struct PpuPort<'a> {
    cartridge: Option<&'a mut Cartridge>,
    nmi: &'a mut bool,
}

impl<'a> PpuPort<'a> {
    #[inline]
    pub(crate) fn from_parts(cartridge: Option<&'a mut Cartridge>, nmi: &'a mut bool) -> Self {
        Self { cartridge, nmi }
    }
}

impl IoBus for PpuPort<'_> {
    #[inline]
    fn cpu_read(&mut self, _addr: u16) -> u8 {
        0
    }

    #[inline]
    fn cpu_write(&mut self, _addr: u16, _value: u8) {}

    #[inline]
    fn ppu_read(&mut self, addr: u16) -> u8 {
        match self.cartridge.as_deref_mut() {
            Some(cart) => cart.ppu_read(addr),
            None => 0,
        }
    }

    #[inline]
    fn ppu_write(&mut self, addr: u16, value: u8) {
        if let Some(cart) = self.cartridge.as_deref_mut() {
            cart.ppu_write(addr, value);
        }
    }

    #[inline]
    fn signal_nmi(&mut self) {
        *self.nmi = true;
    }
}
