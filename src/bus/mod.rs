#![doc = r#"
Bus module

Overview
- `Bus` owns every device the CPU can address and implements `IoBus` for it.
  The CPU itself lives in `System`, which drives the bus one cycle at a time.

Address map
- $0000-$1FFF: 2 KiB internal RAM, mirrored every $0800
- $2000-$3FFF: PPU ports $2000-$2007, mirrored every 8 bytes
- $4000-$4013, $4015, $4017 (write): APU register stub
- $4014: OAM DMA (write)
- $4016: controller strobe (write), controller 1 serial read
- $4017: controller 2 serial read
- $4018-$401F: unused, open bus
- $4020-$FFFF: cartridge (expansion, PRG RAM, PRG ROM and the vectors)

Open bus
- The last value driven on the data bus is latched. Reads nothing answers
  return it, and controller reads fill their upper bits from it.

Modules
- interfaces: `IoBus` contract, `OpenBus`, and the PPU-side `PpuPort` view
- ram: internal 2 KiB RAM
- dma: OAM DMA state machine
"#]

pub mod dma;
pub mod interfaces;
pub mod ram;

pub use dma::{CpuMemory, DmaController, OamWriter};
pub use interfaces::{IoBus, OpenBus};
pub use ram::Ram;

pub(crate) use interfaces::PpuPort;

use crate::apu::Apu;
use crate::archive::{Archive, ArchiveError, SaveState};
use crate::cartridge::{Cartridge, Mirroring};
use crate::controller::Controller;
use crate::ppu::Ppu;

pub struct Bus {
    ram: Ram,
    ppu: Ppu,
    apu: Apu,
    controllers: [Controller; 2],
    dma: DmaController,
    cartridge: Option<Cartridge>,
    open_bus: u8,
    nmi_latch: bool,
    cpu_cycle: u64,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self {
            ram: Ram::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            controllers: [Controller::new(), Controller::new()],
            dma: DmaController::new(),
            cartridge: None,
            open_bus: 0,
            nmi_latch: false,
            cpu_cycle: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Device access
    // ---------------------------------------------------------------------

    pub fn ram(&self) -> &Ram {
        &self.ram
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn apu(&self) -> &Apu {
        &self.apu
    }

    /// Controller on port `port` (0 or 1; other values select port 1).
    pub fn controller(&self, port: usize) -> &Controller {
        &self.controllers[port.min(1)]
    }

    pub fn controller_mut(&mut self, port: usize) -> &mut Controller {
        &mut self.controllers[port.min(1)]
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.cartridge.as_ref()
    }

    pub fn cartridge_mut(&mut self) -> Option<&mut Cartridge> {
        self.cartridge.as_mut()
    }

    /// Put `cart` in the slot, returning whatever was there before.
    pub fn insert_cartridge(&mut self, cart: Cartridge) -> Option<Cartridge> {
        self.ppu.set_mirror_mode(cart.mirroring());
        self.cartridge.replace(cart)
    }

    pub fn eject_cartridge(&mut self) -> Option<Cartridge> {
        self.cartridge.take()
    }

    /// CPU cycles elapsed since power-on.
    pub fn cpu_cycle(&self) -> u64 {
        self.cpu_cycle
    }

    pub fn open_bus(&self) -> u8 {
        self.open_bus
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Reset line: PPU, APU, DMA and mapper return to their reset state.
    /// RAM keeps its contents.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.dma.reset();
        self.nmi_latch = false;
        if let Some(cart) = self.cartridge.as_mut() {
            cart.reset();
            self.ppu.set_mirror_mode(cart.mirroring());
        }
    }

    /// Power cycle: every device is rebuilt and RAM is cleared. The
    /// cartridge stays inserted (its work RAM is kept).
    pub fn power_on(&mut self) {
        let video = self.ppu.detach_video_output();
        self.ram.clear();
        self.ppu = Ppu::new();
        if let Some(buffer) = video {
            self.ppu.attach_video_output(buffer);
        }
        self.apu = Apu::new();
        self.dma = DmaController::new();
        self.open_bus = 0;
        self.nmi_latch = false;
        self.cpu_cycle = 0;
        if let Some(cart) = self.cartridge.as_mut() {
            cart.reset();
            self.ppu.set_mirror_mode(cart.mirroring());
        }
    }

    // ---------------------------------------------------------------------
    // Clocking (driven by `System`)
    // ---------------------------------------------------------------------

    /// One PPU dot. Pattern fetches go to the cartridge; NMI edges are latched.
    pub fn tick_ppu(&mut self) {
        let mut port = PpuPort::from_parts(self.cartridge.as_mut(), &mut self.nmi_latch);
        self.ppu.tick(&mut port);
    }

    /// Consume a latched NMI edge from the PPU.
    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_latch)
    }

    /// Level of the shared IRQ line (APU frame IRQ or mapper IRQ).
    pub fn irq_asserted(&self) -> bool {
        self.apu.irq_asserted()
            || self
                .cartridge
                .as_ref()
                .is_some_and(|cart| cart.irq_asserted())
    }

    pub fn dma_active(&self) -> bool {
        self.dma.is_active()
    }

    /// One CPU cycle of OAM DMA. Returns whether the CPU is stalled.
    pub fn step_dma(&mut self) -> bool {
        let mut dma = std::mem::take(&mut self.dma);
        let stalled = dma.step_one_cycle(&mut DmaPort(self));
        self.dma = dma;
        stalled
    }

    /// Close out a CPU cycle: mapper timers and the APU sequencer advance.
    pub fn end_cpu_cycle(&mut self) {
        if let Some(cart) = self.cartridge.as_mut() {
            cart.cpu_tick();
        }
        self.apu.tick();
        self.cpu_cycle += 1;
    }

    // ---------------------------------------------------------------------
    // Debug views
    // ---------------------------------------------------------------------

    /// Read without side effects, for tracing and debuggers.
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram.read(addr),
            0x2000..=0x3FFF => self.ppu.peek_register(addr),
            0x4015 => self.apu.peek_status(),
            0x4016 | 0x4017 => {
                self.controllers[(addr - 0x4016) as usize].peek() | (self.open_bus & 0xE0)
            }
            0x4000..=0x401F => self.open_bus,
            _ => self
                .cartridge
                .as_ref()
                .and_then(|cart| cart.peek(addr))
                .unwrap_or(self.open_bus),
        }
    }

    fn sync_mirroring(&mut self) {
        if let Some(cart) = self.cartridge.as_ref() {
            let mode = cart.mirroring();
            if mode != self.ppu.mirror_mode() {
                log::trace!("mirroring -> {mode:?}");
                self.ppu.set_mirror_mode(mode);
            }
        }
    }
}

impl IoBus for Bus {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..=0x1FFF => self.ram.read(addr),
            0x2000..=0x3FFF => {
                let mut port = PpuPort::from_parts(self.cartridge.as_mut(), &mut self.nmi_latch);
                self.ppu.cpu_read(addr, &mut port)
            }
            0x4015 => self.apu.read_reg(addr).unwrap_or(self.open_bus),
            0x4016 | 0x4017 => {
                self.controllers[(addr - 0x4016) as usize].read() | (self.open_bus & 0xE0)
            }
            0x4000..=0x401F => self.open_bus,
            _ => match self.cartridge.as_mut() {
                Some(cart) => cart.try_cpu_read(addr).unwrap_or(self.open_bus),
                None => self.open_bus,
            },
        };
        self.open_bus = value;
        value
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;
        match addr {
            0x0000..=0x1FFF => self.ram.write(addr, value),
            0x2000..=0x3FFF => {
                let mut port = PpuPort::from_parts(self.cartridge.as_mut(), &mut self.nmi_latch);
                self.ppu.cpu_write(addr, value, &mut port);
            }
            0x4014 => self.dma.start(value, self.cpu_cycle),
            0x4016 => {
                for pad in &mut self.controllers {
                    pad.write_strobe(value);
                }
            }
            0x4000..=0x4017 => self.apu.write_reg(addr, value),
            0x4018..=0x401F => {}
            _ => {
                if let Some(cart) = self.cartridge.as_mut() {
                    cart.cpu_write(addr, value);
                    self.sync_mirroring();
                }
            }
        }
    }

    /// PPU address space as the PPU sees it (pattern tables on the
    /// cartridge, nametables and palette inside the PPU).
    fn ppu_read(&mut self, addr: u16) -> u8 {
        let mut port = PpuPort::from_parts(self.cartridge.as_mut(), &mut self.nmi_latch);
        self.ppu.mem_read(&mut port, addr)
    }

    fn ppu_write(&mut self, addr: u16, value: u8) {
        let mut port = PpuPort::from_parts(self.cartridge.as_mut(), &mut self.nmi_latch);
        self.ppu.mem_write(&mut port, addr, value);
    }

    fn signal_nmi(&mut self) {
        self.nmi_latch = true;
    }

    fn set_mirror_mode(&mut self, mode: Mirroring) {
        self.ppu.set_mirror_mode(mode);
    }
}

/// DMA's view of the bus: source reads are ordinary CPU reads, writes land
/// in OAM as $2004 writes would.
struct DmaPort<'a>(&'a mut Bus);

impl CpuMemory for DmaPort<'_> {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        self.0.cpu_read(addr)
    }
}

impl OamWriter for DmaPort<'_> {
    fn write_oam_data(&mut self, value: u8) {
        self.0.open_bus = value;
        self.0.ppu.write_oam_data(value);
    }
}

/// Device state only; cartridge presence and contents are saved by `System`.
impl SaveState for Bus {
    fn save_state(&self, ar: &mut Archive) {
        self.ram.save_state(ar);
        self.ppu.save_state(ar);
        self.apu.save_state(ar);
        for pad in &self.controllers {
            pad.save_state(ar);
        }
        self.dma.save_state(ar);
        ar.write_u8(self.open_bus);
        ar.write_bool(self.nmi_latch);
        ar.write_u64(self.cpu_cycle);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.ram.load_state(ar)?;
        self.ppu.load_state(ar)?;
        self.apu.load_state(ar)?;
        for pad in &mut self.controllers {
            pad.load_state(ar)?;
        }
        self.dma.load_state(ar)?;
        self.open_bus = ar.read_u8()?;
        self.nmi_latch = ar.read_bool()?;
        self.cpu_cycle = ar.read_u64()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
