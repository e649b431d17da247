/*!
System orchestrator: the master clock that ties CPU, PPU and bus together.

Clocking
- One `tick` is one PPU dot. The PPU runs on every tick and the CPU on every
  third (NTSC 3:1 ratio), so mapper counters and PPU side effects line up
  with CPU cycles exactly.
- On a CPU cycle, the NMI edge latched by the PPU and the IRQ line level
  (APU or mapper) are handed to the CPU first. Then either one OAM DMA cycle
  runs (the CPU is stalled) or the CPU performs one bus access. Mapper timers
  and the APU sequencer advance last.

Lifecycle
- `insert_cartridge` ejects the current cartridge, parses the new image and
  powers the system on. On a parse error the slot stays empty.
- `reset` pulses the reset line; `power_on` rebuilds every device.

Save states
- `save_state` returns a tagged byte blob. `load_state` either restores all
  of it or, on any error, leaves the system as it was.
*/

use std::path::Path;

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::bus::Bus;
use crate::cartridge::{Cartridge, CartridgeError};
use crate::cpu::{Cpu, TraceRecord};
use crate::ppu::Ppu;

/// Leading bytes of every save state.
const STATE_TAG: &[u8; 4] = b"FMC1";

/// PPU dots per CPU cycle.
const CPU_DIVIDER: u64 = 3;

/// Per-instruction trace callback.
pub type TraceSink = Box<dyn FnMut(&TraceRecord)>;

pub struct System {
    cpu: Cpu,
    bus: Bus,
    master_cycle: u64,
    trace: Option<TraceSink>,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    /// Powered-on system with an empty cartridge slot.
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            bus: Bus::new(),
            master_cycle: 0,
            trace: None,
        }
    }

    // ---------------------------------------------------------------------
    // Cartridge slot
    // ---------------------------------------------------------------------

    /// Eject whatever is inserted, then insert and power on with `rom`.
    pub fn insert_cartridge(&mut self, rom: &[u8]) -> Result<(), CartridgeError> {
        self.eject_cartridge();
        let cart = Cartridge::from_ines_bytes(rom)?;
        self.insert_parsed_cartridge(cart);
        Ok(())
    }

    pub fn insert_cartridge_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CartridgeError> {
        self.eject_cartridge();
        let cart = Cartridge::from_ines_file(path)?;
        self.insert_parsed_cartridge(cart);
        Ok(())
    }

    /// Insert an already-parsed cartridge and power on.
    pub fn insert_parsed_cartridge(&mut self, cart: Cartridge) {
        if let Some(old) = self.bus.insert_cartridge(cart) {
            log::info!("cartridge ejected (mapper {})", old.mapper_id());
        }
        self.power_on();
    }

    pub fn eject_cartridge(&mut self) -> Option<Cartridge> {
        let cart = self.bus.eject_cartridge();
        if let Some(cart) = &cart {
            log::info!("cartridge ejected (mapper {})", cart.mapper_id());
        }
        cart
    }

    pub fn cartridge(&self) -> Option<&Cartridge> {
        self.bus.cartridge()
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Pulse the reset line. The CPU runs its reset sequence on the next
    /// instruction boundary; RAM survives.
    pub fn reset(&mut self) {
        log::debug!("system reset at master cycle {}", self.master_cycle);
        self.cpu.signal_reset();
        self.bus.reset();
    }

    /// Cold start: every device is rebuilt and RAM is cleared.
    pub fn power_on(&mut self) {
        log::debug!("system power on");
        self.cpu = Cpu::new();
        self.bus.power_on();
        self.master_cycle = 0;
    }

    // ---------------------------------------------------------------------
    // Clocking
    // ---------------------------------------------------------------------

    /// Advance one master cycle (one PPU dot).
    pub fn tick(&mut self) {
        self.bus.tick_ppu();
        if self.master_cycle % CPU_DIVIDER == 0 {
            self.cpu_cycle();
        }
        self.master_cycle += 1;
    }

    fn cpu_cycle(&mut self) {
        if self.bus.take_nmi() {
            self.cpu.signal_nmi();
        }
        self.cpu.set_irq_line(self.bus.irq_asserted());

        if !self.bus.step_dma() {
            if self.cpu.will_fetch_opcode() {
                if let Some(sink) = self.trace.as_mut() {
                    let record = TraceRecord::capture(&self.cpu, |addr| self.bus.peek(addr));
                    sink(&record);
                }
            }
            self.cpu.tick(&mut self.bus);
        }

        self.bus.end_cpu_cycle();
    }

    /// Run until the CPU finishes an instruction (DMA stalls included).
    /// Returns the number of CPU cycles spent.
    pub fn step_instruction(&mut self) -> u32 {
        let mut cycles = 0;
        loop {
            let cpu_turn = self.master_cycle % CPU_DIVIDER == 0;
            self.tick();
            if cpu_turn {
                cycles += 1;
                if self.cpu.at_instruction_boundary() && !self.bus.dma_active() {
                    return cycles;
                }
            }
        }
    }

    /// Run until the PPU enters vertical blank.
    pub fn run_frame(&mut self) {
        loop {
            self.tick();
            if self.bus.ppu_mut().take_frame_complete() {
                return;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Host interface
    // ---------------------------------------------------------------------

    /// Set the pressed-button mask for controller `port` (bit 0 = A ...
    /// bit 7 = Right).
    pub fn set_controller(&mut self, port: usize, mask: u8) {
        self.bus.controller_mut(port).set_state_mask(mask);
    }

    pub fn set_trace_sink(&mut self, sink: Option<TraceSink>) {
        self.trace = sink;
    }

    pub fn master_cycle(&self) -> u64 {
        self.master_cycle
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    pub fn ppu(&self) -> &Ppu {
        self.bus.ppu()
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        self.bus.ppu_mut()
    }

    // ---------------------------------------------------------------------
    // Save states
    // ---------------------------------------------------------------------

    pub fn save_state(&self) -> Vec<u8> {
        let mut ar = Archive::new();
        ar.write_bytes(STATE_TAG);
        ar.write_u64(self.master_cycle);
        self.cpu.save_state(&mut ar);
        self.bus.save_state(&mut ar);
        match self.bus.cartridge() {
            Some(cart) => {
                ar.write_bool(true);
                cart.save_state(&mut ar);
            }
            None => ar.write_bool(false),
        }
        ar.into_bytes()
    }

    pub fn load_state(&mut self, data: &[u8]) -> Result<(), ArchiveError> {
        let backup = self.save_state();
        match self.decode_state(data) {
            Ok(()) => {
                log::debug!("state loaded ({} bytes)", data.len());
                Ok(())
            }
            Err(err) => {
                log::warn!("state load failed: {err}");
                if let Err(restore) = self.decode_state(&backup) {
                    crate::trap!("restoring state after failed load: {restore}");
                }
                Err(err)
            }
        }
    }

    fn decode_state(&mut self, data: &[u8]) -> Result<(), ArchiveError> {
        let mut ar = Archive::from_bytes(data);
        let mut tag = [0u8; 4];
        ar.read_into(&mut tag).map_err(|_| ArchiveError::BadTag)?;
        if &tag != STATE_TAG {
            return Err(ArchiveError::BadTag);
        }
        self.master_cycle = ar.read_u64()?;
        self.cpu.load_state(&mut ar)?;
        self.bus.load_state(&mut ar)?;
        let saved_cart = ar.read_bool()?;
        match (saved_cart, self.bus.cartridge_mut()) {
            (true, Some(cart)) => cart.load_state(&mut ar),
            (false, None) => Ok(()),
            _ => Err(ArchiveError::CartridgeMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{build_mapper_rom, build_nrom_with_prg, set_vectors_in_prg};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// LDA #$80 / STA $2000 / JMP * with an NMI handler doing INC $10 / RTI.
    const NMI_PROGRAM: &[u8] = &[
        0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80, 0xE6, 0x10, 0x40,
    ];

    fn system_with(prg: &[u8], vectors: (u16, u16, u16)) -> System {
        let rom = build_nrom_with_prg(prg, 1, 1, Some(vectors));
        let mut sys = System::new();
        sys.insert_cartridge(&rom).expect("valid rom");
        sys
    }

    #[test]
    fn cpu_runs_every_third_dot() {
        let mut sys = system_with(&[0x4C, 0x00, 0x80], (0x8000, 0x8000, 0x8000));
        for _ in 0..300 {
            sys.tick();
        }
        assert_eq!(sys.cpu().cycles(), 100);
        assert_eq!(sys.bus().cpu_cycle(), 100);
        assert_eq!(sys.ppu().dot(), 300);
    }

    #[test]
    fn program_writes_ram_after_reset_sequence() {
        // LDA #$42 / STA $0200 / JMP *
        let mut sys = system_with(
            &[0xA9, 0x42, 0x8D, 0x00, 0x02, 0x4C, 0x05, 0x80],
            (0x8000, 0x8000, 0x8000),
        );
        assert_eq!(sys.step_instruction(), 7);
        assert_eq!(sys.cpu().pc(), 0x8000);
        assert_eq!(sys.cpu().sp(), 0xFD);
        assert_eq!(sys.step_instruction(), 2);
        assert_eq!(sys.step_instruction(), 4);
        assert_eq!(sys.bus().peek(0x0200), 0x42);
    }

    #[test]
    fn vblank_nmi_reaches_the_cpu() {
        let mut sys = system_with(NMI_PROGRAM, (0x8000, 0x8008, 0x8000));
        for _ in 0..3 {
            sys.run_frame();
        }
        assert_eq!(sys.bus().peek(0x0010), 2);
        assert_eq!(sys.ppu().frame_count(), 2);
    }

    #[test]
    fn oam_dma_stalls_the_cpu() {
        // Reset sequence, then LDA #$02 / STA $4014 / JMP *
        let mut sys = system_with(
            &[0xA9, 0x02, 0x8D, 0x14, 0x40, 0x4C, 0x05, 0x80],
            (0x8000, 0x8000, 0x8000),
        );
        for _ in 0..2 {
            sys.step_instruction();
        }
        let cycles = sys.step_instruction();
        assert!(cycles == 4 + 513 || cycles == 4 + 514, "took {cycles}");
    }

    #[test]
    fn trace_sink_sees_each_instruction() {
        let mut sys = system_with(
            &[0xA9, 0x42, 0x8D, 0x00, 0x02, 0x4C, 0x05, 0x80],
            (0x8000, 0x8000, 0x8000),
        );
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let sink: TraceSink = Box::new(move |rec: &TraceRecord| {
            log.borrow_mut().push((rec.pc, rec.mnemonic));
        });
        sys.set_trace_sink(Some(sink));
        // The reset sequence is not traced.
        for _ in 0..5 {
            sys.step_instruction();
        }
        assert_eq!(
            *seen.borrow(),
            vec![
                (0x8000u16, "LDA"),
                (0x8002, "STA"),
                (0x8005, "JMP"),
                (0x8005, "JMP")
            ]
        );
    }

    #[test]
    fn reset_restarts_at_the_vector_and_keeps_ram() {
        let mut sys = system_with(
            &[0xA9, 0x42, 0x8D, 0x00, 0x02, 0x4C, 0x05, 0x80],
            (0x8000, 0x8000, 0x8000),
        );
        for _ in 0..4 {
            sys.step_instruction();
        }
        let sp = sys.cpu().sp();
        sys.reset();
        assert_eq!(sys.step_instruction(), 7);
        assert_eq!(sys.cpu().pc(), 0x8000);
        assert_eq!(sys.cpu().sp(), sp.wrapping_sub(3));
        assert_eq!(sys.bus().peek(0x0200), 0x42);
    }

    #[test]
    fn bad_rom_leaves_slot_empty() {
        let mut sys = system_with(&[0xEA], (0x8000, 0x8000, 0x8000));
        assert!(sys.insert_cartridge(b"not a rom").is_err());
        assert!(sys.cartridge().is_none());
    }

    #[test]
    fn controller_mask_is_forwarded() {
        let mut sys = System::new();
        sys.set_controller(1, 0x81);
        assert_eq!(sys.bus().controller(1).state_mask(), 0x81);
    }

    /// MMC3 program in the fixed last bank: turns rendering on with sprites
    /// fetched from $1000, arms a 16-line IRQ and counts IRQs in $21.
    const MMC3_PROGRAM: &[u8] = &[
        0xA9, 0x1E, 0x8D, 0x01, 0x20, // LDA #$1E / STA $2001
        0xA9, 0x08, 0x8D, 0x00, 0x20, // LDA #$08 / STA $2000
        0xA9, 0x10, 0x8D, 0x00, 0xC0, // LDA #$10 / STA $C000
        0x8D, 0x01, 0xC0, // STA $C001
        0x8D, 0x01, 0xE0, // STA $E001
        0x58, // CLI
        0xE6, 0x20, 0x4C, 0x16, 0xE0, // $E016: INC $20 / JMP $E016
        0x8D, 0x00, 0xE0, // $E01B: STA $E000
        0x8D, 0x01, 0xE0, // STA $E001
        0xE6, 0x21, 0x40, // INC $21 / RTI
    ];

    fn mmc3_rom() -> Vec<u8> {
        let mut rom = build_mapper_rom(4, 8, 8, 0);
        let prg_end = 16 + 8 * 0x4000;
        let last_bank = prg_end - 0x2000;
        rom[last_bank..last_bank + MMC3_PROGRAM.len()].copy_from_slice(MMC3_PROGRAM);
        set_vectors_in_prg(&mut rom[16..prg_end], 0xE000, 0xE000, 0xE01B);
        rom
    }

    #[test]
    fn mmc3_scanline_irq_reaches_the_cpu() {
        let mut sys = System::new();
        sys.insert_cartridge(&mmc3_rom()).expect("mmc3 rom");
        for _ in 0..3 {
            sys.run_frame();
        }
        assert!(sys.bus().peek(0x0021) > 0);
        assert!(sys.bus().peek(0x0020) > 0);
    }

    #[test]
    fn save_and_reload_replays_identically_on_mmc3() {
        let mut sys = System::new();
        sys.insert_cartridge(&mmc3_rom()).expect("mmc3 rom");
        sys.ppu_mut().attach_video_output(vec![0; 256 * 240]);
        for _ in 0..100_000 {
            sys.tick();
        }

        let snapshot = sys.save_state();
        for _ in 0..50_000 {
            sys.tick();
        }
        let first = sys.save_state();
        let irqs = sys.bus().peek(0x0021);

        sys.load_state(&snapshot).expect("reload");
        assert_eq!(sys.save_state(), snapshot);
        for _ in 0..50_000 {
            sys.tick();
        }
        assert_eq!(sys.save_state(), first);
        assert_eq!(sys.bus().peek(0x0021), irqs);
    }

    #[test]
    fn failed_loads_leave_the_system_untouched() {
        let mut sys = system_with(NMI_PROGRAM, (0x8000, 0x8008, 0x8000));
        sys.run_frame();
        let good = sys.save_state();

        assert_eq!(sys.load_state(b"JUNKJUNK"), Err(ArchiveError::BadTag));
        assert_eq!(sys.save_state(), good);

        let truncated = &good[..good.len() - 10];
        assert!(matches!(
            sys.load_state(truncated),
            Err(ArchiveError::UnexpectedEnd { .. })
        ));
        assert_eq!(sys.save_state(), good);

        let mut empty = System::new();
        assert_eq!(empty.load_state(&good), Err(ArchiveError::CartridgeMismatch));
    }

    #[test]
    fn state_from_another_mapper_is_rejected() {
        let nrom = system_with(&[0xEA], (0x8000, 0x8000, 0x8000));
        let saved = nrom.save_state();

        let mut mmc1 = System::new();
        mmc1.insert_cartridge(&build_mapper_rom(1, 2, 1, 0))
            .expect("mmc1 rom");
        let before = mmc1.save_state();
        assert_eq!(
            mmc1.load_state(&saved),
            Err(ArchiveError::MapperMismatch {
                saved: 0,
                inserted: 1
            })
        );
        assert_eq!(mmc1.save_state(), before);
    }
}
