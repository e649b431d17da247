/*!
OAM DMA ($4014) state machine.

A write of $XX to $4014 copies $XX00-$XXFF into PPU OAM through OAMDATA.
The CPU is stalled for the whole transfer while the PPU keeps running:

- 1 alignment cycle when started on an even CPU cycle, 2 on an odd one.
- 256 read/write pairs.

Total: 513 or 514 CPU cycles. Source reads go through the normal CPU read
path, side effects included.
*/

use crate::archive::{Archive, ArchiveError, SaveState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DmaPhase {
    #[default]
    Read,
    Write,
}

/// Source side of a transfer. Must behave exactly like a CPU read.
pub trait CpuMemory {
    fn cpu_read(&mut self, addr: u16) -> u8;
}

/// Destination side. Equivalent to a write to $2004.
pub trait OamWriter {
    fn write_oam_data(&mut self, value: u8);
}

#[derive(Debug, Clone, Default)]
pub struct DmaController {
    active: bool,
    src_addr: u16,
    index: u16,
    phase: DmaPhase,
    latch: u8,
    align_cycles: u8,
}

impl DmaController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Begin a transfer from `src_page << 8`. The parity of `cpu_cycle`
    /// picks the number of alignment cycles.
    pub fn start(&mut self, src_page: u8, cpu_cycle: u64) {
        self.active = true;
        self.src_addr = (src_page as u16) << 8;
        self.index = 0;
        self.phase = DmaPhase::Read;
        self.latch = 0;
        self.align_cycles = 1 + (cpu_cycle & 1) as u8;
        log::trace!("OAM DMA from ${:04X}", self.src_addr);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// CPU stall cycles left, alignment included. 0 when idle.
    pub fn stall_remaining(&self) -> u32 {
        if !self.active {
            return 0;
        }
        let bytes_left = 256u32.saturating_sub(self.index as u32);
        let transfer = match self.phase {
            DmaPhase::Read => bytes_left * 2,
            DmaPhase::Write => bytes_left * 2 - 1,
        };
        self.align_cycles as u32 + transfer
    }

    /// One CPU cycle of the transfer. Returns whether the CPU is stalled.
    pub fn step_one_cycle<M: CpuMemory + OamWriter>(&mut self, mem: &mut M) -> bool {
        if !self.active {
            return false;
        }
        if self.align_cycles > 0 {
            self.align_cycles -= 1;
            return true;
        }

        match self.phase {
            DmaPhase::Read => {
                self.latch = mem.cpu_read(self.src_addr.wrapping_add(self.index));
                self.phase = DmaPhase::Write;
            }
            DmaPhase::Write => {
                mem.write_oam_data(self.latch);
                self.index += 1;
                self.phase = DmaPhase::Read;
                if self.index >= 256 {
                    self.active = false;
                }
            }
        }
        true
    }
}

impl SaveState for DmaController {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_bool(self.active);
        ar.write_u16(self.src_addr);
        ar.write_u16(self.index);
        ar.write_bool(self.phase == DmaPhase::Write);
        ar.write_u8(self.latch);
        ar.write_u8(self.align_cycles);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.active = ar.read_bool()?;
        self.src_addr = ar.read_u16()?;
        self.index = ar.read_u16()?;
        self.phase = if ar.read_bool()? {
            DmaPhase::Write
        } else {
            DmaPhase::Read
        };
        self.latch = ar.read_u8()?;
        self.align_cycles = ar.read_u8()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PatternMem {
        writes: Vec<u8>,
    }

    impl CpuMemory for PatternMem {
        fn cpu_read(&mut self, addr: u16) -> u8 {
            (addr & 0xFF) as u8 ^ 0x5A
        }
    }

    impl OamWriter for PatternMem {
        fn write_oam_data(&mut self, value: u8) {
            self.writes.push(value);
        }
    }

    fn run(start_cycle: u64) -> (u32, Vec<u8>) {
        let mut dma = DmaController::new();
        let mut mem = PatternMem { writes: Vec::new() };
        dma.start(0x02, start_cycle);
        let mut cycles = 0;
        while dma.is_active() {
            assert!(dma.step_one_cycle(&mut mem));
            cycles += 1;
        }
        (cycles, mem.writes)
    }

    #[test]
    fn even_start_takes_513_cycles() {
        let (cycles, writes) = run(0);
        assert_eq!(cycles, 513);
        assert_eq!(writes.len(), 256);
        for (i, &b) in writes.iter().enumerate() {
            assert_eq!(b, i as u8 ^ 0x5A);
        }
    }

    #[test]
    fn odd_start_takes_514_cycles() {
        assert_eq!(run(7).0, 514);
    }

    #[test]
    fn stall_remaining_counts_down() {
        let mut dma = DmaController::new();
        let mut mem = PatternMem { writes: Vec::new() };
        dma.start(0x10, 1);
        assert_eq!(dma.stall_remaining(), 514);
        dma.step_one_cycle(&mut mem);
        dma.step_one_cycle(&mut mem);
        dma.step_one_cycle(&mut mem);
        assert_eq!(dma.stall_remaining(), 511);
        assert!(mem.writes.is_empty());
        dma.step_one_cycle(&mut mem);
        assert_eq!(mem.writes.len(), 1);

        let mut idle = DmaController::new();
        assert!(!idle.step_one_cycle(&mut mem));
        assert_eq!(idle.stall_remaining(), 0);
    }
}
