//! Shared test utilities: minimal iNES images, pre-filled cartridge memory,
//! and a flat 64 KiB bus that records every transaction.
//!
//! Notes on iNES header fields used here:
//! - bytes[0..4] = b"NES\x1A"
//! - byte 4 = PRG ROM size in 16 KiB units
//! - byte 5 = CHR ROM size in 8 KiB units (0 => loader allocates 8 KiB CHR RAM)
//! - byte 6 = Flags 6 (mirroring, battery, trainer, four-screen, mapper low nibble)
//! - byte 7 = Flags 7 (NES 2.0 indicator, mapper high nibble)
//! - byte 8 = PRG RAM size in 8 KiB units (0 => 8 KiB by convention)
//! - bytes 9..15 = padding/reserved
//!
//! Vectors sit in the last 6 bytes of PRG, whatever its size.

#![allow(dead_code)]

use crate::bus::IoBus;
use crate::cartridge::CartridgeMemory;

/// Build a minimal iNES (v1) image with configurable PRG/CHR sizes and flags.
/// PRG is filled with 0xAA and CHR with 0xCC.
pub fn build_ines(
    prg_16k: usize,
    chr_8k: usize,
    flags6: u8,
    flags7: u8,
    prg_ram_8k: u8,
    trainer: Option<&[u8; 512]>,
) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(
        16 + trainer.map(|_| 512).unwrap_or(0) + prg_16k * 16 * 1024 + chr_8k * 8 * 1024,
    );

    bytes.extend_from_slice(b"NES\x1A");
    bytes.push(prg_16k as u8);
    bytes.push(chr_8k as u8);
    bytes.push(flags6);
    bytes.push(flags7);
    bytes.push(prg_ram_8k);
    bytes.extend_from_slice(&[0u8; 7]);

    if let Some(t) = trainer {
        bytes.extend_from_slice(t);
    }
    bytes.extend(std::iter::repeat_n(0xAA, prg_16k * 16 * 1024));
    bytes.extend(std::iter::repeat_n(0xCC, chr_8k * 8 * 1024));
    bytes
}

/// iNES image for `mapper_id` whose PRG bytes equal their 8 KiB bank number
/// and CHR bytes equal their 1 KiB bank number. Vectors point at $8000.
pub fn build_mapper_rom(mapper_id: u8, prg_16k: usize, chr_8k: usize, flags6: u8) -> Vec<u8> {
    let mut rom = build_ines(
        prg_16k,
        chr_8k,
        (flags6 & 0x0F) | (mapper_id << 4),
        mapper_id & 0xF0,
        1,
        None,
    );
    let prg_end = 16 + prg_16k * 16 * 1024;
    fill_banks(&mut rom[16..prg_end], 0x2000);
    fill_banks(&mut rom[prg_end..], 0x0400);
    set_vectors_in_prg(&mut rom[16..prg_end], 0x8000, 0x8000, 0x8000);
    rom
}

fn fill_banks(buf: &mut [u8], bank_size: usize) {
    for (i, chunk) in buf.chunks_mut(bank_size).enumerate() {
        chunk.fill(i as u8);
    }
}

/// Cartridge memory with PRG filled with 0xAA and CHR with 0xCC
/// (or 8 KiB of zeroed CHR RAM when `chr_8k` is 0) and 8 KiB work RAM.
pub fn memory_with(prg_16k: usize, chr_8k: usize) -> CartridgeMemory {
    CartridgeMemory {
        prg_rom: vec![0xAA; prg_16k * 16 * 1024],
        chr: if chr_8k == 0 {
            vec![0; 8 * 1024]
        } else {
            vec![0xCC; chr_8k * 8 * 1024]
        },
        chr_is_ram: chr_8k == 0,
        prg_ram: vec![0; 8 * 1024],
        prg_nvram: Vec::new(),
    }
}

/// Like `memory_with`, but every PRG byte holds its 8 KiB bank number and
/// every CHR byte its 1 KiB bank number.
pub fn banked_memory(prg_16k: usize, chr_8k: usize) -> CartridgeMemory {
    let mut mem = memory_with(prg_16k, chr_8k);
    fill_banks(&mut mem.prg_rom, 0x2000);
    if !mem.chr_is_ram {
        fill_banks(&mut mem.chr, 0x0400);
    }
    mem
}

/// Build a simple NROM image that places `prg` at $8000 of a single 16 KiB
/// bank and sets vectors (RESET/NMI/IRQ default to $8000).
pub fn build_nrom_with_prg(
    prg: &[u8],
    chr_8k: usize,
    prg_ram_8k: u8,
    vectors: Option<(u16, u16, u16)>,
) -> Vec<u8> {
    assert!(
        prg.len() <= 16 * 1024 - 6,
        "Program must fit within a 16 KiB PRG bank"
    );

    let mut rom = build_ines(1, chr_8k, 0, 0, prg_ram_8k, None);
    let prg_start = 16;
    let prg_end = prg_start + 16 * 1024;
    rom[prg_start..prg_end].fill(0xEA);
    rom[prg_start..(prg_start + prg.len())].copy_from_slice(prg);

    let (reset, nmi, irq) = vectors.unwrap_or((0x8000, 0x8000, 0x8000));
    set_vectors_in_prg(&mut rom[prg_start..prg_end], reset, nmi, irq);
    rom
}

/// Write CPU vectors (NMI, RESET, IRQ/BRK) into the last 6 bytes of a PRG slice.
pub fn set_vectors_in_prg(prg: &mut [u8], reset: u16, nmi: u16, irq: u16) {
    let base = prg.len() - 6;
    write_le_u16(prg, base, nmi);
    write_le_u16(prg, base + 2, reset);
    write_le_u16(prg, base + 4, irq);
}

#[inline]
fn write_le_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset] = (value & 0x00FF) as u8;
    buf[offset + 1] = (value >> 8) as u8;
}

/// One recorded bus transaction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read(u16),
    Write(u16, u8),
}

/// Flat 64 KiB CPU address space that logs every access.
pub struct FlatBus {
    pub mem: Vec<u8>,
    pub log: Vec<Access>,
}

impl FlatBus {
    /// RAM with `program` at `origin` and the RESET/NMI/IRQ vectors pointing at it.
    pub fn with_program(origin: u16, program: &[u8]) -> Self {
        let mut mem = vec![0u8; 0x10000];
        let start = origin as usize;
        mem[start..start + program.len()].copy_from_slice(program);
        for v in [0xFFFA, 0xFFFC, 0xFFFE] {
            write_le_u16(&mut mem, v, origin);
        }
        Self {
            mem,
            log: Vec::new(),
        }
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(addr, v) => Some((addr, v)),
                Access::Read(_) => None,
            })
            .collect()
    }
}

impl IoBus for FlatBus {
    fn cpu_read(&mut self, addr: u16) -> u8 {
        self.log.push(Access::Read(addr));
        self.mem[addr as usize]
    }

    fn cpu_write(&mut self, addr: u16, value: u8) {
        self.log.push(Access::Write(addr, value));
        self.mem[addr as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_basic_ines() {
        let rom = build_ines(2, 1, 0x01, 0x00, 1, None);
        assert_eq!(&rom[0..4], b"NES\x1A");
        assert_eq!(rom[4], 2);
        assert_eq!(rom[5], 1);
        assert_eq!(rom[6], 0x01);
        assert_eq!(rom[8], 1);
        assert_eq!(rom.len(), 16 + 2 * 16 * 1024 + 8 * 1024);
    }

    #[test]
    fn writes_vectors_at_end_of_prg() {
        let mut prg = vec![0u8; 32 * 1024];
        set_vectors_in_prg(&mut prg, 0x8123, 0x8456, 0x8ABC);
        assert_eq!(prg[0x7FFA], 0x56);
        assert_eq!(prg[0x7FFB], 0x84);
        assert_eq!(prg[0x7FFC], 0x23);
        assert_eq!(prg[0x7FFD], 0x81);
        assert_eq!(prg[0x7FFE], 0xBC);
        assert_eq!(prg[0x7FFF], 0x8A);
    }

    #[test]
    fn mapper_rom_tags_banks() {
        let rom = build_mapper_rom(4, 4, 1, 0);
        assert_eq!(rom[6] >> 4, 4);
        // Third 8 KiB PRG bank is filled with 2.
        assert_eq!(rom[16 + 2 * 0x2000 + 5], 2);
        // CHR 1 KiB bank 3 is filled with 3.
        assert_eq!(rom[16 + 4 * 0x4000 + 3 * 0x400], 3);
    }
}
