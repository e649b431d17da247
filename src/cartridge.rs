/*!
Cartridge with iNES loader and Mapper integration.

Features:
- Parse iNES (v1) and NES 2.0 headers from bytes or a file path
- Extract PRG ROM, CHR (ROM, or 8 KiB CHR RAM when the header declares none)
- Allocate PRG RAM as volatile work RAM or battery-backed save RAM
- Determine header mirroring and mapper ID, then build the mapper through
  `mapper::create_mapper`

Notes:
- A 512-byte trainer (flags6 bit 2) is rejected; the cartridge is not created.
- NES 2.0 headers contribute mapper bits 8..11 (byte 8); every other NES 2.0
  extension is ignored.
- iNES v1 images with junk in bytes 12..15 (old dumping tools) have the
  flags7 mapper nibble ignored.
- PRG RAM allocation policy:
  - If header byte 8 (PRG RAM size in 8 KiB units) is 0, allocate 8 KiB by convention.
  - Otherwise allocate size_in_units * 8 KiB.
- A four-screen header overrides whatever mirroring the mapper selects.
*/

use std::fmt;
use std::fs;
use std::path::Path;

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::bus::IoBus;
use crate::mapper::{self, Mapper};

const INES_MAGIC: &[u8; 4] = b"NES\x1A";
const HEADER_LEN: usize = 16;
const PRG_UNIT: usize = 16 * 1024;
const CHR_UNIT: usize = 8 * 1024;
const PRG_RAM_UNIT: usize = 8 * 1024;

/// Nametable arrangement seen by the PPU.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
    FourScreen,
}

impl Mirroring {
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Mirroring::Horizontal => 0,
            Mirroring::Vertical => 1,
            Mirroring::SingleScreenLower => 2,
            Mirroring::SingleScreenUpper => 3,
            Mirroring::FourScreen => 4,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => Mirroring::Vertical,
            2 => Mirroring::SingleScreenLower,
            3 => Mirroring::SingleScreenUpper,
            4 => Mirroring::FourScreen,
            _ => Mirroring::Horizontal,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InesVersion {
    Ines1,
    Ines2,
}

/// Reasons a ROM image cannot become a cartridge.
#[derive(Debug)]
pub enum CartridgeError {
    TooShort,
    BadMagic,
    TrainerUnsupported,
    UnsupportedMapper(u16),
    TruncatedPrg { expected: usize, found: usize },
    TruncatedChr { expected: usize, found: usize },
    EmptyPrg,
    Io(std::io::Error),
}

impl fmt::Display for CartridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartridgeError::TooShort => write!(f, "data too small for iNES header"),
            CartridgeError::BadMagic => write!(f, "invalid iNES header magic (expected NES<1A>)"),
            CartridgeError::TrainerUnsupported => write!(f, "512-byte trainer is not supported"),
            CartridgeError::UnsupportedMapper(id) => write!(f, "unsupported mapper id: {id}"),
            CartridgeError::TruncatedPrg { expected, found } => {
                write!(f, "PRG ROM truncated: expected {expected} bytes, found {found}")
            }
            CartridgeError::TruncatedChr { expected, found } => {
                write!(f, "CHR ROM truncated: expected {expected} bytes, found {found}")
            }
            CartridgeError::EmptyPrg => write!(f, "header declares no PRG ROM"),
            CartridgeError::Io(e) => write!(f, "failed to read ROM file: {e}"),
        }
    }
}

impl std::error::Error for CartridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CartridgeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CartridgeError {
    fn from(e: std::io::Error) -> Self {
        CartridgeError::Io(e)
    }
}

/// Parsed 16-byte header.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InesHeader {
    pub version: InesVersion,
    pub mapper_id: u16,
    pub prg_rom_len: usize,
    pub chr_rom_len: usize,
    pub prg_ram_len: usize,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
}

impl InesHeader {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_LEN {
            return Err(CartridgeError::TooShort);
        }
        if &data[0..4] != INES_MAGIC {
            return Err(CartridgeError::BadMagic);
        }
        let flags6 = data[6];
        let flags7 = data[7];
        let version = if (flags7 & 0x0C) == 0x08 {
            InesVersion::Ines2
        } else {
            InesVersion::Ines1
        };

        let mut mapper_id = (flags6 >> 4) as u16;
        match version {
            InesVersion::Ines2 => {
                mapper_id |= (flags7 & 0xF0) as u16;
                mapper_id |= ((data[8] & 0x0F) as u16) << 8;
            }
            InesVersion::Ines1 => {
                if data[12..16].iter().all(|&b| b == 0) {
                    mapper_id |= (flags7 & 0xF0) as u16;
                }
            }
        }

        let mirroring = if flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let prg_ram_units = match version {
            InesVersion::Ines1 => data[8] as usize,
            InesVersion::Ines2 => 0,
        };
        let prg_ram_len = if prg_ram_units == 0 {
            PRG_RAM_UNIT
        } else {
            prg_ram_units * PRG_RAM_UNIT
        };

        Ok(Self {
            version,
            mapper_id,
            prg_rom_len: data[4] as usize * PRG_UNIT,
            chr_rom_len: data[5] as usize * CHR_UNIT,
            prg_ram_len,
            mirroring,
            battery: flags6 & 0x02 != 0,
            trainer: flags6 & 0x04 != 0,
        })
    }
}

/// ROM and RAM images owned by a cartridge. Mappers hold bank offsets into
/// these buffers, never references.
#[derive(Clone, Debug, Default)]
pub struct CartridgeMemory {
    pub prg_rom: Vec<u8>,
    pub chr: Vec<u8>,
    pub chr_is_ram: bool,
    /// Volatile work RAM at $6000..=$7FFF.
    pub prg_ram: Vec<u8>,
    /// Battery-backed save RAM at $6000..=$7FFF.
    pub prg_nvram: Vec<u8>,
}

impl CartridgeMemory {
    /// Whichever PRG RAM the board carries (save RAM takes precedence).
    #[inline]
    pub fn work_ram(&self) -> &[u8] {
        if self.prg_nvram.is_empty() {
            &self.prg_ram
        } else {
            &self.prg_nvram
        }
    }

    #[inline]
    pub fn work_ram_mut(&mut self) -> &mut [u8] {
        if self.prg_nvram.is_empty() {
            &mut self.prg_ram
        } else {
            &mut self.prg_nvram
        }
    }

    /// Read PRG RAM at `offset`, wrapping within its size. `None` if absent.
    #[inline]
    pub fn read_work_ram(&self, offset: usize) -> Option<u8> {
        let ram = self.work_ram();
        if ram.is_empty() {
            None
        } else {
            Some(ram[offset % ram.len()])
        }
    }

    #[inline]
    pub fn write_work_ram(&mut self, offset: usize, value: u8) {
        let ram = self.work_ram_mut();
        if !ram.is_empty() {
            let idx = offset % ram.len();
            ram[idx] = value;
        }
    }

    #[inline]
    pub fn read_prg(&self, offset: usize) -> u8 {
        mapper::wrapped_read(&self.prg_rom, offset)
    }

    #[inline]
    pub fn read_chr(&self, offset: usize) -> u8 {
        mapper::wrapped_read(&self.chr, offset)
    }

    #[inline]
    pub fn write_chr(&mut self, offset: usize, value: u8) {
        if self.chr_is_ram && !self.chr.is_empty() {
            let idx = offset % self.chr.len();
            self.chr[idx] = value;
        }
    }
}

pub struct Cartridge {
    mem: CartridgeMemory,
    mapper: Box<dyn Mapper>,
    header: InesHeader,
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cartridge")
            .field("mapper_id", &self.header.mapper_id)
            .field("version", &self.header.version)
            .field("mirroring", &self.mirroring())
            .field("battery", &self.header.battery)
            .field("prg_rom_len", &self.mem.prg_rom.len())
            .field("chr_len", &self.mem.chr.len())
            .field("chr_is_ram", &self.mem.chr_is_ram)
            .finish()
    }
}

impl Cartridge {
    /// Parse an iNES image and construct its mapper.
    pub fn from_ines_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let header = InesHeader::parse(data)?;
        if header.trainer {
            return Err(CartridgeError::TrainerUnsupported);
        }
        if header.prg_rom_len == 0 {
            return Err(CartridgeError::EmptyPrg);
        }

        let mut offset = HEADER_LEN;
        let found = data.len() - offset;
        if found < header.prg_rom_len {
            return Err(CartridgeError::TruncatedPrg {
                expected: header.prg_rom_len,
                found,
            });
        }
        let prg_rom = data[offset..offset + header.prg_rom_len].to_vec();
        offset += header.prg_rom_len;

        let (chr, chr_is_ram) = if header.chr_rom_len == 0 {
            (vec![0; CHR_UNIT], true)
        } else {
            let found = data.len() - offset;
            if found < header.chr_rom_len {
                return Err(CartridgeError::TruncatedChr {
                    expected: header.chr_rom_len,
                    found,
                });
            }
            (data[offset..offset + header.chr_rom_len].to_vec(), false)
        };

        let (prg_ram, prg_nvram) = if header.battery {
            (Vec::new(), vec![0; header.prg_ram_len])
        } else {
            (vec![0; header.prg_ram_len], Vec::new())
        };

        let mem = CartridgeMemory {
            prg_rom,
            chr,
            chr_is_ram,
            prg_ram,
            prg_nvram,
        };

        let mut mapper = mapper::create_mapper(header.mapper_id)
            .ok_or(CartridgeError::UnsupportedMapper(header.mapper_id))?;
        mapper.initialise(&mem);

        log::info!(
            "cartridge: mapper {} ({}), PRG {} KiB, CHR {} KiB{}, {:?} mirroring{}",
            header.mapper_id,
            mapper::mapper_name(header.mapper_id),
            mem.prg_rom.len() / 1024,
            mem.chr.len() / 1024,
            if chr_is_ram { " RAM" } else { "" },
            header.mirroring,
            if header.battery { ", battery" } else { "" },
        );

        Ok(Self {
            mem,
            mapper,
            header,
        })
    }

    /// Load a cartridge from an iNES file (.nes).
    pub fn from_ines_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let bytes = fs::read(path)?;
        Self::from_ines_bytes(&bytes)
    }

    /// CPU read in cartridge space. `None` when the board leaves the bus floating.
    #[inline]
    pub fn try_cpu_read(&mut self, addr: u16) -> Option<u8> {
        self.mapper.cpu_read(&self.mem, addr)
    }

    /// Side-effect-free PRG view for debuggers and tracing.
    pub fn peek(&self, addr: u16) -> Option<u8> {
        self.mapper.peek(&self.mem, addr)
    }

    /// Return the mapper to its power-on bank layout.
    pub fn reset(&mut self) {
        self.mapper.initialise(&self.mem);
    }

    /// Advance mapper timers by one CPU cycle.
    #[inline]
    pub fn cpu_tick(&mut self) {
        self.mapper.cpu_tick();
    }

    #[inline]
    pub fn irq_asserted(&self) -> bool {
        self.mapper.irq_asserted()
    }

    /// Current nametable arrangement. A four-screen header wins over the mapper.
    pub fn mirroring(&self) -> Mirroring {
        if self.header.mirroring == Mirroring::FourScreen {
            return Mirroring::FourScreen;
        }
        self.mapper.mirroring().unwrap_or(self.header.mirroring)
    }

    pub fn header(&self) -> &InesHeader {
        &self.header
    }

    pub fn mapper_id(&self) -> u16 {
        self.header.mapper_id
    }

    pub fn battery_backed(&self) -> bool {
        self.header.battery
    }

    pub fn prg_rom_len(&self) -> usize {
        self.mem.prg_rom.len()
    }

    pub fn chr_len(&self) -> usize {
        self.mem.chr.len()
    }

    pub fn chr_is_ram(&self) -> bool {
        self.mem.chr_is_ram
    }

    pub fn prg_ram_len(&self) -> usize {
        self.mem.work_ram().len()
    }

    /// Battery-backed RAM contents for the host to persist. Empty without a battery.
    pub fn battery_ram(&self) -> &[u8] {
        &self.mem.prg_nvram
    }

    /// Restore battery-backed RAM. Extra bytes are dropped, missing bytes keep
    /// their current value.
    pub fn load_battery_ram(&mut self, data: &[u8]) {
        let n = data.len().min(self.mem.prg_nvram.len());
        self.mem.prg_nvram[..n].copy_from_slice(&data[..n]);
    }

    #[cfg(test)]
    pub(crate) fn memory(&self) -> &CartridgeMemory {
        &self.mem
    }
}

impl IoBus for Cartridge {
    #[inline]
    fn cpu_read(&mut self, addr: u16) -> u8 {
        self.try_cpu_read(addr).unwrap_or(0)
    }

    #[inline]
    fn cpu_write(&mut self, addr: u16, value: u8) {
        self.mapper.cpu_write(&mut self.mem, addr, value);
    }

    #[inline]
    fn ppu_read(&mut self, addr: u16) -> u8 {
        self.mapper.ppu_read(&self.mem, addr & 0x1FFF)
    }

    #[inline]
    fn ppu_write(&mut self, addr: u16, value: u8) {
        self.mapper.ppu_write(&mut self.mem, addr & 0x1FFF, value);
    }
}

impl SaveState for Cartridge {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_u16(self.header.mapper_id);
        ar.write_blob(&self.mem.prg_ram);
        ar.write_blob(&self.mem.prg_nvram);
        if self.mem.chr_is_ram {
            ar.write_blob(&self.mem.chr);
        }
        self.mapper.save_state(ar);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        let saved = ar.read_u16()?;
        if saved != self.header.mapper_id {
            return Err(ArchiveError::MapperMismatch {
                saved,
                inserted: self.header.mapper_id,
            });
        }
        ar.read_blob_into(&mut self.mem.prg_ram)?;
        ar.read_blob_into(&mut self.mem.prg_nvram)?;
        if self.mem.chr_is_ram {
            ar.read_blob_into(&mut self.mem.chr)?;
        }
        self.mapper.load_state(ar)
    }
}
