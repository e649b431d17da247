/*!
Archive: flat byte buffer used for save states.

Format:
- Positional, little-endian, no field tags. Every component writes its fields
  in a fixed order and reads them back in the same order.
- Booleans are stored as 0x00 / 0x01; any nonzero byte reads back as true.
- Variable-length byte blocks carry a u32 length prefix.

Behavior:
- The write cursor never truncates; the backing buffer doubles when a write
  would overflow it.
- Reads are bounded by the write cursor. Reading past it fails with
  `ArchiveError::UnexpectedEnd` instead of yielding zeros.
*/

use std::fmt;

/// Errors produced while restoring state from an [`Archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// A read needed more bytes than were written.
    UnexpectedEnd { needed: usize, remaining: usize },
    /// The stream does not start with the save-state tag.
    BadTag,
    /// The saved mapper differs from the inserted cartridge's mapper.
    MapperMismatch { saved: u16, inserted: u16 },
    /// The stream carries cartridge state but no cartridge is inserted (or vice versa).
    CartridgeMismatch,
    /// A fixed-size block was saved with a different length.
    LengthMismatch { saved: usize, expected: usize },
}

impl fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveError::UnexpectedEnd { needed, remaining } => write!(
                f,
                "save state truncated: needed {needed} bytes, {remaining} remaining"
            ),
            ArchiveError::BadTag => write!(f, "not a save state (bad tag)"),
            ArchiveError::MapperMismatch { saved, inserted } => write!(
                f,
                "save state is for mapper {saved}, inserted cartridge uses mapper {inserted}"
            ),
            ArchiveError::CartridgeMismatch => {
                write!(f, "save state cartridge presence does not match the system")
            }
            ArchiveError::LengthMismatch { saved, expected } => write!(
                f,
                "save state block has {saved} bytes, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for ArchiveError {}

const INITIAL_CAPACITY: usize = 64;

/// Growable byte buffer with independent read and write cursors.
#[derive(Debug, Clone, Default)]
pub struct Archive {
    buf: Vec<u8>,
    write_pos: usize,
    read_pos: usize,
}

impl Archive {
    /// Empty archive ready for writing.
    pub fn new() -> Self {
        Self {
            buf: vec![0; INITIAL_CAPACITY],
            write_pos: 0,
            read_pos: 0,
        }
    }

    /// Archive positioned for reading `data` from the start.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            buf: data.to_vec(),
            write_pos: data.len(),
            read_pos: 0,
        }
    }

    /// Bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.write_pos]
    }

    /// Consume the archive, returning exactly the written bytes.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.write_pos);
        self.buf
    }

    pub fn len(&self) -> usize {
        self.write_pos
    }

    pub fn is_empty(&self) -> bool {
        self.write_pos == 0
    }

    /// Bytes still available to the reader.
    pub fn remaining(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Current size of the backing buffer (grows by doubling).
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        let needed = self.write_pos + data.len();
        if needed > self.buf.len() {
            let mut new_len = self.buf.len().max(INITIAL_CAPACITY);
            while new_len < needed {
                new_len *= 2;
            }
            self.buf.resize(new_len, 0);
        }
        self.buf[self.write_pos..needed].copy_from_slice(data);
        self.write_pos = needed;
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write_bytes(&[v]);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.write_u8(v as u8);
    }

    /// Length-prefixed byte block.
    pub fn write_blob(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.write_bytes(data);
    }

    fn take(&mut self, n: usize) -> Result<&[u8], ArchiveError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(ArchiveError::UnexpectedEnd {
                needed: n,
                remaining,
            });
        }
        let start = self.read_pos;
        self.read_pos += n;
        Ok(&self.buf[start..start + n])
    }

    /// Fill `out` completely from the stream.
    pub fn read_into(&mut self, out: &mut [u8]) -> Result<(), ArchiveError> {
        let src = self.take(out.len())?;
        out.copy_from_slice(src);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, ArchiveError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, ArchiveError> {
        let mut b = [0u8; 2];
        self.read_into(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn read_u32(&mut self) -> Result<u32, ArchiveError> {
        let mut b = [0u8; 4];
        self.read_into(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    pub fn read_u64(&mut self) -> Result<u64, ArchiveError> {
        let mut b = [0u8; 8];
        self.read_into(&mut b)?;
        Ok(u64::from_le_bytes(b))
    }

    pub fn read_bool(&mut self) -> Result<bool, ArchiveError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_blob(&mut self) -> Result<Vec<u8>, ArchiveError> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    /// Read a length-prefixed block into a buffer whose size is fixed by the
    /// component (e.g. CHR RAM). The saved length must match.
    pub fn read_blob_into(&mut self, out: &mut [u8]) -> Result<(), ArchiveError> {
        let len = self.read_u32()? as usize;
        if len != out.len() {
            return Err(ArchiveError::LengthMismatch {
                saved: len,
                expected: out.len(),
            });
        }
        self.read_into(out)
    }
}

/// Component state that can be written to and restored from an [`Archive`].
///
/// `load_state` must consume exactly what `save_state` produced, in the same
/// order.
pub trait SaveState {
    fn save_state(&self, ar: &mut Archive);
    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError>;
}
