/*!
2 KiB CPU work RAM.

- $0000-$07FF: physical RAM
- $0800-$1FFF: mirrors (mask with & 0x07FF)
*/

use crate::archive::{Archive, ArchiveError, SaveState};

/// Size of CPU internal RAM (in bytes).
pub const CPU_RAM_SIZE: usize = 0x0800;

#[derive(Clone)]
pub struct Ram {
    data: [u8; CPU_RAM_SIZE],
}

impl Default for Ram {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Ram {
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0; CPU_RAM_SIZE],
        }
    }

    /// Power-on contents. Reset leaves RAM untouched.
    #[inline]
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.data[Self::mirror_index(addr)]
    }

    #[inline]
    pub fn write(&mut self, addr: u16, value: u8) {
        self.data[Self::mirror_index(addr)] = value;
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn mirror_index(addr: u16) -> usize {
        (addr as usize) & (CPU_RAM_SIZE - 1)
    }
}

impl SaveState for Ram {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_bytes(&self.data);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        ar.read_into(&mut self.data)
    }
}
