#![doc = r#"
PPU (2C02) module

Purpose
- Dot-accurate picture processing unit.

Timing
- 341 dots per scanline, 262 scanlines per frame (NTSC).
- Scanlines 0-239 are visible, 240 is idle, 241-260 are vertical blank and
  261 is the pre-render line.
- On odd frames with rendering enabled the last dot of the pre-render line
  is skipped.

Structure
- `registers.rs`: PPUCTRL/PPUMASK/PPUSTATUS bitflags and the loopy `VramAddr`
- `ports.rs`: CPU-visible ports ($2000-$2007), write toggle, read buffer, open bus
- `memory.rs`: nametable RAM with mirroring, palette RAM with its aliases
- `fetch.rs`: background fetch pipeline and shift registers
- `oam_eval.rs`: secondary OAM clear and sprite evaluation (overflow bug included)
- `sprite.rs`: sprite pattern fetch into the 8-entry line buffer, sprite pixels
- `renderer.rs`: `tick`: per-dot orchestration, pixel multiplexing, vblank/NMI
- `palette.rs`: master palette to ARGB

All bus traffic (pattern fetches, NMI) goes through an `IoBus`, so the
cartridge sees every PPU address the hardware would put on the bus.
"#]

use crate::archive::{Archive, ArchiveError, SaveState};
use crate::bus::IoBus;
use crate::cartridge::Mirroring;

pub mod palette;
pub mod registers;

pub(crate) mod fetch;
pub(crate) mod memory;
pub(crate) mod oam_eval;
pub(crate) mod ports;
pub(crate) mod renderer;
pub(crate) mod sprite;

pub use registers::{PpuCtrl, PpuMask, PpuStatus, VramAddr};

use memory::PpuMemory;
use sprite::SpriteSlot;

/// Screen width in pixels.
pub const NES_WIDTH: usize = 256;
/// Screen height in pixels.
pub const NES_HEIGHT: usize = 240;
pub const DOTS_PER_SCANLINE: u16 = 341;
pub const SCANLINES_PER_FRAME: u16 = 262;
pub const VBLANK_SCANLINE: u16 = 241;
pub const PRE_RENDER_SCANLINE: u16 = 261;

#[derive(Clone)]
pub struct Ppu {
    // CPU-visible registers
    ctrl: PpuCtrl,
    mask: PpuMask,
    status: PpuStatus,
    oam_addr: u8,

    // Loopy scroll registers
    v: VramAddr,
    t: VramAddr,
    fine_x: u8,
    w: bool,

    read_buffer: u8,
    open_bus: u8,

    mem: PpuMemory,
    oam: [u8; 256],
    secondary_oam: [u8; 32],

    // Sprite evaluation state (n = sprite index, m = byte index)
    eval_n: u8,
    eval_m: u8,
    eval_found: u8,
    eval_done: bool,
    sprite_zero_next: bool,

    // Line buffer for the scanline being drawn
    sprites: [SpriteSlot; 8],
    sprite_count: u8,
    sprite_zero_on_line: bool,

    // Background pipeline
    bg_shift_lo: u16,
    bg_shift_hi: u16,
    attr_shift_lo: u16,
    attr_shift_hi: u16,
    next_tile: u8,
    next_attr: u8,
    next_lo: u8,
    next_hi: u8,

    // Timing
    scanline: u16,
    dot: u16,
    frame: u64,
    odd_frame: bool,
    frame_complete: bool,
    suppress_vblank: bool,

    video: Option<Vec<u32>>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr: 0,
            v: VramAddr::default(),
            t: VramAddr::default(),
            fine_x: 0,
            w: false,
            read_buffer: 0,
            open_bus: 0,
            mem: PpuMemory::new(),
            oam: [0; 256],
            secondary_oam: [0xFF; 32],
            eval_n: 0,
            eval_m: 0,
            eval_found: 0,
            eval_done: false,
            sprite_zero_next: false,
            sprites: [SpriteSlot::default(); 8],
            sprite_count: 0,
            sprite_zero_on_line: false,
            bg_shift_lo: 0,
            bg_shift_hi: 0,
            attr_shift_lo: 0,
            attr_shift_hi: 0,
            next_tile: 0,
            next_attr: 0,
            next_lo: 0,
            next_hi: 0,
            scanline: 0,
            dot: 0,
            frame: 0,
            odd_frame: false,
            frame_complete: false,
            suppress_vblank: false,
            video: None,
        }
    }

    /// Reset line: PPUCTRL/PPUMASK, the write toggle and the read buffer are
    /// cleared. VRAM, OAM and palette survive; timing restarts at the top of
    /// the frame.
    pub fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.w = false;
        self.fine_x = 0;
        self.t = VramAddr::default();
        self.read_buffer = 0;
        self.scanline = 0;
        self.dot = 0;
        self.odd_frame = false;
        self.frame_complete = false;
        self.suppress_vblank = false;
        self.sprite_count = 0;
    }

    // ---------------------------------------------------------------------
    // Host-facing accessors
    // ---------------------------------------------------------------------

    pub fn set_mirror_mode(&mut self, mirroring: Mirroring) {
        self.mem.mirroring = mirroring;
    }

    pub fn mirror_mode(&self) -> Mirroring {
        self.mem.mirroring
    }

    /// Hand the PPU a host buffer of ARGB pixels, 256 per row. Rows beyond
    /// the buffer's length are not drawn.
    pub fn attach_video_output(&mut self, buffer: Vec<u32>) {
        self.video = Some(buffer);
    }

    pub fn detach_video_output(&mut self) -> Option<Vec<u32>> {
        self.video.take()
    }

    pub fn video_output(&self) -> Option<&[u32]> {
        self.video.as_deref()
    }

    /// True once per frame, from the start of vblank until `take_frame_complete`.
    pub fn frame_complete(&self) -> bool {
        self.frame_complete
    }

    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.dot
    }

    pub fn ctrl(&self) -> PpuCtrl {
        self.ctrl
    }

    pub fn mask(&self) -> PpuMask {
        self.mask
    }

    pub fn status(&self) -> PpuStatus {
        self.status
    }

    pub fn vram_addr(&self) -> VramAddr {
        self.v
    }

    pub fn temp_addr(&self) -> VramAddr {
        self.t
    }

    pub fn fine_x(&self) -> u8 {
        self.fine_x
    }

    pub fn oam(&self) -> &[u8; 256] {
        &self.oam
    }

    pub fn secondary_oam(&self) -> &[u8; 32] {
        &self.secondary_oam
    }

    /// OAM write as performed by OAM DMA through $2004.
    pub fn write_oam_data(&mut self, value: u8) {
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }

    #[inline]
    pub(crate) fn rendering_enabled(&self) -> bool {
        self.mask
            .intersects(PpuMask::SHOW_BACKGROUND | PpuMask::SHOW_SPRITES)
    }

    #[inline]
    pub(crate) fn on_render_line(&self) -> bool {
        self.scanline < 240 || self.scanline == PRE_RENDER_SCANLINE
    }

    #[inline]
    fn sprite_height(&self) -> u8 {
        if self.ctrl.contains(PpuCtrl::SPRITE_SIZE_16) {
            16
        } else {
            8
        }
    }

    /// Read through the PPU address space ($0000-$3FFF).
    pub(crate) fn mem_read<B: IoBus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u8 {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => bus.ppu_read(addr),
            0x2000..=0x3EFF => self.mem.read_nametable(addr),
            _ => self.mem.read_palette(addr),
        }
    }

    pub(crate) fn mem_write<B: IoBus + ?Sized>(&mut self, bus: &mut B, addr: u16, value: u8) {
        let addr = addr & 0x3FFF;
        match addr {
            0x0000..=0x1FFF => bus.ppu_write(addr, value),
            0x2000..=0x3EFF => self.mem.write_nametable(addr, value),
            _ => self.mem.write_palette(addr, value),
        }
    }
}

impl SaveState for Ppu {
    fn save_state(&self, ar: &mut Archive) {
        ar.write_u8(self.ctrl.bits());
        ar.write_u8(self.mask.bits());
        ar.write_u8(self.status.bits());
        ar.write_u8(self.oam_addr);
        ar.write_u16(self.v.raw());
        ar.write_u16(self.t.raw());
        ar.write_u8(self.fine_x);
        ar.write_bool(self.w);
        ar.write_u8(self.read_buffer);
        ar.write_u8(self.open_bus);
        self.mem.save_state(ar);
        ar.write_bytes(&self.oam);
        ar.write_bytes(&self.secondary_oam);
        ar.write_u8(self.eval_n);
        ar.write_u8(self.eval_m);
        ar.write_u8(self.eval_found);
        ar.write_bool(self.eval_done);
        ar.write_bool(self.sprite_zero_next);
        for slot in &self.sprites {
            slot.save_state(ar);
        }
        ar.write_u8(self.sprite_count);
        ar.write_bool(self.sprite_zero_on_line);
        ar.write_u16(self.bg_shift_lo);
        ar.write_u16(self.bg_shift_hi);
        ar.write_u16(self.attr_shift_lo);
        ar.write_u16(self.attr_shift_hi);
        ar.write_u8(self.next_tile);
        ar.write_u8(self.next_attr);
        ar.write_u8(self.next_lo);
        ar.write_u8(self.next_hi);
        ar.write_u16(self.scanline);
        ar.write_u16(self.dot);
        ar.write_u64(self.frame);
        ar.write_bool(self.odd_frame);
        ar.write_bool(self.frame_complete);
        ar.write_bool(self.suppress_vblank);
    }

    fn load_state(&mut self, ar: &mut Archive) -> Result<(), ArchiveError> {
        self.ctrl = PpuCtrl::from_bits_retain(ar.read_u8()?);
        self.mask = PpuMask::from_bits_retain(ar.read_u8()?);
        self.status = PpuStatus::from_bits_retain(ar.read_u8()?);
        self.oam_addr = ar.read_u8()?;
        self.v = VramAddr::new(ar.read_u16()?);
        self.t = VramAddr::new(ar.read_u16()?);
        self.fine_x = ar.read_u8()? & 0x07;
        self.w = ar.read_bool()?;
        self.read_buffer = ar.read_u8()?;
        self.open_bus = ar.read_u8()?;
        self.mem.load_state(ar)?;
        ar.read_into(&mut self.oam)?;
        ar.read_into(&mut self.secondary_oam)?;
        self.eval_n = ar.read_u8()?;
        self.eval_m = ar.read_u8()?;
        self.eval_found = ar.read_u8()?;
        self.eval_done = ar.read_bool()?;
        self.sprite_zero_next = ar.read_bool()?;
        for slot in &mut self.sprites {
            slot.load_state(ar)?;
        }
        self.sprite_count = ar.read_u8()?.min(8);
        self.sprite_zero_on_line = ar.read_bool()?;
        self.bg_shift_lo = ar.read_u16()?;
        self.bg_shift_hi = ar.read_u16()?;
        self.attr_shift_lo = ar.read_u16()?;
        self.attr_shift_hi = ar.read_u16()?;
        self.next_tile = ar.read_u8()?;
        self.next_attr = ar.read_u8()?;
        self.next_lo = ar.read_u8()?;
        self.next_hi = ar.read_u8()?;
        self.scanline = ar.read_u16()? % SCANLINES_PER_FRAME;
        self.dot = ar.read_u16()? % DOTS_PER_SCANLINE;
        self.frame = ar.read_u64()?;
        self.odd_frame = ar.read_bool()?;
        self.frame_complete = ar.read_bool()?;
        self.suppress_vblank = ar.read_bool()?;
        Ok(())
    }
}
