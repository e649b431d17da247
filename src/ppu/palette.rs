#![doc = r#"
Master palette

Purpose
- Maps a 6-bit NES color index to a 32-bit ARGB pixel.

Notes
- PPUMASK grayscale is applied before lookup (index & 0x30). Color emphasis
  bits are stored in PPUMASK but not applied to the output.
"#]

/// ARGB (0xAARRGGBB) for each of the 64 NES colors.
pub const NES_PALETTE_ARGB: [u32; 64] = [
    0xFF757575, 0xFF271B8F, 0xFF0000AB, 0xFF47009F,
    0xFF8F0077, 0xFFAB0013, 0xFFA70000, 0xFF7F0B00,
    0xFF432F00, 0xFF004700, 0xFF005100, 0xFF003F17,
    0xFF1B3F5F, 0xFF000000, 0xFF000000, 0xFF000000,
    0xFFBCBCBC, 0xFF0073EF, 0xFF233BEF, 0xFF8300F3,
    0xFFBF00BF, 0xFFE7005B, 0xFFDB2B00, 0xFFCB4F0F,
    0xFF8B7300, 0xFF009700, 0xFF00AB00, 0xFF00933B,
    0xFF00838B, 0xFF000000, 0xFF000000, 0xFF000000,
    0xFFFFFFFF, 0xFF3FBFFF, 0xFF5F97FF, 0xFFA78BFD,
    0xFFF77BFF, 0xFFFF77B7, 0xFFFF7763, 0xFFFF9B3B,
    0xFFF3BF3F, 0xFF83D313, 0xFF4FDF4B, 0xFF58F898,
    0xFF00EBDB, 0xFF000000, 0xFF000000, 0xFF000000,
    0xFFFFFFFF, 0xFFABE7FF, 0xFFC7D7FF, 0xFFD7CBFF,
    0xFFFFC7FF, 0xFFFFC7DB, 0xFFFFBFB3, 0xFFFFDBAB,
    0xFFFFE7A3, 0xFFE3FFA3, 0xFFABF3BF, 0xFFB3FFCF,
    0xFF9FFFF3, 0xFF000000, 0xFF000000, 0xFF000000,
];

#[inline]
pub fn argb(index: u8) -> u32 {
    NES_PALETTE_ARGB[(index & 0x3F) as usize]
}
