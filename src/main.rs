use std::env;
use std::process::ExitCode;

use famicore::System;
use famicore::ppu::{NES_HEIGHT, NES_WIDTH};

/// Message the demo program copies into RAM at $0200.
const MESSAGE: &[u8] = b"famicore\0";

fn build_demo_ines() -> Vec<u8> {
    // iNES header: 1 x 16KB PRG, 1 x 8KB CHR, mapper 0, horizontal mirroring
    let mut rom = Vec::with_capacity(16 + 16 * 1024 + 8 * 1024);
    rom.extend_from_slice(b"NES\x1A");
    rom.extend_from_slice(&[1, 1, 0, 0, 1]);
    rom.extend_from_slice(&[0u8; 7]);

    let mut prg = vec![0xEAu8; 16 * 1024];
    let program: &[u8] = &[
        0xA2, 0x00, // LDX #$00
        0xBD, 0x00, 0x81, // LDA $8100,X
        0xF0, 0x06, // BEQ done
        0x9D, 0x00, 0x02, // STA $0200,X
        0xE8, // INX
        0xD0, 0xF5, // BNE loop
        0x4C, 0x0D, 0x80, // done: JMP done
    ];
    prg[..program.len()].copy_from_slice(program);
    prg[0x100..0x100 + MESSAGE.len()].copy_from_slice(MESSAGE);

    // NMI, RESET, IRQ/BRK vectors at the top of the bank (mirrored to $FFFA)
    for (i, vector) in [0x8000u16, 0x8000, 0x8000].into_iter().enumerate() {
        prg[0x3FFA + i * 2..0x3FFC + i * 2].copy_from_slice(&vector.to_le_bytes());
    }

    rom.extend_from_slice(&prg);
    rom.extend(std::iter::repeat_n(0u8, 8 * 1024));
    rom
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut system = System::new();

    let loaded = match args.get(1) {
        Some(path) => system.insert_cartridge_file(path),
        None => system.insert_cartridge(&build_demo_ines()),
    };
    if let Err(e) = loaded {
        eprintln!("failed to load cartridge: {e}");
        return ExitCode::FAILURE;
    }

    system
        .ppu_mut()
        .attach_video_output(vec![0; NES_WIDTH * NES_HEIGHT]);
    system.run_frame();

    let cpu = system.cpu();
    println!("Frame {} complete", system.ppu().frame_count());
    println!("PC: 0x{:04X}", cpu.pc());
    println!("A: 0x{:02X}", cpu.a());
    println!("X: 0x{:02X}", cpu.x());
    println!("Y: 0x{:02X}", cpu.y());
    println!("P: 0x{:02X}", cpu.status());
    println!("SP: 0x{:02X}", cpu.sp());
    println!("CPU cycles: {}", cpu.cycles());

    let text: Vec<u8> = (0..MESSAGE.len() as u16 - 1)
        .map(|i| system.bus().peek(0x0200 + i))
        .collect();
    println!("RAM $0200: {:?}", String::from_utf8_lossy(&text));

    #[cfg(feature = "screenshot")]
    if let Some(out) = args.get(2) {
        if let Err(e) = famicore::screenshot::save_png(system.ppu(), out) {
            eprintln!("screenshot failed: {e}");
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
