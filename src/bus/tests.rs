use super::*;
use crate::controller::Button;
use crate::ppu::PpuStatus;
use crate::test_utils::{build_ines, build_mapper_rom, build_nrom_with_prg};

fn bus_with(rom: &[u8]) -> Bus {
    let mut bus = Bus::new();
    let cart = Cartridge::from_ines_bytes(rom).expect("valid test rom");
    assert!(bus.insert_cartridge(cart).is_none());
    bus
}

#[test]
fn ram_is_mirrored_every_2k() {
    let mut bus = Bus::new();
    bus.cpu_write(0x0001, 0x42);
    assert_eq!(bus.cpu_read(0x0801), 0x42);
    assert_eq!(bus.cpu_read(0x1801), 0x42);
    bus.cpu_write(0x1FFF, 0x17);
    assert_eq!(bus.cpu_read(0x07FF), 0x17);
}

#[test]
fn ppu_ports_are_mirrored_through_3fff() {
    let mut bus = Bus::new();
    bus.cpu_write(0x2006, 0x21);
    bus.cpu_write(0x3FFE, 0x00);
    bus.cpu_write(0x200F, 0x55);
    assert_eq!(bus.ppu_read(0x2100), 0x55);
    assert_eq!(bus.ppu().vram_addr().raw(), 0x2101);
}

#[test]
fn unmapped_reads_return_the_last_bus_value() {
    let mut bus = Bus::new();
    bus.cpu_write(0x0000, 0x5A);
    assert_eq!(bus.cpu_read(0x4018), 0x5A);
    assert_eq!(bus.cpu_read(0x8000), 0x5A);
    assert_eq!(bus.cpu_read(0x4000), 0x5A);
    assert_eq!(bus.peek(0x5000), 0x5A);
}

#[test]
fn controller_reads_shift_and_keep_open_bus_bits() {
    let mut bus = Bus::new();
    bus.controller_mut(0).set_button(Button::A, true);
    bus.controller_mut(0).set_button(Button::Start, true);
    bus.cpu_write(0x4016, 1);
    bus.cpu_write(0x4016, 0);

    let bits: Vec<u8> = (0..8).map(|_| bus.cpu_read(0x4016) & 1).collect();
    assert_eq!(bits, [1, 0, 0, 1, 0, 0, 0, 0]);
    assert_eq!(bus.cpu_read(0x4016) & 1, 1);
    assert_eq!(bus.cpu_read(0x4017) & 1, 0);

    bus.cpu_write(0x0000, 0xE0);
    let _ = bus.cpu_read(0x0000);
    assert_eq!(bus.cpu_read(0x4016) & 0xE0, 0xE0);
}

#[test]
fn peek_has_no_side_effects() {
    let mut bus = Bus::new();
    bus.controller_mut(0).set_button(Button::A, true);
    bus.cpu_write(0x4016, 1);
    bus.cpu_write(0x4016, 0);
    assert_eq!(bus.peek(0x4016) & 1, 1);
    assert_eq!(bus.peek(0x4016) & 1, 1);
    assert_eq!(bus.cpu_read(0x4016) & 1, 1);
    assert_eq!(bus.peek(0x4016) & 1, 0);
}

#[test]
fn oam_dma_copies_a_page_and_stalls_513_cycles() {
    let mut bus = Bus::new();
    for i in 0..256u16 {
        bus.cpu_write(0x0200 + i, i as u8);
    }
    assert_eq!(bus.cpu_cycle() & 1, 0);
    bus.cpu_write(0x4014, 0x02);
    assert!(bus.dma_active());

    let mut stalled = 0;
    while bus.dma_active() {
        assert!(bus.step_dma());
        bus.end_cpu_cycle();
        stalled += 1;
    }
    assert_eq!(stalled, 513);
    assert!(bus.ppu().oam().iter().enumerate().all(|(i, &b)| b == i as u8));
    assert!(!bus.step_dma());
}

#[test]
fn oam_dma_on_odd_cycle_takes_one_more() {
    let mut bus = Bus::new();
    bus.end_cpu_cycle();
    bus.cpu_write(0x4014, 0x03);
    let mut stalled = 0;
    while bus.step_dma() {
        bus.end_cpu_cycle();
        stalled += 1;
    }
    assert_eq!(stalled, 514);
}

#[test]
fn cartridge_answers_upper_space_and_sets_mirroring() {
    let rom = build_ines(1, 1, 0x01, 0, 1, None);
    let mut bus = bus_with(&rom);
    assert_eq!(bus.ppu().mirror_mode(), Mirroring::Vertical);
    assert_eq!(bus.cpu_read(0x8000), 0xAA);
    assert_eq!(bus.cpu_read(0xC000), 0xAA);
    assert_eq!(bus.peek(0xFFFF), 0xAA);
    assert_eq!(bus.ppu_read(0x0000), 0xCC);

    bus.cpu_write(0x6000, 0x99);
    assert_eq!(bus.cpu_read(0x6000), 0x99);

    assert!(bus.eject_cartridge().is_some());
    assert!(bus.cartridge().is_none());
}

#[test]
fn nrom_vectors_come_from_prg() {
    let rom = build_nrom_with_prg(&[0xEA], 1, 0, Some((0x8123, 0x8456, 0x8789)));
    let mut bus = bus_with(&rom);
    assert_eq!(bus.cpu_read(0xFFFC), 0x23);
    assert_eq!(bus.cpu_read(0xFFFD), 0x81);
    assert_eq!(bus.cpu_read(0xFFFA), 0x56);
    assert_eq!(bus.cpu_read(0xFFFE), 0x89);
}

#[test]
fn mapper_mirroring_changes_reach_the_ppu() {
    let rom = build_mapper_rom(7, 4, 0, 0);
    let mut bus = bus_with(&rom);
    assert_eq!(bus.ppu().mirror_mode(), Mirroring::SingleScreenLower);
    bus.cpu_write(0x8000, 0x10);
    assert_eq!(bus.ppu().mirror_mode(), Mirroring::SingleScreenUpper);
}

#[test]
fn ppu_nmi_is_latched_until_taken() {
    let mut bus = Bus::new();
    bus.cpu_write(0x2000, 0x80);
    for _ in 0..(241 * 341 + 2) {
        bus.tick_ppu();
    }
    assert!(bus.ppu().status().contains(PpuStatus::VBLANK));
    assert!(bus.take_nmi());
    assert!(!bus.take_nmi());
}

#[test]
fn apu_frame_irq_drives_the_irq_line() {
    let mut bus = Bus::new();
    for _ in 0..29830 {
        bus.end_cpu_cycle();
    }
    assert!(bus.irq_asserted());
    assert_eq!(bus.cpu_read(0x4015) & 0x40, 0x40);
    assert!(!bus.irq_asserted());
}

#[test]
fn reset_keeps_ram() {
    let mut bus = Bus::new();
    bus.cpu_write(0x0123, 0x77);
    bus.reset();
    assert_eq!(bus.cpu_read(0x0123), 0x77);
    bus.power_on();
    assert_eq!(bus.cpu_read(0x0123), 0x00);
}

#[test]
fn save_state_round_trip() {
    let mut bus = Bus::new();
    bus.cpu_write(0x0456, 0x31);
    bus.cpu_write(0x2006, 0x23);
    bus.cpu_write(0x2006, 0x45);
    for _ in 0..1000 {
        bus.tick_ppu();
    }
    bus.end_cpu_cycle();

    let mut ar = Archive::new();
    bus.save_state(&mut ar);
    let bytes = ar.into_bytes();

    let mut other = Bus::new();
    other
        .load_state(&mut Archive::from_bytes(&bytes))
        .expect("load");
    assert_eq!(other.peek(0x0456), 0x31);
    assert_eq!(other.ppu().vram_addr().raw(), 0x2345);
    assert_eq!(other.cpu_cycle(), 1);
    assert_eq!(
        (other.ppu().scanline(), other.ppu().dot()),
        (bus.ppu().scanline(), bus.ppu().dot())
    );
}
