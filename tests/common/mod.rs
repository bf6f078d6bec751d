#![allow(dead_code)]

use flashfat::dummy::{DummyConfig, DummyFlash};
use flashfat::{FatConfig, FlashFat};

/// Device size used by most tests
pub const SIZE: u32 = 64 * 1024;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn dummy(size: u32) -> DummyFlash {
    DummyFlash::new(DummyConfig {
        size: size as usize,
        busy_polls: 1,
    })
}

/// Fresh store on an erased 64 KiB dummy
pub fn fresh() -> FlashFat<DummyFlash> {
    init_logging();
    FlashFat::begin(dummy(SIZE), FatConfig::new(SIZE)).unwrap()
}

/// Deterministic payload
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Write one complete file
pub fn write_file(fat: &mut FlashFat<DummyFlash>, data: &[u8]) {
    fat.new_file().unwrap();
    fat.write(data).unwrap();
    fat.close_file().unwrap();
}

/// Read a whole file back
pub fn read_file(fat: &mut FlashFat<DummyFlash>, index: usize) -> Vec<u8> {
    fat.open_file(index).unwrap();
    let mut out = Vec::new();
    let mut buf = [0u8; 100];
    loop {
        let n = fat.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    fat.close_file().unwrap();
    out
}
