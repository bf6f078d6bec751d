//! Device failures surface as errors and leave the store consistent

mod common;

use common::{dummy, fresh, pattern, read_file, write_file, SIZE};
use flashfat::dummy::Faults;
use flashfat::{BusyTiming, DeviceFailure, Error, FatConfig, FlashFat, ModeKind};

fn fast_config() -> FatConfig {
    FatConfig::new(SIZE).with_timing(BusyTiming {
        erase_poll_us: 10,
        erase_timeout_us: 100,
        program_poll_us: 1,
        program_timeout_us: 10,
    })
}

#[test]
fn test_init_failure() {
    common::init_logging();
    let mut device = dummy(SIZE);
    device.set_faults(Faults::INIT);
    assert!(matches!(
        FlashFat::begin(device, fast_config()),
        Err(Error::Device(DeviceFailure::Init))
    ));
}

#[test]
fn test_stuck_busy_times_out() {
    common::init_logging();
    let mut device = dummy(SIZE);
    device.set_faults(Faults::STUCK_BUSY);
    assert!(matches!(
        FlashFat::begin(device, fast_config()),
        Err(Error::Device(DeviceFailure::BusyTimeout))
    ));
}

#[test]
fn test_table_read_failure() {
    common::init_logging();
    let mut device = dummy(SIZE);
    device.set_faults(Faults::READ);
    assert!(matches!(
        FlashFat::begin(device, fast_config()),
        Err(Error::Device(DeviceFailure::Read { addr: 0 }))
    ));
}

#[test]
fn test_config_larger_than_device() {
    common::init_logging();
    assert!(matches!(
        FlashFat::begin(dummy(SIZE), FatConfig::new(2 * SIZE)),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_erase_failure_in_new_file() {
    let mut fat = fresh();
    let table = fat.get_allocation_table().clone();

    fat.device_mut().set_faults(Faults::ERASE);
    assert_eq!(
        fat.new_file(),
        Err(Error::Device(DeviceFailure::Erase { addr: 4096 }))
    );
    assert_eq!(fat.mode(), ModeKind::Idle);
    assert_eq!(fat.get_allocation_table(), &table);

    fat.device_mut().set_faults(Faults::empty());
    write_file(&mut fat, b"recovered");
    assert_eq!(read_file(&mut fat, 0), b"recovered");
}

#[test]
fn test_failed_persist_keeps_cache() {
    let mut fat = fresh();
    write_file(&mut fat, b"keep");

    fat.device_mut().set_faults(Faults::WRITE_ENABLE);
    assert_eq!(
        fat.delete_all_files(),
        Err(Error::Device(DeviceFailure::WriteEnable))
    );
    assert_eq!(fat.file_count(), 1);
}

#[test]
fn test_program_failure_then_retry() {
    let mut fat = fresh();
    let payload = pattern(600, 11);

    fat.new_file().unwrap();
    fat.device_mut().set_faults(Faults::PROGRAM);

    // One buffer is accepted, programming it to make room fails
    assert_eq!(fat.write(&payload), Ok(512));
    assert_eq!(
        fat.write(&payload[512..]),
        Err(Error::Device(DeviceFailure::Program { addr: 4096 }))
    );
    assert_eq!(fat.written_len(), Some(512));

    fat.device_mut().set_faults(Faults::empty());
    assert_eq!(fat.write(&payload[512..]), Ok(88));
    fat.close_file().unwrap();

    assert_eq!(fat.file_len(0), Some(600));
    assert_eq!(read_file(&mut fat, 0), payload);
    assert_eq!(fat.device().stats().program_violations, 0);
}

#[test]
fn test_close_after_failed_table_erase() {
    let mut fat = fresh();
    let payload = pattern(700, 5);

    fat.new_file().unwrap();
    assert_eq!(fat.write(&payload), Ok(700));

    fat.device_mut().set_faults(Faults::ERASE);
    assert_eq!(
        fat.close_file(),
        Err(Error::Device(DeviceFailure::Erase { addr: 0 }))
    );
    assert_eq!(fat.mode(), ModeKind::Writing);
    assert_eq!(fat.written_len(), Some(700));

    fat.device_mut().set_faults(Faults::empty());
    fat.close_file().unwrap();
    assert_eq!(fat.mode(), ModeKind::Idle);

    let table = fat.load_allocation_table().unwrap();
    assert_eq!(table.open_file(), None);
    assert_eq!(table.get(0).map(|entry| entry.len()), Some(700));
    assert_eq!(read_file(&mut fat, 0), payload);
}

#[test]
fn test_read_failure_mid_file() {
    let mut fat = fresh();
    write_file(&mut fat, &pattern(600, 2));

    fat.open_file(0).unwrap();
    fat.device_mut().set_faults(Faults::READ);
    let mut buf = [0u8; 64];
    assert_eq!(
        fat.read(&mut buf),
        Err(Error::Device(DeviceFailure::Read { addr: 4096 }))
    );
    assert_eq!(fat.mode(), ModeKind::Reading);
    assert_eq!(fat.peek(), 600);

    fat.device_mut().set_faults(Faults::empty());
    assert_eq!(fat.read(&mut buf).unwrap(), 64);
    assert_eq!(&buf[..], &pattern(600, 2)[..64]);
    fat.close_file().unwrap();
}
