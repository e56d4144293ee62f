use sortdev::{AccessMode, DeviceConfig, DeviceError, SortDeviceSet};

#[test]
fn test_devices_in_a_set_are_independent() {
    let config = DeviceConfig::from_json_str(r#"{"buffer_size": 16, "nr_devs": 2}"#).unwrap();
    let set = SortDeviceSet::init(config).unwrap();

    let first = set.open(0, AccessMode::ReadWrite, false).unwrap();
    let second = set.open(1, AccessMode::ReadWrite, false).unwrap();
    first.write(b"zz").unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(second.read(&mut buf), Err(DeviceError::WouldBlock));
    assert_eq!(first.read(&mut buf).unwrap(), 2);

    assert_eq!(set.device(0).unwrap().status().readers, 1);
    assert_eq!(set.device(1).unwrap().status().writers, 1);
}

#[test]
fn test_sessions_outlive_cleanup() {
    let set = SortDeviceSet::init(DeviceConfig::with_buffer_size(8)).unwrap();
    let session = set.open(0, AccessMode::ReadWrite, false).unwrap();
    set.cleanup();

    session.write(b"ok").unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(session.read(&mut buf).unwrap(), 2);
}
