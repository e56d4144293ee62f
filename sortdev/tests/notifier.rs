use std::sync::Arc;
use std::thread;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use sortdev::{AccessMode, DeviceEvent, NotificationQueue, SortDevice};

fn device_with_queue(capacity: usize) -> (SortDevice, Arc<NotificationQueue>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let queue = Arc::new(NotificationQueue::new());
    let device = SortDevice::with_notifier(capacity, queue.clone());
    (device, queue)
}

#[tokio::test]
async fn test_completed_write_notifies_async_session() {
    let (device, queue) = device_with_queue(32);
    let mut listener = device.open(AccessMode::Read, false).unwrap();
    listener.set_async(true);
    let mut rx = queue.subscribe(listener.handle()).unwrap();

    let writer = device.open(AccessMode::Write, false).unwrap();
    writer.write(b"wake up").unwrap();

    assert_eq!(rx.recv().await.unwrap(), DeviceEvent::DataAvailable);
    let mut buf = [0u8; 16];
    assert_eq!(listener.read(&mut buf).unwrap(), 7);
}

#[tokio::test]
async fn test_close_deregisters_session() {
    let (device, queue) = device_with_queue(32);
    let mut listener = device.open(AccessMode::Read, false).unwrap();
    listener.set_async(true);
    let handle = listener.handle();
    let mut rx = queue.subscribe(handle).unwrap();

    listener.close();
    assert!(!queue.is_registered(handle));
    assert_eq!(rx.recv().await, Err(RecvError::Closed));
}

#[test]
fn test_set_async_off_stops_notifications() {
    let (device, queue) = device_with_queue(32);
    let mut listener = device.open(AccessMode::Read, false).unwrap();
    listener.set_async(true);
    listener.set_async(true);
    assert_eq!(queue.observer_count(), 1);

    listener.set_async(false);
    assert_eq!(queue.observer_count(), 0);
    assert!(queue.subscribe(listener.handle()).is_none());
}

#[test]
fn test_sessions_without_async_get_nothing() {
    let (device, queue) = device_with_queue(32);
    let mut subscribed = device.open(AccessMode::Read, false).unwrap();
    let quiet = device.open(AccessMode::Read, false).unwrap();
    subscribed.set_async(true);
    let mut rx = queue.subscribe(subscribed.handle()).unwrap();

    assert!(queue.subscribe(quiet.handle()).is_none());

    let writer = device.open(AccessMode::Write, false).unwrap();
    writer.write(b"x").unwrap();
    writer.write(b"y").unwrap();

    assert_eq!(rx.try_recv(), Ok(DeviceEvent::DataAvailable));
    assert_eq!(rx.try_recv(), Ok(DeviceEvent::DataAvailable));
    assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
}

#[test]
fn test_blocking_listener_thread() {
    let (device, queue) = device_with_queue(32);
    let mut listener = device.open(AccessMode::Read, true).unwrap();
    listener.set_async(true);
    let mut rx = queue.subscribe(listener.handle()).unwrap();

    let watcher = thread::spawn(move || {
        let event = rx.blocking_recv();
        let mut buf = [0u8; 8];
        let n = listener.read(&mut buf).unwrap();
        (event, buf[..n].to_vec())
    });

    let writer = device.open(AccessMode::Write, true).unwrap();
    writer.write(b"cab").unwrap();

    let (event, data) = watcher.join().unwrap();
    assert_eq!(event, Ok(DeviceEvent::DataAvailable));
    assert_eq!(data, b"abc");
}
