//! Sort device CLI demo
//!
//! A writer thread feeds stdin lines into device 0, a reader thread prints
//! what comes back (sorted). An optional first argument names a JSON config
//! file, e.g. `{"buffer_size": 8}` to watch the writer block on a tiny buffer.
//!
//! Set `RUST_LOG=debug` to see the device sleep and wake.

use std::fs::File;
use std::io::{self, BufRead};
use std::thread;

use sortdev::{AccessMode, DeviceConfig, DeviceError, SortDeviceSet};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => DeviceConfig::from_reader(File::open(path)?)?,
        None => DeviceConfig::default(),
    };
    let devices = SortDeviceSet::init(config)?;

    let writer = devices.open(0, AccessMode::Write, true)?;
    let reader = devices.open(0, AccessMode::Read, true)?;
    let stop_reader = reader.interrupter();

    let reader_task = thread::spawn(move || {
        let mut buf = [0u8; 16];
        loop {
            match reader.read(&mut buf) {
                Ok(n) => println!("(reader): {}", String::from_utf8_lossy(&buf[..n])),
                Err(DeviceError::Interrupted) => {
                    println!("(reader) stopped");
                    break;
                }
                Err(e) => {
                    eprintln!("(reader) error: {e}");
                    break;
                }
            }
        }
    });

    println!("Enter text (empty line to quit):");
    for line in io::stdin().lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            break;
        }
        let written = writer.write(trimmed.as_bytes())?;
        println!("(writer): {written} bytes");
    }

    stop_reader.interrupt();
    reader_task
        .join()
        .map_err(|_| "reader thread panicked")?;

    println!("Final state: {:?}", devices.device(0)?);
    devices.cleanup();
    Ok(())
}
