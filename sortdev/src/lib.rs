//! Sort device: a shared, bounded byte mailbox whose reads come out sorted
//!
//! ```
//! use sortdev::{AccessMode, SortDevice};
//!
//! let device = SortDevice::new(64);
//! let session = device.open(AccessMode::ReadWrite, true).unwrap();
//!
//! session.write(b"jihgfedcba").unwrap();
//! let mut buf = [0u8; 100];
//! let n = session.read(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"abcdefghij");
//! ```

pub mod buffer;
pub mod command;
pub mod config;
pub mod device;
pub mod error;
pub mod gate;
pub mod idgen;
pub mod notifier;
pub mod registry;
pub mod session;
pub mod transfer;

// Re-export the device surface for convenience
pub use device::{DeviceStatus, SortDevice};
pub use registry::SortDeviceSet;
pub use session::{AccessMode, Interrupter, Readiness, Session};

// Re-export command codes
pub use command::{CommandArg, SORT_IOC_MAGIC, SORT_IOC_MAXNR, SORT_IOC_RESET};

// Re-export error and config types
pub use config::{ConfigError, DeviceConfig};
pub use error::DeviceError;

// Re-export collaborator interfaces
pub use idgen::Handle;
pub use notifier::{AsyncNotifier, DeviceEvent, NotificationQueue};
pub use transfer::{CopyIn, CopyOut, Fault};
