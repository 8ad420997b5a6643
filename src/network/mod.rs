//! Socket enumeration and process name resolution.

pub mod process;
pub mod source;
pub mod types;

pub use process::{ProcessLookup, SystemProcessLookup};
pub use source::{ConnectionSource, SystemConnectionSource};
pub use types::{AddressFamily, Collection, ConnectionRecord, SocketType};
