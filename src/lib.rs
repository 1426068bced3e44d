//! A2BUS - Apple II memory map and Disk II controller
//!
//! The addressable hardware of an Apple IIe, without the CPU:
//! - Bank-switched memory map driven by soft switches
//! - Language card, auxiliary RAM, slot ROM windows
//! - Disk II controller with DSK/PO/NIB/2IMG support
//! - Dirty-page tracking shared with a video compositor

pub mod apple2;
pub mod bus;
pub mod config;
pub mod dirty;
pub mod disk;
pub mod disk_image;
pub mod disk_log;
pub mod error;
pub mod gcr;
pub mod memory;
pub mod paddle;
pub mod peripheral;
pub mod savestate;
pub mod speaker;
pub mod store;
pub mod switches;

pub use apple2::Apple2;
pub use bus::MemoryBus;
pub use error::{ConfigError, DiskError, RomError, StateError};
