//! Ports - 抽象化レイヤー
//!
//! The core talks to its collaborators (record persistence, terminal UI, hook
//! execution, time, id generation) only through these traits. Development
//! implementations live in `impls`.

pub mod clock;
pub mod hook_runner;
pub mod id_generator;
pub mod record_store;
pub mod ui;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::hook_runner::{HookError, HookRunner};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::record_store::{RecordStore, StoreError};
pub use self::ui::{StatusScope, Ui};
