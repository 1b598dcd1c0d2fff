pub mod config;
pub mod error;
pub mod events;
pub mod types;

pub use config::NivaConfig;
pub use error::{NivaError, Result};
pub use events::{EventEmitter, Notification, NotificationKind, SessionEvent};
pub use types::*;
