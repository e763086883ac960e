//! Domain layer: membership data and dissemination bookkeeping, no I/O.

pub mod config;
pub mod dissemination;
pub mod error;
pub mod member;
pub mod messages;
pub mod registry;
pub mod update;

pub use config::*;
pub use dissemination::*;
pub use error::*;
pub use member::*;
pub use messages::*;
pub use registry::*;
pub use update::*;
