//! SQLite project store: run snapshots and page version history.

mod error;
pub mod models;
mod pool;
pub mod repositories;

pub use error::*;
pub use models::{ProjectRow, VersionRow};
pub use pool::*;
pub use repositories::*;
