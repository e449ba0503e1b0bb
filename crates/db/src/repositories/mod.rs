mod project_repository;
mod version_repository;

pub use project_repository::*;
pub use version_repository::*;
