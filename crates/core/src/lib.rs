pub mod domain;
pub mod error;
pub mod export;
pub mod templates;

pub use domain::*;
pub use error::{CoreError, Result};
pub use export::{ExportBundle, MetaTag, PageMetadata};
pub use templates::{Language, Template, TextDirection};
