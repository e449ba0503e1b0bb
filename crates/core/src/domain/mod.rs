pub mod agent;
pub mod artifact;
pub mod ledger;
pub mod project;
pub mod run;

pub use agent::*;
pub use artifact::*;
pub use ledger::*;
pub use project::*;
pub use run::*;
