pub mod approval;
pub mod config;
pub mod digest;
pub mod eligibility;
pub mod error;
pub mod executor;
pub mod ident;
pub mod io;
pub mod ledger;
pub mod log;
pub mod paths;
pub mod registry;
pub mod runner;
pub mod schema;
pub mod stage;
pub mod verifier;

pub use error::{LaneError, Result};
pub use stage::{Denial, Stage};
