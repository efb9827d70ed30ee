//! Common utilities and types for spacegov
//!
//! Identifiers, the clock collaborator, configuration loading and logging
//! setup shared by every crate in the workspace.

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Configuration, LoggingConfig};
pub use error::{Error, Result};
pub use types::{MemberId, ProgramId, ProposalId, SpaceId};
