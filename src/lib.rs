//! spacegov
//!
//! Governance proposal engine for DAO spaces: proposals with a frozen voter
//! roster, guardian approval, a vote ledger and weighted tallies.

pub mod config;
pub mod demo;

/// Module version information
pub mod version {
    /// The current version of the spacegov library
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

pub use spacegov_common as common;
pub use spacegov_governance as governance;
pub use spacegov_reputation as reputation;
pub use spacegov_storage as storage;

pub use config::AppConfig;
