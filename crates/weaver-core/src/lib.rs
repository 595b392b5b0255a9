//! Weaver Core - error taxonomy, governance documents, runtime config

pub mod capability;
pub mod config;
pub mod error;
pub mod governance;
pub mod sanitize;

pub use capability::{Availability, Capability};
pub use config::WeaverConfig;
pub use error::{Error, Result};
pub use governance::{
    AutonomyManifest, Conditions, Governance, GovernanceManifest, GovernanceMode, GuardConfig,
    KillSwitch, RoleRegistry,
};
