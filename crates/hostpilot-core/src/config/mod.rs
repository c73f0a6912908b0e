//! Configuration system — schema, loading, and credential overrides.
//!
//! # Usage
//! ```no_run
//! use hostpilot_core::config::{self, EnvCredentials};
//!
//! # fn main() -> Result<(), hostpilot_core::AgentError> {
//! let cfg = config::load_config(None, &EnvCredentials)?;
//! println!("Provider: {} / {}", cfg.agent.provider, cfg.agent.model);
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod loader;
pub mod schema;

// Re-export key types
pub use credentials::{CredentialSource, EnvCredentials};
pub use loader::{get_config_path, load_config};
pub use schema::{Config, EmailConfig, ProviderConfig};
