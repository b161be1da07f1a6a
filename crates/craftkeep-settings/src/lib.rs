//! Persisted server configuration for craftkeep.
//!
//! Sections are read and written whole through a
//! [`SettingsStore`](craftkeep_backend::SettingsStore):
//! - `install`: what is installed ([`InstallState`]).
//! - `maintenance`: schedules, backup retention, update gate ([`MaintenancePolicy`]).
//! - `server` and `notifications`: runtime and report settings.

mod backup;
mod config;
mod cron;
mod error;
mod install_state;
mod policy;
mod server;
mod store;

pub use backup::{BackupEntry, next_backups_to_prune, scan_backups};
pub use config::{ServerConfig, generate_default_config};
pub use cron::{CronError, CronExpression, CronField};
pub use error::{FieldViolation, SettingsError, StoreError, Violations};
pub use install_state::{INSTALL_SECTION, InstallState};
pub use policy::{MAINTENANCE_SECTION, MaintenancePolicy, PolicyAnswers};
pub use server::{NOTIFICATIONS_SECTION, NotificationSettings, SERVER_SECTION, ServerSettings};
pub use store::{JsonFileStore, MemoryStore, load_section, save_section};
