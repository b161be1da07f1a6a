use log::info;

use craftkeep_backend::SettingsStore;

use crate::error::SettingsError;
use crate::install_state::InstallState;
use crate::policy::MaintenancePolicy;
use crate::server::{NotificationSettings, ServerSettings};

/// All sections of a server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub install: InstallState,
    pub maintenance: MaintenancePolicy,
    pub notifications: NotificationSettings,
}

impl ServerConfig {
    /// # Errors
    /// Returns the first section that fails to load.
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self, SettingsError> {
        Ok(Self {
            server: ServerSettings::load(store)?,
            install: InstallState::load(store)?,
            maintenance: MaintenancePolicy::load(store)?,
            notifications: NotificationSettings::load(store)?,
        })
    }
}

/// Replace every section with its default, leaving a never-installed server
/// with a valid maintenance policy.
///
/// # Errors
/// Returns an error if any section cannot be written.
pub fn generate_default_config<S: SettingsStore + ?Sized>(
    store: &S,
) -> Result<ServerConfig, SettingsError> {
    let config = ServerConfig::default();
    config.server.save(store)?;
    config.install.save(store)?;
    config.maintenance.save(store)?;
    config.notifications.save(store)?;
    info!("generated default configuration");
    Ok(config)
}
