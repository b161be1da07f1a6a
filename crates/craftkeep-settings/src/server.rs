use serde::{Deserialize, Serialize};

use craftkeep_backend::SettingsStore;

use crate::error::{FieldViolation, SettingsError, Violations};
use crate::store::{load_section, save_section};

pub const SERVER_SECTION: &str = "server";
pub const NOTIFICATIONS_SECTION: &str = "notifications";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_allocated_ram")]
    pub allocated_ram_mb: u32,
}

fn default_allocated_ram() -> u32 {
    1024
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            allocated_ram_mb: default_allocated_ram(),
        }
    }
}

impl ServerSettings {
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut violations = Vec::new();
        if self.allocated_ram_mb == 0 {
            violations.push(FieldViolation::new("allocated_ram_mb", "must be > 0"));
        }
        Violations(violations)
    }

    /// # Errors
    /// Returns a store error or [`SettingsError::StateCorrupt`].
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self, SettingsError> {
        load_section(store, SERVER_SECTION)
    }

    /// # Errors
    /// Returns [`SettingsError::Validation`] or a store error.
    pub fn save<S: SettingsStore + ?Sized>(&self, store: &S) -> Result<(), SettingsError> {
        reject_invalid(SERVER_SECTION, self.validate())?;
        save_section(store, SERVER_SECTION, self)
    }
}

/// SMTP settings used to mail maintenance reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_smtp_server")]
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub recipients: Vec<String>,
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            address: String::new(),
            password: String::new(),
            server: default_smtp_server(),
            port: default_smtp_port(),
            recipients: Vec::new(),
        }
    }
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

impl NotificationSettings {
    /// Notifications are off until a sender address is configured.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.address.trim().is_empty()
    }

    /// Check the settings; an unconfigured sender is valid and disables
    /// notifications.
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut violations = Vec::new();
        if !self.is_enabled() {
            return Violations(violations);
        }

        if !looks_like_email(self.address.trim()) {
            violations.push(FieldViolation::new(
                "address",
                format!("{} is not an email address", self.address),
            ));
        }
        if self.server.trim().is_empty() {
            violations.push(FieldViolation::new("server", "must not be empty"));
        }
        if self.port == 0 {
            violations.push(FieldViolation::new("port", "must be > 0"));
        }
        if self.recipients.is_empty() {
            violations.push(FieldViolation::new("recipients", "at least one is required"));
        }
        for recipient in &self.recipients {
            if !looks_like_email(recipient.trim()) {
                violations.push(FieldViolation::new(
                    "recipients",
                    format!("{recipient} is not an email address"),
                ));
            }
        }
        Violations(violations)
    }

    /// # Errors
    /// Returns a store error or [`SettingsError::StateCorrupt`].
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self, SettingsError> {
        load_section(store, NOTIFICATIONS_SECTION)
    }

    /// # Errors
    /// Returns [`SettingsError::Validation`] or a store error.
    pub fn save<S: SettingsStore + ?Sized>(&self, store: &S) -> Result<(), SettingsError> {
        reject_invalid(NOTIFICATIONS_SECTION, self.validate())?;
        save_section(store, NOTIFICATIONS_SECTION, self)
    }
}

fn reject_invalid(section: &'static str, violations: Violations) -> Result<(), SettingsError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(SettingsError::Validation {
            section,
            violations,
        })
    }
}
