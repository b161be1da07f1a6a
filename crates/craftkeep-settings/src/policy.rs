use log::info;
use serde::{Deserialize, Serialize};

use craftkeep_backend::SettingsStore;

use crate::backup::{BackupEntry, next_backups_to_prune};
use crate::cron::CronExpression;
use crate::error::{FieldViolation, SettingsError, Violations};
use crate::store::{load_section, save_section};

pub const MAINTENANCE_SECTION: &str = "maintenance";

const DEFAULT_BACKUP_PATH: &str = "~/craftkeep-backups";

/// Recurring upkeep schedules plus backup retention and the update gate.
///
/// Fields hold what the user wrote, so a loaded policy can be invalid;
/// [`MaintenancePolicy::validate`] reports every problem at once. Violations
/// are named by their key in the persisted `maintenance` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenancePolicy {
    pub restart_schedule: String,
    pub backup_schedule: String,
    pub update_check_schedule: String,
    pub maintenance_script_schedule: String,
    pub backup_path: String,
    /// `0` keeps every backup.
    pub backup_retention: i64,
    pub allow_major_updates: bool,
}

impl Default for MaintenancePolicy {
    fn default() -> Self {
        Self {
            restart_schedule: "0 4 * * *".to_string(),
            backup_schedule: "0 3 * * *".to_string(),
            update_check_schedule: "30 2 * * *".to_string(),
            maintenance_script_schedule: "30 4 * * 0".to_string(),
            backup_path: DEFAULT_BACKUP_PATH.to_string(),
            backup_retention: 1,
            allow_major_updates: false,
        }
    }
}

/// Completed answers from an interactive or scripted interview.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyAnswers {
    pub restart_schedule: String,
    pub backup_schedule: String,
    pub backup_path: String,
    pub backup_retention: i64,
    pub update_check_schedule: String,
    #[serde(default)]
    pub allow_major_updates: bool,
    pub maintenance_script_schedule: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MaintenanceRecord {
    #[serde(default)]
    complete_shutdown: String,
    #[serde(default)]
    schedule: String,
    #[serde(default)]
    backup: BackupRecord,
    #[serde(default)]
    update: UpdateRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct BackupRecord {
    #[serde(default)]
    schedule: String,
    #[serde(default = "default_backup_path")]
    path: String,
    #[serde(default = "default_backup_number")]
    number: i64,
}

impl Default for BackupRecord {
    fn default() -> Self {
        Self {
            schedule: String::new(),
            path: default_backup_path(),
            number: default_backup_number(),
        }
    }
}

fn default_backup_path() -> String {
    DEFAULT_BACKUP_PATH.to_string()
}

fn default_backup_number() -> i64 {
    1
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UpdateRecord {
    #[serde(default)]
    schedule: String,
    #[serde(default)]
    allow_major_update: bool,
}

impl MaintenancePolicy {
    /// Build a policy from interview answers, rejecting it with every
    /// violation if any field is invalid.
    ///
    /// # Errors
    /// Returns [`SettingsError::Validation`] listing all invalid fields.
    pub fn build_from_answers(answers: PolicyAnswers) -> Result<Self, SettingsError> {
        Self {
            restart_schedule: answers.restart_schedule.trim().to_string(),
            backup_schedule: answers.backup_schedule.trim().to_string(),
            update_check_schedule: answers.update_check_schedule.trim().to_string(),
            maintenance_script_schedule: answers.maintenance_script_schedule.trim().to_string(),
            backup_path: answers.backup_path.trim().to_string(),
            backup_retention: answers.backup_retention,
            allow_major_updates: answers.allow_major_updates,
        }
        .validated()
    }

    /// Check every field and collect all violations.
    #[must_use]
    pub fn validate(&self) -> Violations {
        let mut violations = Vec::new();

        for (field, schedule) in [
            ("complete_shutdown", &self.restart_schedule),
            ("backup.schedule", &self.backup_schedule),
            ("update.schedule", &self.update_check_schedule),
            ("schedule", &self.maintenance_script_schedule),
        ] {
            if let Err(e) = CronExpression::parse(schedule) {
                violations.push(FieldViolation::new(field, e.to_string()));
            }
        }

        if self.backup_path.trim().is_empty() {
            violations.push(FieldViolation::new("backup.path", "must not be empty"));
        }

        if self.backup_retention < 0 {
            violations.push(FieldViolation::new(
                "backup.number",
                format!("must be >= 0, got {}", self.backup_retention),
            ));
        } else if u32::try_from(self.backup_retention).is_err() {
            violations.push(FieldViolation::new(
                "backup.number",
                format!("must be at most {}", u32::MAX),
            ));
        }

        Violations(violations)
    }

    /// Return `self` if it validates.
    ///
    /// # Errors
    /// Returns [`SettingsError::Validation`] listing all invalid fields.
    pub fn validated(self) -> Result<Self, SettingsError> {
        let violations = self.validate();
        if violations.is_empty() {
            Ok(self)
        } else {
            Err(SettingsError::Validation {
                section: MAINTENANCE_SECTION,
                violations,
            })
        }
    }

    #[must_use]
    pub const fn is_major_update_allowed(&self) -> bool {
        self.allow_major_updates
    }

    /// Retention as a count, or `None` when the stored value is invalid.
    #[must_use]
    pub fn retention(&self) -> Option<u32> {
        u32::try_from(self.backup_retention).ok()
    }

    /// Backups outside this policy's retention. An invalid retention prunes
    /// nothing.
    #[must_use]
    pub fn backups_to_prune(&self, existing: &[BackupEntry]) -> Vec<BackupEntry> {
        self.retention()
            .map(|retention| next_backups_to_prune(existing, retention))
            .unwrap_or_default()
    }

    /// Load the `maintenance` section as written, without validating it.
    ///
    /// # Errors
    /// Returns a store error or [`SettingsError::StateCorrupt`] if the
    /// section has the wrong shape.
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> Result<Self, SettingsError> {
        let record: MaintenanceRecord = load_section(store, MAINTENANCE_SECTION)?;
        Ok(Self::from_record(record))
    }

    /// Validate, then replace the whole `maintenance` section.
    ///
    /// # Errors
    /// Returns [`SettingsError::Validation`] without writing anything if the
    /// policy is invalid, or a store error.
    pub fn save<S: SettingsStore + ?Sized>(&self, store: &S) -> Result<(), SettingsError> {
        let violations = self.validate();
        if !violations.is_empty() {
            return Err(SettingsError::Validation {
                section: MAINTENANCE_SECTION,
                violations,
            });
        }
        save_section(store, MAINTENANCE_SECTION, &self.to_record())?;
        info!("maintenance policy saved");
        Ok(())
    }

    fn from_record(record: MaintenanceRecord) -> Self {
        Self {
            restart_schedule: record.complete_shutdown,
            backup_schedule: record.backup.schedule,
            update_check_schedule: record.update.schedule,
            maintenance_script_schedule: record.schedule,
            backup_path: record.backup.path,
            backup_retention: record.backup.number,
            allow_major_updates: record.update.allow_major_update,
        }
    }

    fn to_record(&self) -> MaintenanceRecord {
        MaintenanceRecord {
            complete_shutdown: self.restart_schedule.clone(),
            schedule: self.maintenance_script_schedule.clone(),
            backup: BackupRecord {
                schedule: self.backup_schedule.clone(),
                path: self.backup_path.clone(),
                number: self.backup_retention,
            },
            update: UpdateRecord {
                schedule: self.update_check_schedule.clone(),
                allow_major_update: self.allow_major_updates,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn answers() -> PolicyAnswers {
        PolicyAnswers {
            restart_schedule: "0 4 * * *".to_string(),
            backup_schedule: " 0 3 * * * ".to_string(),
            backup_path: "/srv/backups".to_string(),
            backup_retention: 3,
            update_check_schedule: "@daily".to_string(),
            allow_major_updates: true,
            maintenance_script_schedule: "30 4 * * SUN".to_string(),
        }
    }

    #[test]
    fn default_policy_is_valid() {
        assert!(MaintenancePolicy::default().validate().is_empty());
    }

    #[test]
    fn build_from_answers_trims_and_validates() {
        let policy = MaintenancePolicy::build_from_answers(answers()).expect("valid answers");

        assert_eq!(policy.backup_schedule, "0 3 * * *");
        assert_eq!(policy.retention(), Some(3));
        assert!(policy.is_major_update_allowed());
    }

    #[test]
    fn validate_reports_every_invalid_field() {
        let policy = MaintenancePolicy {
            restart_schedule: "every day".to_string(),
            backup_schedule: "0 3 * * *".to_string(),
            update_check_schedule: "61 * * * *".to_string(),
            maintenance_script_schedule: String::new(),
            backup_path: "  ".to_string(),
            backup_retention: -1,
            allow_major_updates: false,
        };

        let violations = policy.validate();

        assert_eq!(violations.len(), 5);
        for field in [
            "complete_shutdown",
            "update.schedule",
            "schedule",
            "backup.path",
            "backup.number",
        ] {
            assert!(violations.contains_field(field), "missing {field}");
        }
        assert!(!violations.contains_field("backup.schedule"));
    }

    #[test]
    fn single_bad_schedule_does_not_hide_later_fields() {
        let policy = MaintenancePolicy {
            restart_schedule: "bogus".to_string(),
            backup_path: String::new(),
            ..MaintenancePolicy::default()
        };

        let violations = policy.validate();

        assert!(violations.contains_field("complete_shutdown"));
        assert!(violations.contains_field("backup.path"));
    }

    #[test]
    fn build_from_answers_rejects_with_all_violations() {
        let mut bad = answers();
        bad.backup_schedule = "0 3 * *".to_string();
        bad.backup_retention = -2;

        let Err(SettingsError::Validation {
            section,
            violations,
        }) = MaintenancePolicy::build_from_answers(bad)
        else {
            panic!("invalid answers must be rejected");
        };

        assert_eq!(section, MAINTENANCE_SECTION);
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn zero_retention_is_valid_and_keeps_everything() {
        let policy = MaintenancePolicy {
            backup_retention: 0,
            ..MaintenancePolicy::default()
        };
        let existing: Vec<_> = (1..=5)
            .map(|day| {
                BackupEntry::new(
                    format!("b{day}"),
                    Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0)
                        .single()
                        .expect("valid timestamp"),
                )
            })
            .collect();

        assert!(policy.validate().is_empty());
        assert!(policy.backups_to_prune(&existing).is_empty());

        let policy = MaintenancePolicy {
            backup_retention: 2,
            ..policy
        };
        let pruned: Vec<_> = policy
            .backups_to_prune(&existing)
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(pruned, vec!["b3", "b2", "b1"]);
    }

    #[test]
    fn save_and_load_use_section_layout() {
        let store = MemoryStore::new();
        let policy = MaintenancePolicy::build_from_answers(answers()).expect("valid answers");

        policy.save(&store).expect("save");

        let raw = store.load(MAINTENANCE_SECTION).expect("infallible");
        assert_eq!(raw.get("complete_shutdown"), Some(&json!("0 4 * * *")));
        assert_eq!(raw.get("schedule"), Some(&json!("30 4 * * SUN")));
        assert_eq!(raw["backup"]["number"], json!(3));
        assert_eq!(raw["update"]["allow_major_update"], json!(true));

        assert_eq!(MaintenancePolicy::load(&store).expect("load"), policy);
    }

    #[test]
    fn save_refuses_invalid_policy_without_writing() {
        let store = MemoryStore::new();
        let policy = MaintenancePolicy {
            backup_retention: -1,
            ..MaintenancePolicy::default()
        };

        assert!(matches!(
            policy.save(&store),
            Err(SettingsError::Validation { .. })
        ));
        assert!(store.load(MAINTENANCE_SECTION).expect("infallible").is_empty());
    }

    #[test]
    fn load_keeps_invalid_values_for_reporting() {
        let store = MemoryStore::new();
        let serde_json::Value::Object(map) = json!({
            "complete_shutdown": "",
            "backup": { "number": -4 },
            "update": { "schedule": "@hourly" }
        }) else {
            panic!("object literal");
        };
        store.save(MAINTENANCE_SECTION, map).expect("infallible");

        let policy = MaintenancePolicy::load(&store).expect("load");

        assert_eq!(policy.backup_retention, -4);
        assert_eq!(policy.backup_path, DEFAULT_BACKUP_PATH);
        let violations = policy.validate();
        assert!(violations.contains_field("complete_shutdown"));
        assert!(violations.contains_field("backup.number"));
        assert!(!violations.contains_field("update.schedule"));
    }
}
