use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{error, info, warn};
use serde::Deserialize;

use craftkeep_backend::{ResolvedArtifact, SettingsStore};
use craftkeep_core::{ReleaseClient, VersionResolver};
use craftkeep_platform::expand_home;
use craftkeep_settings::{
    BackupEntry, InstallState, JsonFileStore, MAINTENANCE_SECTION, MaintenancePolicy,
    NotificationSettings, PolicyAnswers, ServerConfig, ServerSettings, SettingsError,
    generate_default_config, scan_backups,
};

use crate::error::AppError;
use crate::lock::ConfigLock;
use crate::settings::AppSettings;

pub struct Context {
    pub config_path: PathBuf,
    pub store: JsonFileStore,
    pub settings: AppSettings,
}

impl Context {
    pub fn new(config_path: PathBuf, settings: AppSettings) -> Self {
        Self {
            store: JsonFileStore::new(&config_path),
            config_path,
            settings,
        }
    }

    fn lock(&self) -> Result<ConfigLock, AppError> {
        let lock = ConfigLock::acquire(&self.config_path)?;
        info!("holding {}", lock.path().display());
        Ok(lock)
    }
}

/// Answers file accepted by `build`.
#[derive(Debug, Deserialize)]
pub struct BuildAnswers {
    pub maintenance: PolicyAnswers,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
}

pub fn generate(ctx: &Context) -> Result<(), AppError> {
    let _lock = ctx.lock()?;
    generate_default_config(&ctx.store)?;
    println!("Wrote default configuration to {}", ctx.config_path.display());
    Ok(())
}

pub fn build(ctx: &Context, answers_path: &Path) -> Result<(), AppError> {
    let content = std::fs::read_to_string(answers_path)
        .map_err(|e| AppError::io(format!("failed to read {}", answers_path.display()), e))?;
    let answers: BuildAnswers = serde_json::from_str(&content).map_err(AppError::Answers)?;

    let _lock = ctx.lock()?;
    apply_answers(&ctx.store, answers)?;
    println!("Saved configuration to {}", ctx.config_path.display());
    Ok(())
}

/// Validate every section of `answers`, then persist them. Nothing is written
/// unless all sections are valid.
pub fn apply_answers<S: SettingsStore + ?Sized>(
    store: &S,
    answers: BuildAnswers,
) -> Result<(), AppError> {
    let policy = MaintenancePolicy::build_from_answers(answers.maintenance);

    let mut failures = Vec::new();
    for (section, violations) in [
        ("server", answers.server.validate()),
        ("notifications", answers.notifications.validate()),
    ] {
        if !violations.is_empty() {
            failures.push(SettingsError::Validation {
                section,
                violations,
            });
        }
    }

    match policy {
        Ok(policy) if failures.is_empty() => {
            answers.server.save(store)?;
            answers.notifications.save(store)?;
            policy.save(store)?;
            info!("configuration built from answers");
            Ok(())
        }
        Ok(_) => Err(rejected(failures)),
        Err(e) => {
            failures.insert(0, e);
            Err(rejected(failures))
        }
    }
}

fn rejected(mut failures: Vec<SettingsError>) -> AppError {
    warn!("{} section(s) rejected, nothing saved", failures.len());
    for failure in failures.iter().skip(1) {
        error!("{failure}");
    }
    failures.swap_remove(0).into()
}

pub fn status(ctx: &Context) -> Result<(), AppError> {
    let config = ServerConfig::load(&ctx.store)?;

    println!("Installed:     {}", config.install.version_label());
    if let Some(timestamp) = config.install.install_timestamp {
        println!("Installed at:  {}", timestamp.to_rfc3339());
    }
    println!("Allocated RAM: {} MB", config.server.allocated_ram_mb);
    println!(
        "Major updates: {}",
        if config.maintenance.is_major_update_allowed() {
            "allowed"
        } else {
            "gated"
        }
    );
    println!(
        "Notifications: {}",
        if config.notifications.is_enabled() {
            "enabled"
        } else {
            "disabled"
        }
    );

    let violations = config.maintenance.validate();
    if violations.is_empty() {
        println!("Maintenance:   valid");
    } else {
        println!("Maintenance:   {} problem(s)", violations.len());
        for violation in violations.iter() {
            println!("  - {violation}");
        }
    }
    Ok(())
}

/// Resolve the next artifact. With `record`, the config lock is held from
/// before the install state is read until the new install is committed.
pub async fn resolve(ctx: &Context, record: bool) -> Result<ResolvedArtifact, AppError> {
    let _lock = if record { Some(ctx.lock()?) } else { None };
    let state = InstallState::load(&ctx.store)?;
    let policy = MaintenancePolicy::load(&ctx.store)?;
    let client = ReleaseClient::new(ctx.settings.release_config())?;
    let resolver = VersionResolver::new(client);

    let timeout = ctx.settings.fetch_timeout();
    let artifact = tokio::time::timeout(timeout, resolver.resolve_next(&state, &policy))
        .await
        .map_err(|_| AppError::Timeout {
            operation: "resolve",
            seconds: timeout.as_secs(),
        })??;

    println!("Installed: {}", state.version_label());
    println!("Target:    {}", artifact.version());
    println!("File:      {}", artifact.source_filename);
    println!("Download:  {}", artifact.download_url);
    if let Some(sha256) = &artifact.sha256 {
        println!("SHA-256:   {sha256}");
    }

    if record {
        let recorded = InstallState::commit_install(&ctx.store, &artifact, Utc::now())?;
        println!("Recorded install of {}", recorded.version_label());
    }
    Ok(artifact)
}

pub fn prune(ctx: &Context, apply: bool) -> Result<(), AppError> {
    let policy = MaintenancePolicy::load(&ctx.store)?;
    let backup_dir = expand_home(&policy.backup_path)?;

    let _lock = if apply { Some(ctx.lock()?) } else { None };
    let pruned = prune_backups(&policy, &backup_dir, apply)?;

    if pruned.is_empty() {
        println!("Nothing to prune in {}", backup_dir.display());
    }
    for entry in &pruned {
        let verb = if apply { "Removed" } else { "Would remove" };
        println!("{verb} {} ({})", entry.id, entry.created_at.to_rfc3339());
    }
    Ok(())
}

/// Backups in `backup_dir` outside the policy's retention, deleted when
/// `apply` is set.
pub fn prune_backups(
    policy: &MaintenancePolicy,
    backup_dir: &Path,
    apply: bool,
) -> Result<Vec<BackupEntry>, AppError> {
    let violations = policy.validate();
    if violations.contains_field("backup.path") || violations.contains_field("backup.number") {
        return Err(SettingsError::Validation {
            section: MAINTENANCE_SECTION,
            violations,
        }
        .into());
    }

    let existing = scan_backups(backup_dir)
        .map_err(|e| AppError::io(format!("failed to list {}", backup_dir.display()), e))?;
    let pruned = policy.backups_to_prune(&existing);

    if apply {
        for entry in &pruned {
            let path = backup_dir.join(&entry.id);
            let removed = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            removed.map_err(|e| AppError::io(format!("failed to remove {}", path.display()), e))?;
            info!("pruned backup {}", entry.id);
        }
    }
    Ok(pruned)
}

pub fn reset(ctx: &Context) -> Result<(), AppError> {
    let _lock = ctx.lock()?;
    InstallState::commit_reset(&ctx.store)?;
    println!("Cleared recorded installation");
    Ok(())
}
