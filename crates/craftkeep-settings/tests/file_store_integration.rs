use chrono::Utc;
use craftkeep_backend::{ResolvedArtifact, SettingsStore, Version, VersionGroup};
use craftkeep_settings::{
    InstallState, JsonFileStore, MaintenancePolicy, PolicyAnswers, ServerConfig, SettingsError,
    generate_default_config,
};
use tempfile::tempdir;

#[test]
fn generate_install_and_policy_survive_reopening_the_file() {
    let temp_dir = tempdir().expect("create temp dir");
    let path = temp_dir.path().join("nested").join("config.json");

    let store = JsonFileStore::new(&path);
    generate_default_config(&store).expect("generate defaults");

    let artifact = ResolvedArtifact {
        target_version_group: VersionGroup::new(1, 20),
        build: 496,
        download_url: "https://api.papermc.io/v2/projects/paper/versions/1.20/builds/496/downloads/paper-1.20.4-496.jar"
            .to_string(),
        source_filename: "paper-1.20.4-496.jar".to_string(),
        sha256: None,
    };
    InstallState::commit_install(&store, &artifact, Utc::now()).expect("record install");

    let answers: PolicyAnswers = serde_json::from_str(
        r#"{
            "restart_schedule": "0 5 * * *",
            "backup_schedule": "0 4 * * *",
            "backup_path": "/srv/backups",
            "backup_retention": 0,
            "update_check_schedule": "@weekly",
            "allow_major_updates": false,
            "maintenance_script_schedule": "15 5 * * MON"
        }"#,
    )
    .expect("answers parse");
    MaintenancePolicy::build_from_answers(answers)
        .expect("valid answers")
        .save(&store)
        .expect("save policy");

    let reopened = JsonFileStore::new(&path);
    let config = ServerConfig::load(&reopened).expect("load config");

    assert!(config.install.is_installed());
    assert_eq!(
        config.install.current_version,
        Some(Version::new(1, 20, None).with_build(496))
    );
    assert_eq!(config.maintenance.backup_retention, 0);
    assert_eq!(config.maintenance.update_check_schedule, "@weekly");
    assert_eq!(config.server.allocated_ram_mb, 1024);
}

#[test]
fn hand_edited_corrupt_install_section_is_reported() {
    let temp_dir = tempdir().expect("create temp dir");
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{ "install": { "major": 1, "minor": 20, "version_group": "1.19", "installed": false } }"#,
    )
    .expect("write config");

    let store = JsonFileStore::new(&path);

    assert!(matches!(
        InstallState::load(&store),
        Err(SettingsError::StateCorrupt {
            section: "install",
            ..
        })
    ));
    assert!(store.load("maintenance").expect("other sections load").is_empty());
}
