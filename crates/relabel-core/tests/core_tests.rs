use relabel_core::{
    Capability, CapabilitySet, ConfigError, FailureReason, Item, ItemKind, MetadataRecord,
    PartialRename, RecordId, RenameConfig, RenameFailure, RenameOutcome, RenameRequest,
    RenameSuccess,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_item_kind_capabilities() {
    assert_eq!(ItemKind::File.required_capability(), Capability::RenameFile);
    assert_eq!(ItemKind::Folder.required_capability(), Capability::RenameFolder);
    assert!(ItemKind::Folder.is_folder());
    assert_eq!(ItemKind::Folder.to_string(), "folder");
}

#[test]
fn test_request_keeps_raw_input() {
    let request = RenameRequest::new(
        Item::file("old name.txt", "/docs"),
        "  New  Report!!  ",
        CapabilitySet::none().grant(Capability::RenameFile),
    );

    assert_eq!(request.raw_new_name, "  New  Report!!  ");
    assert_eq!(request.item.extension(), Some("txt"));
    assert!(request.capabilities.contains(Capability::RenameFile));
}

#[test]
fn test_record_prefix_is_case_sensitive() {
    let record = MetadataRecord::new(RecordId::new(7), "files/Photos/a.jpg", '/');
    assert!(record.is_under("files/Photos/"));
    assert!(!record.is_under("files/photos/"));
    assert_eq!(record.filename, "a.jpg");
}

#[test]
fn test_outcome_accessors() {
    let success: RenameOutcome = RenameSuccess {
        kind: ItemKind::File,
        old_name: "a.txt".into(),
        new_name: "b.txt".into(),
        old_path: "/a.txt".into(),
        new_path: "/b.txt".into(),
        affected_records: 1,
    }
    .into();
    assert!(success.is_success());
    assert_eq!(success.reason(), None);

    let failure: RenameOutcome = RenameFailure::new(
        FailureReason::MetadataUpdateFailed,
        ItemKind::Folder,
        "photos",
        Some("pictures".into()),
        "database is locked",
    )
    .with_partial(PartialRename {
        old_prefix: "/photos/".into(),
        new_prefix: "/pictures/".into(),
    })
    .into();
    assert!(!failure.is_success());
    assert_eq!(failure.reason(), Some(FailureReason::MetadataUpdateFailed));
    assert_eq!(failure.kind(), ItemKind::Folder);
}

#[test]
fn test_config_load_from_toml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
max_name_chars = 32
root_alias = "local:"
protected_paths = ["/srv/app", "/srv/system"]
writable_mode = 0o644
rollback_on_metadata_failure = false
"#,
    )
    .unwrap();

    let config = RenameConfig::load(&path).unwrap();
    assert_eq!(config.max_name_chars, 32);
    assert_eq!(config.root_alias.as_deref(), Some("local:"));
    assert_eq!(config.protected_paths.len(), 2);
    assert_eq!(config.writable_mode, 0o644);
    assert!(!config.rollback_on_metadata_failure);
    // Unset keys fall back to defaults.
    assert_eq!(config.separator, '/');
    assert!(config.database.is_none());
}

#[test]
fn test_config_load_errors() {
    let dir = TempDir::new().unwrap();

    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        RenameConfig::load(&missing),
        Err(ConfigError::Read { .. })
    ));

    let garbage = dir.path().join("garbage.toml");
    fs::write(&garbage, "max_name_chars = \"many\"").unwrap();
    assert!(matches!(
        RenameConfig::load(&garbage),
        Err(ConfigError::Parse { .. })
    ));

    let zero = dir.path().join("zero.toml");
    fs::write(&zero, "max_name_chars = 0").unwrap();
    assert!(matches!(
        RenameConfig::load(&zero),
        Err(ConfigError::Invalid { .. })
    ));
}

#[test]
fn test_config_explicit_path_wins() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("relabel.toml");
    fs::write(&path, "max_name_chars = 12").unwrap();

    let config = RenameConfig::load_or_default(Some(&path)).unwrap();
    assert_eq!(config.max_name_chars, 12);
}
