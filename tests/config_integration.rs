use std::io::Write;
use structer::{StructerConfig, StructerError, WalkLimits};

#[test]
fn test_config_defaults() {
    let config = StructerConfig::default();

    assert_eq!(config.io.max_file_size, 64 * 1024 * 1024 * 1024);
    assert_eq!(config.limits.max_link_map_entries, 4096);
    assert_eq!(config.limits.max_notes, 65536);
    assert_eq!(config.limits.max_archive_members, 1_000_000);
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"io": {{"max_file_size": 4096}}, "limits": {{"max_notes": 16}}}}"#
    )
    .unwrap();

    let config = StructerConfig::load(file.path()).unwrap();
    assert_eq!(config.io.max_file_size, 4096);
    assert_eq!(
        config.limits,
        WalkLimits {
            max_notes: 16,
            ..WalkLimits::default()
        }
    );
}

#[test]
fn test_load_errors() {
    let err = StructerConfig::load("/nonexistent/structer.json").unwrap_err();
    assert!(matches!(err, StructerError::Io(_)));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{\"limits\": 3}").unwrap();
    let err = StructerConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, StructerError::Config(_)));
}
