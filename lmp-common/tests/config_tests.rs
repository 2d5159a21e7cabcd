//! Tests for configuration resolution and first-start layout
//!
//! Uses serial_test: tests that touch LMP_* / PORT environment variables
//! are marked #[serial] so they never run concurrently.

use lmp_common::config::{
    BluetoothConfig, CliOverrides, CompiledDefaults, RootFolderInitializer, Settings, TomlConfig,
    DEFAULT_PORT, PLAYLISTS_FILE,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var("LMP_ROOT_FOLDER");
    env::remove_var("LMP_PORT");
    env::remove_var("PORT");
    env::remove_var("LMP_CONFIG");
}

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();

    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.port, DEFAULT_PORT);
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.audio_extensions.contains(&"mp3".to_string()));
    assert!(!defaults.music_dirs.is_empty());

    #[cfg(target_os = "linux")]
    assert_eq!(defaults.music_dirs[0], PathBuf::from("/media"));
}

#[test]
#[serial]
fn test_resolve_with_no_overrides_uses_defaults() {
    clear_env();

    let settings = Settings::resolve(CliOverrides::default(), TomlConfig::default());
    let defaults = CompiledDefaults::for_current_platform();

    assert_eq!(settings.root_folder, defaults.root_folder);
    assert_eq!(settings.port, DEFAULT_PORT);
    assert_eq!(settings.bind, "0.0.0.0");
    assert!(settings.restrict_paths);
    assert_eq!(settings.bluetooth, BluetoothConfig::default());
    // Local music folder is always browsable
    assert_eq!(
        settings.music_dirs.last(),
        Some(&defaults.root_folder.join("music"))
    );
}

#[test]
#[serial]
fn test_cli_beats_env_beats_toml() {
    clear_env();
    env::set_var("LMP_ROOT_FOLDER", "/tmp/lmp-from-env");
    env::set_var("LMP_PORT", "4100");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/lmp-from-toml")),
        port: Some(4200),
        ..TomlConfig::default()
    };

    let from_env = Settings::resolve(CliOverrides::default(), toml.clone());
    assert_eq!(from_env.root_folder, PathBuf::from("/tmp/lmp-from-env"));
    assert_eq!(from_env.port, 4100);

    let cli = CliOverrides {
        root_folder: Some(PathBuf::from("/tmp/lmp-from-cli")),
        port: Some(4300),
        ..CliOverrides::default()
    };
    let from_cli = Settings::resolve(cli, toml.clone());
    assert_eq!(from_cli.root_folder, PathBuf::from("/tmp/lmp-from-cli"));
    assert_eq!(from_cli.port, 4300);

    clear_env();
    let from_toml = Settings::resolve(CliOverrides::default(), toml);
    assert_eq!(from_toml.root_folder, PathBuf::from("/tmp/lmp-from-toml"));
    assert_eq!(from_toml.port, 4200);
}

#[test]
#[serial]
fn test_invalid_port_env_is_ignored() {
    clear_env();
    env::set_var("PORT", "not-a-port");

    let settings = Settings::resolve(CliOverrides::default(), TomlConfig::default());
    assert_eq!(settings.port, DEFAULT_PORT);

    clear_env();
}

#[test]
#[serial]
fn test_audio_extensions_are_normalized() {
    clear_env();
    let toml = TomlConfig {
        audio_extensions: Some(vec![".MP3".to_string(), "Flac".to_string(), "".to_string()]),
        ..TomlConfig::default()
    };

    let settings = Settings::resolve(CliOverrides::default(), toml);
    assert_eq!(settings.audio_extensions, vec!["mp3", "flac"]);
}

#[test]
fn test_toml_parsing_partial_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
port = 8080
music_dirs = ["/srv/music"]

[logging]
level = "debug"

[bluetooth]
use_sudo = true
scan_seconds = 10
"#,
    )
    .unwrap();

    let config = TomlConfig::load(&path).unwrap();
    assert_eq!(config.port, Some(8080));
    assert_eq!(config.music_dirs, Some(vec![PathBuf::from("/srv/music")]));
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
    assert!(config.bluetooth.use_sudo);
    assert_eq!(config.bluetooth.scan_seconds, 10);
    // Unspecified bluetooth fields keep their defaults
    assert_eq!(config.bluetooth.bluetoothctl, "bluetoothctl");
    assert_eq!(config.bluetooth.device_ttl_seconds, 30);
}

#[test]
fn test_malformed_toml_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"three thousand\"").unwrap();

    assert!(TomlConfig::load(&path).is_err());
    assert_eq!(TomlConfig::load_or_default(Some(&path)), TomlConfig::default());
}

#[test]
fn test_socket_addr() {
    let settings = Settings {
        bind: "127.0.0.1".to_string(),
        port: 3001,
        ..Settings::resolve(
            CliOverrides {
                root_folder: Some(PathBuf::from("/tmp/lmp")),
                ..CliOverrides::default()
            },
            TomlConfig::default(),
        )
    };
    assert_eq!(settings.socket_addr().unwrap().to_string(), "127.0.0.1:3001");

    let bad = Settings {
        bind: "not an address".to_string(),
        ..settings
    };
    assert!(bad.socket_addr().is_err());
}

#[test]
fn test_initializer_creates_layout_once() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("data");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_layout().unwrap();

    assert!(root.join("music").is_dir());
    let store = root.join(PLAYLISTS_FILE);
    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&store).unwrap()).unwrap();
    assert_eq!(doc["playlists"], serde_json::json!([]));

    // Existing store is left untouched
    std::fs::write(&store, r#"{"playlists":[{"id":"1","name":"Keep","tracks":[]}]}"#).unwrap();
    initializer.ensure_layout().unwrap();
    assert!(std::fs::read_to_string(&store).unwrap().contains("Keep"));
}
