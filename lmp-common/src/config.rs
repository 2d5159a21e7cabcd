//! Configuration loading and root folder resolution
//!
//! Bootstrap settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing config file is not an error. A malformed one is logged and
//! ignored so the server still starts with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 3000;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "LMP_CONFIG";

/// Environment variable overriding the data (root) folder
pub const ROOT_FOLDER_ENV_VAR: &str = "LMP_ROOT_FOLDER";

/// Environment variables overriding the port, checked in order
pub const PORT_ENV_VARS: [&str; 2] = ["LMP_PORT", "PORT"];

/// Playlist store file name inside the root folder
pub const PLAYLISTS_FILE: &str = "playlists.json";

/// Local music folder name inside the root folder
pub const LOCAL_MUSIC_DIR: &str = "music";

const EMPTY_PLAYLISTS_DOC: &str = "{\n  \"playlists\": []\n}\n";

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
}

/// Bluetooth tool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BluetoothConfig {
    /// `bluetoothctl` executable
    pub bluetoothctl: String,
    /// `rfkill` executable
    pub rfkill: String,
    /// Run rfkill through sudo
    pub use_sudo: bool,
    /// Discovery duration in seconds
    pub scan_seconds: u64,
    /// Discovered devices older than this are no longer "available"
    pub device_ttl_seconds: u64,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            bluetoothctl: "bluetoothctl".to_string(),
            rfkill: "rfkill".to_string(),
            use_sudo: false,
            scan_seconds: 20,
            device_ttl_seconds: 30,
        }
    }
}

/// Settings read from the TOML config file
///
/// Every field is optional; unset fields fall through to compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub music_dirs: Option<Vec<PathBuf>>,
    pub restrict_paths: Option<bool>,
    pub audio_extensions: Option<Vec<String>>,
    pub logging: LoggingConfig,
    pub bluetooth: BluetoothConfig,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Locate the config file for this platform
    ///
    /// `$LMP_CONFIG` wins; otherwise `~/.config/lmp/config.toml`, then
    /// `/etc/lmp/config.toml` on Linux.
    pub fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        let user_config = dirs::config_dir().map(|d| d.join("lmp").join("config.toml"));
        if let Some(path) = user_config {
            if path.exists() {
                return Some(path);
            }
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/lmp/config.toml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load the discovered (or given) config file, falling back to defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Self {
        let path = match explicit.map(Path::to_path_buf).or_else(Self::discover) {
            Some(path) => path,
            None => {
                info!("No config file found, using defaults");
                return Self::default();
            }
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file: {}", e);
                Self::default()
            }
        }
    }
}

/// OS-dependent compiled defaults
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    pub music_dirs: Vec<PathBuf>,
    pub audio_extensions: Vec<String>,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("lmp"))
            .unwrap_or_else(|| PathBuf::from("./lmp_data"));

        let user_music = dirs::audio_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
            .unwrap_or_else(|| PathBuf::from("./Music"));

        let mut music_dirs = Vec::new();
        if cfg!(target_os = "linux") {
            // USB drives and external storage
            music_dirs.push(PathBuf::from("/media"));
        }
        music_dirs.push(user_music);

        Self {
            root_folder,
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            music_dirs,
            audio_extensions: ["mp3", "flac", "ogg", "wav", "m4a", "aac", "opus"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            log_level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub music_dirs: Vec<PathBuf>,
    pub log_level: Option<String>,
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub root_folder: PathBuf,
    pub bind: String,
    pub port: u16,
    /// Browsable music folders, local music folder always last
    pub music_dirs: Vec<PathBuf>,
    pub restrict_paths: bool,
    /// Lowercase extensions without the leading dot
    pub audio_extensions: Vec<String>,
    pub log_level: String,
    pub bluetooth: BluetoothConfig,
}

impl Settings {
    /// Merge CLI, environment, TOML and compiled defaults
    pub fn resolve(cli: CliOverrides, toml: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder = cli
            .root_folder
            .or_else(|| std::env::var(ROOT_FOLDER_ENV_VAR).ok().map(PathBuf::from))
            .or(toml.root_folder)
            .unwrap_or(defaults.root_folder);

        let port = cli
            .port
            .or_else(port_from_env)
            .or(toml.port)
            .unwrap_or(defaults.port);

        let bind = cli.bind.or(toml.bind).unwrap_or(defaults.bind);

        let mut music_dirs = if !cli.music_dirs.is_empty() {
            cli.music_dirs
        } else {
            toml.music_dirs.unwrap_or(defaults.music_dirs)
        };
        let local_music = root_folder.join(LOCAL_MUSIC_DIR);
        if !music_dirs.contains(&local_music) {
            music_dirs.push(local_music);
        }

        let audio_extensions = toml
            .audio_extensions
            .unwrap_or(defaults.audio_extensions)
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        let log_level = cli
            .log_level
            .or(toml.logging.level)
            .unwrap_or(defaults.log_level);

        Self {
            root_folder,
            bind,
            port,
            music_dirs,
            restrict_paths: toml.restrict_paths.unwrap_or(true),
            audio_extensions,
            log_level,
            bluetooth: toml.bluetooth,
        }
    }

    /// Path of the JSON playlist store
    pub fn playlists_path(&self) -> PathBuf {
        self.root_folder.join(PLAYLISTS_FILE)
    }

    /// Listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid bind address {}: {}", self.bind, e)))
    }
}

fn port_from_env() -> Option<u16> {
    PORT_ENV_VARS.iter().find_map(|name| {
        let value = std::env::var(name).ok()?;
        match value.parse() {
            Ok(port) => Some(port),
            Err(_) => {
                warn!("Ignoring {}={}: not a valid port", name, value);
                None
            }
        }
    })
}

/// Creates the root folder layout on first start
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root folder, local music folder and an empty playlist store
    pub fn ensure_layout(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.root_folder.join(LOCAL_MUSIC_DIR))?;

        let playlists = self.playlists_path();
        if !playlists.exists() {
            std::fs::write(&playlists, EMPTY_PLAYLISTS_DOC)?;
            info!("Created playlist store {}", playlists.display());
        }
        Ok(())
    }

    pub fn playlists_path(&self) -> PathBuf {
        self.root_folder.join(PLAYLISTS_FILE)
    }
}
