use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "PocketScan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Key-value entry holding the recent documents list (JSON array).
pub const RECENT_KEY: &str = "recentFiles";
/// Key-value entry holding the favourites list (JSON array).
pub const FAVOURITES_KEY: &str = "favourites";
/// Secure-store entry holding the premium flag.
pub const PREMIUM_KEY: &str = "isPremium";

/// Maximum number of entries kept in the recent list.
pub const RECENT_CAPACITY: usize = 10;

/// Environment override for the data directory.
pub const DATA_DIR_ENV: &str = "POCKETSCAN_DATA_DIR";
/// Environment override for the recent list capacity.
pub const RECENT_CAPACITY_ENV: &str = "POCKETSCAN_RECENT_CAPACITY";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "pocketscan_lib=info,warn"
}

/// Get the application data directory.
/// Falls back to the current directory when no home directory is known
/// (some embedded targets).
pub fn app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Runtime configuration for the document library.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryConfig {
    pub data_dir: PathBuf,
    pub recent_capacity: usize,
}

impl LibraryConfig {
    /// Build from the environment, falling back to defaults.
    /// An unparsable or zero capacity is ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(raw) = std::env::var(RECENT_CAPACITY_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.recent_capacity = n,
                _ => tracing::warn!(value = %raw, "Ignoring invalid recent capacity override"),
            }
        }
        config
    }

    /// Config rooted at an explicit directory (tests, embedding shells).
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            recent_capacity: RECENT_CAPACITY,
        }
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    pub fn kv_store_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }

    pub fn secure_store_path(&self) -> PathBuf {
        self.data_dir.join("secure.json")
    }

    pub fn device_key_path(&self) -> PathBuf {
        self.data_dir.join("device.key")
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            data_dir: app_data_dir(),
            recent_capacity: RECENT_CAPACITY,
        }
    }
}
