use std::path::PathBuf;
use std::time::Duration;

pub const DATA_DIR_ENV: &str = "MINDMATCH_DATA_DIR";
const APP_DIR_NAME: &str = "mindmatch";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTimings {
    pub start_delay: Duration,
    pub mismatch_delay: Duration,
    pub tick_interval: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        SessionTimings {
            start_delay: Duration::from_millis(100),
            mismatch_delay: Duration::from_secs(1),
            tick_interval: Duration::from_secs(1),
        }
    }
}

impl SessionTimings {
    pub fn immediate() -> Self {
        SessionTimings {
            start_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub timings: SessionTimings,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var_os(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        AppConfig {
            data_dir,
            timings: SessionTimings::default(),
        }
    }
}

#[cfg(feature = "glib")]
pub fn default_data_dir() -> PathBuf {
    glib::user_config_dir().join(APP_DIR_NAME)
}

#[cfg(not(feature = "glib"))]
pub fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".config").join(APP_DIR_NAME),
        None => PathBuf::from(".").join(APP_DIR_NAME),
    }
}
