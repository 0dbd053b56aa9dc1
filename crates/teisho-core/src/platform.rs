use std::path::PathBuf;

const APP_DIR: &str = "teishos";

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/teishos/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

/// Default root for downloaded episodes: `~/teishos`.
pub fn default_target_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
