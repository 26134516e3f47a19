//! Server configuration (spec §10 "Configuration").
//!
//! Reads environment variables with fallbacks, in the same precedence style
//! the teacher uses for its data directory: an explicit override first, then
//! a sensible default for local development.

use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ENGINE_SCRIPT_FLAG: &str = "--analyze";
const DEFAULT_SOURCE_BASE_URL: &str = "https://www.gridgammon.com";

/// Where the sqlite database, temp files, and other runtime state live.
///
/// Priority: `GAMMONQUIZ_DATA_DIR` env var, else `./data`.
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("GAMMONQUIZ_DATA_DIR") {
        return PathBuf::from(dir);
    }
    PathBuf::from(DEFAULT_DATA_DIR)
}

/// Priority: `GAMMONQUIZ_DB_PATH` env var, else `<data_dir>/gammonquiz.db`.
pub fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("GAMMONQUIZ_DB_PATH") {
        return PathBuf::from(path);
    }
    get_data_dir().join("gammonquiz.db")
}

/// The analysis engine executable (spec §6 "Engine process contract").
/// `None` means unconfigured, which the engine driver treats as
/// `engineAvailable: false` for every position.
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var("GAMMONQUIZ_ENGINE_PATH")
        .ok()
        .map(PathBuf::from)
}

/// The flag passed to the engine executable to run its bundled analysis
/// script (spec §4.3 "Invocation").
pub fn get_engine_script_flag() -> String {
    std::env::var("GAMMONQUIZ_ENGINE_SCRIPT").unwrap_or_else(|_| DEFAULT_ENGINE_SCRIPT_FLAG.to_string())
}

/// The socket address the HTTP surface binds to.
pub fn get_bind_addr() -> String {
    std::env::var("GAMMONQUIZ_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
}

/// Base URL of the source site the crawl client authenticates against
/// (spec §4.9 "Crawl client").
pub fn get_source_base_url() -> String {
    std::env::var("GAMMONQUIZ_SOURCE_BASE_URL").unwrap_or_else(|_| DEFAULT_SOURCE_BASE_URL.to_string())
}

/// Per-ply equity-lag threshold below which a mistake is not recorded,
/// unless a user's stored `threshold` overrides it (spec §4.6).
pub fn get_default_threshold() -> f64 {
    std::env::var("GAMMONQUIZ_THRESHOLD")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0.08)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_falls_back_when_unset() {
        // Note: assumes GAMMONQUIZ_DATA_DIR is not set in the test environment.
        let dir = get_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn db_path_is_nested_under_data_dir_by_default() {
        let path = get_db_path();
        assert!(path.to_string_lossy().ends_with("gammonquiz.db"));
    }

    #[test]
    fn default_threshold_matches_spec_example() {
        assert!((get_default_threshold() - 0.08).abs() < 1e-9);
    }
}
