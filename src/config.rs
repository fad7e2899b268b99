//! Optional config file loading. Search order: ./grscrape.toml, then
//! $XDG_CONFIG_HOME/grscrape/config.toml (or ~/.config/grscrape/config.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Site root (default https://www.goodreads.com).
    pub base_url: Option<String>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds before each request (fractions allowed; default 0).
    pub request_delay_secs: Option<f64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Number of HTTP attempts for transient failures (default 1, no retry).
    pub retry_count: Option<u32>,
    /// Delay in seconds before each retry (e.g. [1, 2, 4]). Exponential when not set.
    pub retry_backoff_secs: Option<Vec<u64>>,
    /// Log one line per fetched page.
    pub verbose: Option<bool>,
    /// Times an empty listing page is fetched again before it ends the listing (default 0).
    pub empty_page_retries: Option<u32>,
    /// Transliterate output records to ASCII.
    pub ascii: Option<bool>,
}

fn search_paths() -> Result<Vec<PathBuf>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("grscrape.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("grscrape").join("config.toml"));
    }
    Ok(paths)
}

/// Search order: (1) ./grscrape.toml, (2) $XDG_CONFIG_HOME/grscrape/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    for path in &search_paths()? {
        if path.exists() {
            return load_config_from(path).map(Some);
        }
    }
    Ok(None)
}

/// Read and parse one config file.
pub fn load_config_from(path: &Path) -> Result<Config, String> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
    toml::from_str(&s).map_err(|e| format!("Invalid config {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.base_url.is_none());
        assert!(c.user_agent.is_none());
        assert!(c.request_delay_secs.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.retry_count.is_none());
        assert!(c.retry_backoff_secs.is_none());
        assert!(c.verbose.is_none());
        assert!(c.empty_page_retries.is_none());
        assert!(c.ascii.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            base_url = "https://mirror.test"
            user_agent = "Custom/1.0"
            request_delay_secs = 0.5
            timeout_secs = 60
            retry_count = 3
            retry_backoff_secs = [1, 2]
            verbose = true
            empty_page_retries = 1
            ascii = true
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.base_url.as_deref(), Some("https://mirror.test"));
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.request_delay_secs, Some(0.5));
        assert_eq!(c.timeout_secs, Some(60));
        assert_eq!(c.retry_count, Some(3));
        assert_eq!(c.retry_backoff_secs.as_deref(), Some([1, 2].as_slice()));
        assert_eq!(c.verbose, Some(true));
        assert_eq!(c.empty_page_retries, Some(1));
        assert_eq!(c.ascii, Some(true));
    }

    #[test]
    fn integer_delay_is_accepted() {
        let c: Config = toml::from_str("request_delay_secs = 2").unwrap();
        assert_eq!(c.request_delay_secs, Some(2.0));
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("base_url = [").is_err());
    }

    #[test]
    fn load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = 5\nascii = false").unwrap();
        let c = load_config_from(file.path()).unwrap();
        assert_eq!(c.timeout_secs, Some(5));
        assert_eq!(c.ascii, Some(false));
    }

    #[test]
    fn load_config_from_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grscrape.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").unwrap();
        let err = load_config_from(&path).unwrap_err();
        assert!(err.contains("grscrape.toml"));
        let missing = load_config_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(missing.starts_with("Cannot read config"));
    }
}
