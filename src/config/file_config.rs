use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub admin_api_key: Option<String>,
    pub allowed_origin: Option<String>,

    // Scraping
    pub scrape_interval_hours: Option<u64>,
    pub force_initial_scrape: Option<bool>,
    pub recent_logs_limit: Option<usize>,

    /// Feed jobs, keyed by source (`[sources.franchise]`).
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub label: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 4000
admin_api_key = "s3cret"
scrape_interval_hours = 12

[sources.franchise]
url = "https://feeds.example.com/franchises.json"
label = "Franchises"

[sources.doroob]
url = "https://feeds.example.com/courses.json"
timeout_sec = 120
"#
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();

        assert_eq!(config.port, Some(4000));
        assert_eq!(config.admin_api_key.as_deref(), Some("s3cret"));
        assert_eq!(config.scrape_interval_hours, Some(12));
        assert!(config.db_dir.is_none());
        assert_eq!(config.sources.len(), 2);
        assert_eq!(
            config.sources["franchise"].label.as_deref(),
            Some("Franchises")
        );
        assert_eq!(config.sources["doroob"].timeout_sec, Some(120));
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
