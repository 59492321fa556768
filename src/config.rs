use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Delay between the end of one refresh cycle and the start of the
    /// next, in milliseconds.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Optional CORS-bypass proxy endpoint to route every fetch through.
    pub proxy: Option<String>,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

fn default_refresh_interval_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub url: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_refresh_interval() {
        assert_eq!(default_refresh_interval_ms(), 5000);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            refresh_interval_ms = 10000
            proxy = "https://allorigins.example/get"

            [[feeds]]
            url = "https://example.com/feed.xml"

            [[feeds]]
            url = "https://example.org/rss"
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.refresh_interval_ms, 10000);
        assert_eq!(
            config.proxy.as_deref(),
            Some("https://allorigins.example/get")
        );
        assert_eq!(config.feeds.len(), 2);
        assert_eq!(config.feeds[0].url, "https://example.com/feed.xml");
        assert_eq!(config.feeds[1].url, "https://example.org/rss");
    }

    #[test]
    fn test_defaults_when_fields_absent() {
        let config = Config::from_str("").unwrap();

        assert_eq!(config.refresh_interval_ms, 5000);
        assert!(config.proxy.is_none());
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_required_fields() {
        let content = r#"
            [[feeds]]
            # Missing url field
        "#;

        let result = Config::from_str(content);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_feeds_list() {
        let content = "feeds = []";

        let config = Config::from_str(content).unwrap();
        assert!(config.feeds.is_empty());
    }
}
