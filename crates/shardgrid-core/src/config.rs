//! shardgrid.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardgridConfig {
    pub topo: TopoConfig,
    pub wrangler: WranglerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopoConfig {
    /// On-disk topology database. `None` keeps the topology in memory.
    pub path: Option<PathBuf>,
    /// Cells registered when the topology is first opened.
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WranglerConfig {
    /// Upper bound for a whole operator command (e.g. "30s").
    pub action_timeout: String,
    /// Upper bound for a single call into a tablet.
    pub remote_timeout: String,
    /// Delay between attempts to reach an unresponsive tablet.
    pub tablet_retry_delay: String,
    pub tablet_retry_attempts: u32,
}

impl Default for TopoConfig {
    fn default() -> Self {
        Self {
            path: None,
            cells: vec!["cell1".to_string()],
        }
    }
}

impl Default for WranglerConfig {
    fn default() -> Self {
        Self {
            action_timeout: "30s".to_string(),
            remote_timeout: "5s".to_string(),
            tablet_retry_delay: "100ms".to_string(),
            tablet_retry_attempts: 3,
        }
    }
}

impl WranglerConfig {
    pub fn action_timeout(&self) -> Duration {
        parse_duration(&self.action_timeout).unwrap_or(Duration::from_secs(30))
    }

    pub fn remote_timeout(&self) -> Duration {
        parse_duration(&self.remote_timeout).unwrap_or(Duration::from_secs(5))
    }

    pub fn tablet_retry_delay(&self) -> Duration {
        parse_duration(&self.tablet_retry_delay).unwrap_or(Duration::from_millis(100))
    }

    /// Reject duration strings the accessors would otherwise replace with
    /// their defaults.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (key, value) in [
            ("action_timeout", &self.action_timeout),
            ("remote_timeout", &self.remote_timeout),
            ("tablet_retry_delay", &self.tablet_retry_delay),
        ] {
            if parse_duration(value).is_none() {
                anyhow::bail!("wrangler.{key}: invalid duration {value:?}");
            }
        }
        Ok(())
    }
}

impl ShardgridConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ShardgridConfig = toml::from_str(&content)?;
        config
            .wrangler
            .validate()
            .map_err(|e| anyhow::anyhow!("{}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Parse a human duration such as `"250ms"`, `"5s"` or `"2m"`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| Duration::from_secs(m * 60))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full() {
        let toml_str = r#"
[topo]
path = "/tmp/topo.redb"
cells = ["cell1", "cell2"]

[wrangler]
action_timeout = "10s"
remote_timeout = "500ms"
tablet_retry_delay = "5ms"
tablet_retry_attempts = 7
"#;
        let config: ShardgridConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.topo.path, Some(PathBuf::from("/tmp/topo.redb")));
        assert_eq!(config.topo.cells, vec!["cell1", "cell2"]);
        assert_eq!(config.wrangler.action_timeout(), Duration::from_secs(10));
        assert_eq!(config.wrangler.remote_timeout(), Duration::from_millis(500));
        assert_eq!(config.wrangler.tablet_retry_delay(), Duration::from_millis(5));
        assert_eq!(config.wrangler.tablet_retry_attempts, 7);
    }

    #[test]
    fn test_parse_empty_uses_defaults() {
        let config: ShardgridConfig = toml::from_str("").unwrap();
        assert!(config.topo.path.is_none());
        assert_eq!(config.topo.cells, vec!["cell1"]);
        assert_eq!(config.wrangler.tablet_retry_attempts, 3);
        assert_eq!(config.wrangler.action_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = ShardgridConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("tablet_retry_delay"));
        let parsed: ShardgridConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.wrangler.remote_timeout, "5s");
    }

    #[test]
    fn parse_duration_values() {
        assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("3m"), Some(Duration::from_secs(180)));
        assert_eq!(parse_duration("soon"), None);
    }

    #[test]
    fn from_file_rejects_bad_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shardgrid.toml");
        std::fs::write(&path, "[wrangler]\naction_timeout = \"soon\"\n").unwrap();

        let err = ShardgridConfig::from_file(&path).unwrap_err().to_string();
        assert!(err.contains("wrangler.action_timeout"), "{err}");
        assert!(err.contains("\"soon\""), "{err}");
    }

    #[test]
    fn from_file_accepts_valid_durations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shardgrid.toml");
        std::fs::write(&path, "[wrangler]\nremote_timeout = \"250ms\"\n").unwrap();

        let config = ShardgridConfig::from_file(&path).unwrap();
        assert_eq!(config.wrangler.remote_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn bad_duration_falls_back() {
        let config = WranglerConfig {
            remote_timeout: "whenever".to_string(),
            ..WranglerConfig::default()
        };
        assert_eq!(config.remote_timeout(), Duration::from_secs(5));
    }
}
