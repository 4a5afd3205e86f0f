use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitoringConfig {
    /// Explicit mountpoint allow-list, semicolon-separated. Empty means
    /// "classify and deduplicate the full partition table".
    #[serde(default)]
    pub include_mountpoints: String,
    /// Count cache/buffers as used memory (total - free).
    #[serde(default)]
    pub memory_include_cache: bool,
    /// Always report the htop-like used figure, even off Linux.
    #[serde(default)]
    pub memory_report_raw_used: bool,
}

impl MonitoringConfig {
    /// Allow-list entries, trimmed, empties dropped.
    pub fn mountpoint_allowlist(&self) -> Vec<&str> {
        self.include_mountpoints
            .split(';')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .collect()
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for mountpoint in self.monitoring.mountpoint_allowlist() {
            anyhow::ensure!(
                mountpoint.starts_with('/'),
                "monitoring.include_mountpoints entries must be absolute paths, got {:?}",
                mountpoint
            );
        }
        Ok(())
    }
}
