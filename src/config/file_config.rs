use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub table_prefix: Option<String>,
    pub db_user: Option<String>,
    pub db_name: Option<String>,
    pub timezone: Option<String>,

    // Feature configs
    pub scheduler: Option<SchedulerConfig>,
    pub mysql: Option<MySqlConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Set to false to run as if no job scheduler were installed.
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct MySqlConfig {
    /// Appended to MySQL CREATE TABLE statements,
    /// e.g. "DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_unicode_520_ci"
    pub charset_collate: Option<String>,
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
    use tempfile::TempDir;

    #[test]
    fn test_load_full_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("installer.toml");
        std::fs::write(
            &path,
            r#"
db_path = "/var/lib/shop/shop.db"
table_prefix = "shop_"
db_user = "shop"
timezone = "Europe/Rome"

[scheduler]
enabled = false

[mysql]
charset_collate = "DEFAULT CHARACTER SET utf8mb4"
"#,
        )
        .unwrap();

        let config = FileConfig::load(&path).unwrap();
        assert_eq!(config.db_path.as_deref(), Some("/var/lib/shop/shop.db"));
        assert_eq!(config.table_prefix.as_deref(), Some("shop_"));
        assert_eq!(config.db_user.as_deref(), Some("shop"));
        assert!(config.db_name.is_none());
        assert_eq!(config.timezone.as_deref(), Some("Europe/Rome"));
        assert_eq!(config.scheduler.unwrap().enabled, Some(false));
        assert_eq!(
            config.mysql.unwrap().charset_collate.as_deref(),
            Some("DEFAULT CHARACTER SET utf8mb4")
        );
    }

    #[test]
    fn test_load_rejects_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "table_prefix = [").unwrap();

        let err = FileConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = FileConfig::load(Path::new("/nonexistent/installer.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
