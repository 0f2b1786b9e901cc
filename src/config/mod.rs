mod file_config;

pub use file_config::{FileConfig, MySqlConfig, SchedulerConfig};

use crate::database::DatabaseInfo;
use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;
use std::path::PathBuf;

pub const DEFAULT_TABLE_PREFIX: &str = "wp_";
pub const DEFAULT_DB_USER: &str = "root";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub table_prefix: Option<String>,
    pub db_user: Option<String>,
    pub db_name: Option<String>,
    pub timezone: Option<String>,
    pub no_scheduler: bool,
    pub read_only: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub table_prefix: String,
    pub db_user: String,
    pub db_name: String,
    pub timezone: Tz,
    pub scheduler_enabled: bool,
    pub read_only: bool,
    pub mysql_charset_collate: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .ok_or_else(|| anyhow!("db_path must be specified on the command line or in config file"))?;

        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let table_prefix = file
            .table_prefix
            .or_else(|| cli.table_prefix.clone())
            .unwrap_or_else(|| DEFAULT_TABLE_PREFIX.to_string());
        if !table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            bail!(
                "table_prefix may only contain ASCII letters, digits and underscores: {:?}",
                table_prefix
            );
        }

        let db_user = file
            .db_user
            .or_else(|| cli.db_user.clone())
            .unwrap_or_else(|| DEFAULT_DB_USER.to_string());

        // Default the database name to the file stem, e.g. "shop" for shop.db
        let db_name = file
            .db_name
            .or_else(|| cli.db_name.clone())
            .or_else(|| {
                db_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "main".to_string());

        let timezone = match file.timezone.or_else(|| cli.timezone.clone()) {
            Some(name) => parse_timezone(&name)?,
            None => Tz::UTC,
        };

        let scheduler_enabled = file
            .scheduler
            .and_then(|s| s.enabled)
            .unwrap_or(!cli.no_scheduler);

        let mysql_charset_collate = file.mysql.and_then(|m| m.charset_collate);

        Ok(Self {
            db_path,
            table_prefix,
            db_user,
            db_name,
            timezone,
            scheduler_enabled,
            read_only: cli.read_only,
            mysql_charset_collate,
        })
    }

    pub fn database_info(&self) -> DatabaseInfo {
        DatabaseInfo {
            user: self.db_user.clone(),
            name: self.db_name.clone(),
            table_prefix: self.table_prefix.clone(),
        }
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| anyhow!("Unknown timezone: {}", name))
}
