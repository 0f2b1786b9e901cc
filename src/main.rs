use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reserved_stock_installer::config::{AppConfig, CliConfig, FileConfig};
use reserved_stock_installer::schema::{RESERVED_STOCK_TABLE, SCHEMA_VERSION_OPTION};
use reserved_stock_installer::sqlite_persistence::{DdlDialect, MySqlDialect, SqliteDialect};
use reserved_stock_installer::{
    Installer, JobOutcome, NoticeQueue, ProvisionReport, SettingsStore, SqliteDatabase,
    SqliteHostStore, TableOutcome,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database holding the host tables and the reserved stock table.
    #[clap(value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Values in it override command line options.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Prefix prepended to the reserved stock table name.
    #[clap(long)]
    pub table_prefix: Option<String>,

    /// Database user named in diagnostics.
    #[clap(long)]
    pub db_user: Option<String>,

    /// Database name named in diagnostics (defaults to the file stem).
    #[clap(long)]
    pub db_name: Option<String>,

    /// IANA timezone whose midnight anchors the first cleanup run.
    #[clap(long)]
    pub timezone: Option<String>,

    /// Run as if no job scheduler were installed.
    #[clap(long)]
    pub no_scheduler: bool,

    /// Open the database read-only for DDL, as a user without CREATE privileges.
    #[clap(long)]
    pub read_only: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Ensure the table and the recurring job exist (default).
    Provision {
        /// Print the provisioning report as JSON on stdout.
        #[clap(long)]
        json: bool,
    },

    /// Print the CREATE statement for the reserved stock table.
    Ddl {
        #[clap(long, value_enum, default_value_t = Dialect::Sqlite)]
        dialect: Dialect,
    },

    /// Forget the stored schema version so the next run verifies the table again.
    ResetSchemaVersion,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Sqlite,
    Mysql,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_path: self.db_path.clone(),
            table_prefix: self.table_prefix.clone(),
            db_user: self.db_user.clone(),
            db_name: self.db_name.clone(),
            timezone: self.timezone.clone(),
            no_scheduler: self.no_scheduler,
            read_only: self.read_only,
        }
    }
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    match cli_args
        .command
        .clone()
        .unwrap_or(Command::Provision { json: false })
    {
        Command::Provision { json } => provision(&config, json),
        Command::Ddl { dialect } => {
            println!("{}", render_ddl(&config, dialect));
            Ok(())
        }
        Command::ResetSchemaVersion => {
            let host_store = SqliteHostStore::new(&config.db_path)?;
            host_store.delete_option(SCHEMA_VERSION_OPTION)?;
            info!("Stored schema version cleared");
            Ok(())
        }
    }
}

fn provision(config: &AppConfig, json: bool) -> Result<()> {
    let host_store = Arc::new(SqliteHostStore::new(&config.db_path)?);
    let database = Arc::new(SqliteDatabase::open(
        &config.db_path,
        config.database_info(),
        config.read_only,
    )?);
    let notices = Arc::new(NoticeQueue::new());

    let mut installer = Installer::new(host_store.clone(), database, notices.clone())
        .with_timezone(config.timezone);
    if config.scheduler_enabled {
        installer = installer.with_scheduler(host_store);
    }

    info!(
        "Provisioning {:?} (target schema version {})",
        config.db_path,
        installer.schema_version()
    );
    let report = installer.ensure_provisioned();
    log_report(&report);

    for notice in notices.drain() {
        eprintln!("[{}] {}", notice.level.as_str(), notice.message);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

fn log_report(report: &ProvisionReport) {
    match &report.table {
        TableOutcome::SkippedNewerSchema { stored, target } => {
            info!(
                "Stored schema version {} is ahead of {}, table left untouched",
                stored, target
            );
        }
        TableOutcome::VersionUnreadable { error } => {
            warn!("Stored schema version unreadable, table left untouched: {}", error);
        }
        TableOutcome::Verified {
            table_name,
            created,
            version_recorded,
        } => {
            if *created {
                info!("Created table {}", table_name);
            } else {
                info!("Table {} already present", table_name);
            }
            if !version_recorded {
                warn!("Schema version was not recorded, the table will be checked again next run");
            }
        }
        TableOutcome::CreationFailed { table_name } => {
            error!("Table {} could not be created", table_name);
        }
    }

    match &report.job {
        JobOutcome::SchedulerUnavailable => info!("No job scheduler available, skipping job"),
        JobOutcome::AlreadyScheduled {
            job_name,
            next_run_at,
        } => info!("Job {} already scheduled, next run at {}", job_name, next_run_at),
        JobOutcome::Scheduled {
            job_name,
            first_run_at,
            interval_secs,
        } => info!(
            "Job {} scheduled every {}s starting {}",
            job_name, interval_secs, first_run_at
        ),
        JobOutcome::Failed { job_name, error } => {
            error!("Job {} could not be scheduled: {}", job_name, error)
        }
    }
}

fn render_ddl(config: &AppConfig, dialect: Dialect) -> String {
    let table_name = config.database_info().table_name(&RESERVED_STOCK_TABLE);
    match dialect {
        Dialect::Sqlite => SqliteDialect.create_table_sql(&table_name, &RESERVED_STOCK_TABLE),
        Dialect::Mysql => MySqlDialect {
            charset_collate: config.mysql_charset_collate.clone(),
        }
        .create_table_sql(&table_name, &RESERVED_STOCK_TABLE),
    }
}
