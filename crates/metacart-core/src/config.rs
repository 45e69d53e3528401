//! Configuration schema (metacart.toml)

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Target warehouse SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Microsoft SQL Server
    SqlServer,

    /// Oracle Database
    Oracle,

    /// Snowflake
    Snowflake,

    /// Databricks (Spark SQL)
    Databricks,

    /// MySQL / MariaDB
    Mysql,

    /// PostgreSQL
    Postgres,
}

impl Dialect {
    /// All supported dialects, in declaration order
    pub const ALL: [Dialect; 6] = [
        Dialect::SqlServer,
        Dialect::Oracle,
        Dialect::Snowflake,
        Dialect::Databricks,
        Dialect::Mysql,
        Dialect::Postgres,
    ];

    /// Lowercase name as it appears in config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "sqlserver",
            Dialect::Oracle => "oracle",
            Dialect::Snowflake => "snowflake",
            Dialect::Databricks => "databricks",
            Dialect::Mysql => "mysql",
            Dialect::Postgres => "postgres",
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlserver" => Ok(Dialect::SqlServer),
            "oracle" => Ok(Dialect::Oracle),
            "snowflake" => Ok(Dialect::Snowflake),
            "databricks" => Ok(Dialect::Databricks),
            "mysql" => Ok(Dialect::Mysql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            _ => Err(format!(
                "Unknown db_type: {}. Supported: sqlserver, oracle, snowflake, databricks, mysql, postgres.",
                s
            )),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Catalog service connection settings (`[idmc]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdmcSection {
    /// Login username
    pub username: String,

    /// Login password
    pub password: String,

    /// Tenant pod identifier, used to build the service hostname
    pub pod: String,

    /// Opaque knowledge query forwarded to the export endpoint
    pub query: String,

    /// Base name requested for the export artifact
    pub export_filename: String,
}

/// Warehouse connection settings (`[database]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Target dialect
    pub db_type: Dialect,

    /// Driver connection string (everything but credentials)
    pub url: String,

    /// Database user
    pub user: String,

    /// Database password
    pub password: String,

    /// Target schema; unqualified table names when absent
    #[serde(default)]
    pub schema: Option<String>,

    /// Truncate existing tables once per run before appending
    #[serde(default)]
    pub truncate_table: bool,

    /// Drop and recreate existing tables once per run
    #[serde(default)]
    pub drop_table: bool,
}

/// Application settings (`[app]`)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppSection {
    /// Base input path without extension; the loader picks the newer of
    /// `{input_path}.zip` and `{input_path}.xlsx`
    #[serde(default)]
    pub input_path: Option<String>,

    /// Echo generated SQL at debug level
    #[serde(default)]
    pub debug: bool,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Catalog export settings, required by the export pipeline
    #[serde(default)]
    pub idmc: Option<IdmcSection>,

    /// Warehouse settings, required by the load pipeline
    #[serde(default)]
    pub database: Option<DatabaseSection>,

    /// Application settings
    #[serde(default)]
    pub app: AppSection,
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Load config from a TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// The `[idmc]` section, or an error naming it
    pub fn idmc(&self) -> Result<&IdmcSection, ConfigError> {
        self.idmc
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSection("idmc".to_string()))
    }

    /// The `[database]` section, or an error naming it
    pub fn database(&self) -> Result<&DatabaseSection, ConfigError> {
        self.database
            .as_ref()
            .ok_or_else(|| ConfigError::MissingSection("database".to_string()))
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Missing [{0}] section in config file")]
    MissingSection(String),
}
