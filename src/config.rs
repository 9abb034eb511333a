//! Pipeline settings.
//!
//! Layered from built-in defaults, an optional TOML file and `COLLABNETS__*`
//! environment variables (e.g. `COLLABNETS__HOME_COUNTRY=BR`,
//! `COLLABNETS__YEARS__START=2018`).

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::common::read_rows;
use crate::error::{Error, Result};
use crate::mappings::{CS_FIELD_ID, CS_SUBFIELDS};
use crate::merge::MergePolicy;

pub const DEFAULT_CONFIG_NAME: &str = "collabnets";
pub const ENV_PREFIX: &str = "COLLABNETS";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub data_root: PathBuf,
    pub years: YearRange,
    pub summary_years: YearRange,
    pub countries: Vec<String>,
    pub home_country: String,
    pub field_id: u32,
    pub request_delay_ms: u64,
    pub summary_delay_ms: u64,
    pub email_file: PathBuf,
    pub subfield_catalog: Option<PathBuf>,
    pub merge_policy: MergePolicy,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SubfieldEntry {
    #[serde(default)]
    pub subfield_id: Option<String>,
    pub subfield_display_name: String,
}

/// Ordered list of subfields a run iterates over.
#[derive(Debug, Clone, PartialEq)]
pub struct SubfieldCatalog(Vec<SubfieldEntry>);

#[derive(Deserialize)]
struct EmailFile {
    email: Option<String>,
}

impl YearRange {
    /// Ascending, both ends included.
    pub fn years(&self) -> Vec<i32> {
        (self.start..=self.end).collect()
    }
}

impl Settings {
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let file_source = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        let settings: Settings = Config::builder()
            .set_default("data_root", "data")?
            .set_default("years.start", 2015)?
            .set_default("years.end", 2024)?
            .set_default("summary_years.start", 2019)?
            .set_default("summary_years.end", 2024)?
            .set_default("countries", vec!["BR", "CN", "US", "IN"])?
            .set_default("home_country", "BR")?
            .set_default("field_id", i64::from(CS_FIELD_ID))?
            .set_default("request_delay_ms", 2500)?
            .set_default("summary_delay_ms", 1000)?
            .set_default("email_file", "config/email.json")?
            .set_default("merge_policy", "overwrite")?
            .set_default("api_base", "https://api.openalex.org")?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("countries"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for (name, range) in [("years", self.years), ("summary_years", self.summary_years)] {
            if range.start > range.end {
                return Err(ConfigError::Message(format!(
                    "{}: start {} is after end {}",
                    name, range.start, range.end
                ))
                .into());
            }
        }
        if self.home_country.is_empty() {
            return Err(ConfigError::Message("home_country is empty".to_string()).into());
        }
        Ok(())
    }

    pub fn catalog(&self) -> Result<SubfieldCatalog> {
        match &self.subfield_catalog {
            Some(path) => SubfieldCatalog::from_csv(path),
            None => Ok(SubfieldCatalog::builtin()),
        }
    }

    /// Contact address sent along with API requests.
    pub fn mailto(&self) -> Result<String> {
        read_email(&self.email_file)
    }
}

pub fn read_email(path: &Path) -> Result<String> {
    let message = |m: String| Error::Config(ConfigError::Message(m));
    let text = std::fs::read_to_string(path)
        .map_err(|e| message(format!("email file {}: {}", path.display(), e)))?;
    let parsed: EmailFile = serde_json::from_str(&text)
        .map_err(|e| message(format!("invalid JSON in {}: {}", path.display(), e)))?;
    parsed
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| message(format!("email not found in {}", path.display())))
}

impl SubfieldCatalog {
    pub fn builtin() -> Self {
        Self(
            CS_SUBFIELDS
                .iter()
                .map(|(id, name, _)| SubfieldEntry {
                    subfield_id: Some(id.to_string()),
                    subfield_display_name: name.to_string(),
                })
                .collect(),
        )
    }

    pub fn from_csv(path: &Path) -> Result<Self> {
        let entries: Vec<SubfieldEntry> =
            read_rows(path).map_err(|e| Error::Catalog(e.to_string()))?;
        if entries.is_empty() {
            return Err(Error::Catalog(format!("no subfields in {}", path.display())));
        }
        Ok(Self(entries))
    }

    pub fn entries(&self) -> &[SubfieldEntry] {
        &self.0
    }

    pub fn names(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|e| e.subfield_display_name.clone())
            .collect()
    }
}
