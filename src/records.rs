//! Publication records as they come out of the OpenAlex works export.
//!
//! The export keeps nested objects (`authorships`, `subfield`) as JSON strings
//! inside CSV cells, so a row is read in two steps: the CSV layer yields a
//! [`PublicationRow`], and [`parse_record`] turns the JSON cells into a
//! [`PublicationRecord`].

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize};
use tqdm::Iter;
use tracing::{info, warn};

use crate::common::{get_reader, UNKNOWN};
use crate::error::{Error, Result};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PublicationRow {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub subfield: Option<String>,
    #[serde(default)]
    pub authorships: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublicationRecord {
    pub work_id: Option<String>,
    pub publication_year: i32,
    pub subfield: String,
    pub authorships: Vec<Authorship>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Authorship {
    pub author_id: Option<String>,
    pub countries: Vec<String>,
}

#[derive(Deserialize)]
struct IdStruct {
    id: Option<String>,
}

#[derive(Deserialize)]
struct RawAuthorship {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    author: Option<IdStruct>,
    #[serde(default)]
    countries: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct RawSubfield {
    #[serde(default)]
    display_name: Option<String>,
}

pub struct LoadedRecords {
    pub records: Vec<PublicationRecord>,
    pub skipped: usize,
}

impl Authorship {
    pub fn new(author_id: &str, countries: &[&str]) -> Self {
        Self {
            author_id: Some(author_id.to_string()),
            countries: countries.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Id of an author that takes part in graph construction.
    pub fn qualifying_id(&self) -> Option<&str> {
        self.author_id.as_deref().filter(|id| !id.is_empty())
    }

    /// First affiliation country, `Unknown` without one.
    pub fn primary_country(&self) -> &str {
        self.countries
            .first()
            .map(String::as_str)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNKNOWN)
    }
}

impl From<RawAuthorship> for Authorship {
    fn from(raw: RawAuthorship) -> Self {
        let author_id = raw.id.or_else(|| raw.author.and_then(|a| a.id));
        Self {
            author_id,
            countries: raw.countries.unwrap_or_default(),
        }
    }
}

impl PublicationRow {
    pub fn identity(&self) -> String {
        match (&self.id, self.publication_year) {
            (Some(id), _) => id.clone(),
            (None, Some(year)) => format!("<no id, {}>", year),
            (None, None) => "<no id>".to_string(),
        }
    }

    /// Subfield display name, `None` when the cell is absent or unreadable.
    pub fn subfield_name(&self) -> Option<String> {
        let cell = self.subfield.as_deref()?;
        let raw: Option<RawSubfield> = serde_json::from_str(cell).ok()?;
        raw?.display_name
    }

    pub fn parse_authorships(&self) -> Result<Vec<Authorship>> {
        let cell = self
            .authorships
            .as_deref()
            .ok_or_else(|| Error::parse(self.identity(), "no authorships"))?;
        let raw: Option<Vec<RawAuthorship>> =
            from_json_verbose(cell).map_err(|m| Error::parse(self.identity(), m))?;
        let raw = raw.ok_or_else(|| Error::parse(self.identity(), "null authorships"))?;
        Ok(raw.into_iter().map(Authorship::from).collect())
    }
}

pub fn parse_record(row: &PublicationRow) -> Result<PublicationRecord> {
    let publication_year = row
        .publication_year
        .ok_or_else(|| Error::parse(row.identity(), "unreadable publication_year"))?;
    let authorships = row.parse_authorships()?;
    Ok(PublicationRecord {
        work_id: row.id.clone(),
        publication_year,
        subfield: row.subfield_name().unwrap_or_else(|| UNKNOWN.to_string()),
        authorships,
    })
}

pub fn load_rows(path: &Path) -> Result<Vec<PublicationRow>> {
    let mut reader = get_reader(path)?;
    let mut rows = Vec::new();
    for (i, line) in reader
        .deserialize::<PublicationRow>()
        .tqdm()
        .desc(Some("rows"))
        .enumerate()
    {
        match line {
            Ok(row) => rows.push(row),
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => warn!(row = i + 1, %err, "skipping malformed csv row"),
        }
    }
    Ok(rows)
}

pub fn load_records(path: &Path) -> Result<LoadedRecords> {
    let rows = load_rows(path)?;
    let total = rows.len();
    let mut records = Vec::with_capacity(total);
    for row in rows.iter() {
        match parse_record(row) {
            Ok(record) => records.push(record),
            Err(err) => warn!(%err, "skipping record"),
        }
    }
    let skipped = total - records.len();
    info!(path = %path.display(), parsed = records.len(), skipped, "loaded publication records");
    Ok(LoadedRecords { records, skipped })
}

fn from_json_verbose<T: DeserializeOwned>(s: &str) -> std::result::Result<T, String> {
    let deserializer = &mut serde_json::Deserializer::from_str(s);
    serde_path_to_error::deserialize(deserializer)
        .map_err(|err| format!("{} at `{}`", err.inner(), err.path()))
}
