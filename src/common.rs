use std::{
    fs::{create_dir_all, File},
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use csv::{Reader, ReaderBuilder, Writer};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

pub const UNKNOWN: &str = "Unknown";

pub const COUNTRY_SUMMARY: &str = "1_publication_summary_of_countries.csv";
pub const COMBINED_COUNTS: &str = "combined_publication_counts.csv";
pub const SUBFIELD_PERCENTAGES: &str = "2_subfield_percentages.csv";
pub const INTERNATIONAL: &str = "4_international_proportion.csv";
pub const CENTRALIZATION: &str = "5_centralization_df.csv";

pub type FileReader = Reader<BufReader<File>>;
pub type FileWriter = Writer<BufWriter<File>>;

macro_rules! pathfields_fn {
    ($($k:ident => $v:literal),*,) => {

        pub fn new(root_path: &str) -> Result<Self> {
            $(
                let $k = Path::new(root_path).join($v);
                create_dir_all(&$k).map_err(|e| Error::io(&$k, e))?;
            )*

            Ok(Self {
                $(
                    $k,
                )*
            })
        }
    };
}

/// Directory layout of one pipeline data root.
pub struct Stowage {
    pub raw_counts: PathBuf,
    pub raw_meta: PathBuf,
    pub processed: PathBuf,
    pub year_graphs: PathBuf,
    pub full_graphs: PathBuf,
    pub logs: PathBuf,
}

impl Stowage {
    pathfields_fn!(
        raw_counts => "raw/publication_counts",
        raw_meta => "raw/publication_meta",
        processed => "processed",
        year_graphs => "graphs/years",
        full_graphs => "graphs/full",
        logs => "logs",
    );

    pub fn country_counts(&self, country_code: &str) -> PathBuf {
        self.raw_counts
            .join(format!("subfield_publication_counts_{}.csv", country_code))
    }

    pub fn yearly_meta(&self, year: i32) -> PathBuf {
        self.raw_meta
            .join(format!("openalex_publications_{}.csv", year))
    }

    pub fn publication_meta(&self, home_country: &str) -> PathBuf {
        self.raw_meta.join(format!(
            "{}_publication_meta.csv",
            home_country.to_lowercase()
        ))
    }

    /// Stem of a per-slice graph; extensions are added by the writers.
    pub fn year_graph(&self, subfield: &str, year: i32) -> PathBuf {
        self.year_graphs
            .join(format!("{}_{}", sanitize_name(subfield), year))
    }

    pub fn full_graph(&self, subfield: &str) -> PathBuf {
        self.full_graphs.join(sanitize_name(subfield))
    }
}

/// File-name form of a subfield display name.
pub fn sanitize_name(name: &str) -> String {
    name.replace(' ', "_")
}

pub fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut s = stem.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

pub fn get_reader(path: &Path) -> Result<FileReader> {
    let file = File::open(path).map_err(|e| Error::read(path, e))?;
    Ok(ReaderBuilder::new().from_reader(BufReader::new(file)))
}

pub fn get_writer(path: &Path) -> Result<FileWriter> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    Ok(Writer::from_writer(BufWriter::new(file)))
}

pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = get_writer(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|e| Error::io(path, e))?;
    Ok(())
}

pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = get_reader(path)?;
    let mut out = Vec::new();
    for row in reader.deserialize::<T>() {
        out.push(row?);
    }
    Ok(out)
}

pub fn write_gz<T: Serialize>(out_path: &Path, obj: &T) -> Result<()> {
    let out_file = File::create(out_path).map_err(|e| Error::io(out_path, e))?;
    let encoder = GzEncoder::new(out_file, Compression::default());
    let mut writer = BufWriter::new(encoder);
    serde_json::to_writer(&mut writer, obj)?;
    let encoder = writer
        .into_inner()
        .map_err(|e| Error::io(out_path, e.into_error()))?;
    encoder
        .finish()
        .and_then(|mut f| f.flush())
        .map_err(|e| Error::io(out_path, e))?;
    Ok(())
}

pub fn read_gz<T: DeserializeOwned>(in_path: &Path) -> Result<T> {
    let file = File::open(in_path).map_err(|e| Error::read(in_path, e))?;
    let reader = BufReader::new(GzDecoder::new(file));
    Ok(serde_json::from_reader(reader)?)
}
