use std::{io, path::PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unreadable record {record}: {message}")]
    Parse { record: String, message: String },
    #[error("missing input {}", .0.display())]
    MissingInput(PathBuf),
    #[error("io failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bad graph file {}: {message}", path.display())]
    GraphFormat { path: PathBuf, message: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("subfield catalog: {0}")]
    Catalog(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Like [`Error::io`], but an absent file is a `MissingInput`.
    pub fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            return Error::MissingInput(path);
        }
        Error::Io { path, source }
    }

    pub fn parse(record: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            record: record.into(),
            message: message.to_string(),
        }
    }

    /// Record- and slice-level failures the batch loops step over.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::MissingInput(_) | Error::GraphFormat { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
