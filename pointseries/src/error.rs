use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("remote service: {0}")]
    RemoteService(#[from] SourceError),
}

impl SeriesError {
    /// Returns `true` if this error was caused by the caller's input.
    pub fn is_invalid_query(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }
}

/// Reasons a [Query](crate::Query) is rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("no band names requested")]
    NoBands,

    #[error("band '{0}' requested more than once")]
    DuplicateBand(String),

    #[error("collection '{collection}' has no band(s) {}", .bands.join(", "))]
    UnknownBands {
        collection: String,
        bands: Vec<String>,
    },

    #[error("start date {start} is after end date {end}")]
    DateRange { start: NaiveDate, end: NaiveDate },

    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),

    #[error("scale must be a positive number of meters, got {0}")]
    Scale(f64),

    #[error("empty collection id")]
    EmptyCollectionId,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown collection {0}")]
    UnknownCollection(String),

    #[error("unknown image {image} in collection {collection}")]
    UnknownImage { collection: String, image: String },

    #[error("no collection files in {0}")]
    EmptyCatalog(PathBuf),

    #[error("malformed collection {collection}: {reason}")]
    Malformed { collection: String, reason: String },
}
