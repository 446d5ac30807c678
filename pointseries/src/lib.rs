//! # Point Time Series
//!
//! `pointseries` extracts a per-image table of band values at a single
//! geographic point from a time-stamped image collection.
//!
//! The collection itself lives behind [`ImageCollectionSource`]; this
//! crate ships [`Catalog`], a source backed by a directory of JSON
//! collection files.

mod catalog;
mod error;
mod extract;
mod query;
mod raster;
mod source;
mod table;

pub use {
    crate::{
        catalog::{Catalog, Collection, Image},
        error::{QueryError, SeriesError, SourceError},
        extract::{extract, Extractor},
        query::{Query, QueryBuilder},
        raster::Raster,
        source::{CollectionFilter, ImageCollectionSource, ImageRecord},
        table::{BandSummary, BandValue, TimeSeriesRow, TimeSeriesTable},
    },
    chrono, geo,
};

#[cfg(test)]
fn catalog_dir() -> std::path::PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "..", "data", "catalog"]
        .iter()
        .collect()
}
