use anyhow::{anyhow, Error as AnyError};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, str::FromStr};

/// Extract point time series from image collections.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of collection files.
    #[arg(short, long)]
    pub catalog: PathBuf,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the bands a collection carries.
    Bands {
        /// Collection id, e.g. "MODIS/061/MOD13Q1".
        #[arg(long)]
        collection: String,
    },

    /// Print the collections in the catalog.
    Collections,

    /// Extract a time series at a point.
    Extract(Extract),
}

#[derive(Debug, Clone, clap::Args)]
pub struct Extract {
    /// Collection id, e.g. "ECMWF/ERA5_LAND/DAILY_AGGR".
    #[arg(long)]
    pub collection: String,

    /// Point "lat,lon".
    #[arg(long)]
    pub point: LatLon,

    /// Comma separated band names.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub bands: Vec<String>,

    /// First day, "YYYY-MM-DD" (inclusive).
    #[arg(long)]
    pub start: NaiveDate,

    /// Last day, "YYYY-MM-DD" (inclusive).
    #[arg(long)]
    pub end: NaiveDate,

    /// Sampling scale, in meters.
    #[arg(short, long, default_value_t = 1000.0)]
    pub scale: f64,

    /// Multiply every band by this after extraction.
    #[arg(long)]
    pub scale_factor: Option<f64>,

    /// Sample images on a single thread.
    #[arg(long, default_value_t = false)]
    pub sequential: bool,

    #[command(subcommand)]
    pub output: Output,
}

#[derive(Clone, Debug, Copy)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl FromStr for LatLon {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_str, lon_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon pair"))?;
        let lat = f64::from_str(lat_str.trim())?;
        let lon = f64::from_str(lon_str.trim())?;
        Ok(Self { lat, lon })
    }
}

#[derive(Debug, Subcommand, Clone, Copy)]
pub enum Output {
    /// Print the table as CSV to stdout.
    Csv,

    /// Print the table as JSON to stdout.
    Json,

    /// Plot the first band to terminal.
    Plot,

    /// Print per band counts and statistics.
    Summary,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, LatLon, Output};
    use clap::Parser;

    #[test]
    fn test_parse_lat_lon() {
        let LatLon { lat, lon } = "28.60, 77.22".parse().unwrap();
        assert_eq!(lat, 28.60);
        assert_eq!(lon, 77.22);
        assert!("28.60".parse::<LatLon>().is_err());
        assert!("north,77.22".parse::<LatLon>().is_err());
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "geoseries",
            "--catalog",
            "data/catalog",
            "extract",
            "--collection",
            "ECMWF/ERA5_LAND/DAILY_AGGR",
            "--point",
            "28.60,77.22",
            "--bands",
            "temperature_2m_min,temperature_2m_max",
            "--start",
            "2000-01-01",
            "--end",
            "2015-12-31",
            "--scale",
            "11132",
            "csv",
        ])
        .unwrap();
        let Command::Extract(extract) = cli.cmd else {
            panic!("expected extract");
        };
        assert_eq!(extract.bands, ["temperature_2m_min", "temperature_2m_max"]);
        assert_eq!(extract.scale, 11132.0);
        assert_eq!(extract.scale_factor, None);
        assert!(!extract.sequential);
        assert!(matches!(extract.output, Output::Csv));
    }

    #[test]
    fn test_bad_date_rejected() {
        let res = Cli::try_parse_from([
            "geoseries",
            "--catalog",
            "data/catalog",
            "extract",
            "--collection",
            "c",
            "--point",
            "0,0",
            "--bands",
            "B1",
            "--start",
            "2000-13-01",
            "--end",
            "2001-01-01",
            "json",
        ]);
        assert!(res.is_err());
    }
}
