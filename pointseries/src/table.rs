use crate::Query;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::io::Write;

/// A band's value in one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandValue {
    Present(f64),

    /// The image had no data for this band at the query point.
    Missing,
}

impl BandValue {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Present(val) => Some(val),
            Self::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }
}

impl From<Option<f64>> for BandValue {
    fn from(val: Option<f64>) -> Self {
        val.map_or(Self::Missing, Self::Present)
    }
}

impl Serialize for BandValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

/// Band values sampled from one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesRow {
    /// Acquisition time.
    pub timestamp: DateTime<Utc>,

    /// Source image identifier.
    pub image_id: String,

    /// One value per requested band, in the query's band order.
    pub band_values: Vec<(String, BandValue)>,
}

impl TimeSeriesRow {
    /// Returns the value of `band` in this row.
    pub fn get(&self, band: &str) -> Option<BandValue> {
        self.band_values
            .iter()
            .find(|(name, _)| name == band)
            .map(|(_, val)| *val)
    }
}

/// Per-band statistics over a table's present values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandSummary {
    pub band: String,
    pub present: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

/// Chronologically ordered extraction result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesTable {
    #[serde(skip)]
    query: Query,
    rows: Vec<TimeSeriesRow>,
}

impl TimeSeriesTable {
    pub(crate) fn new(query: Query, rows: Vec<TimeSeriesRow>) -> Self {
        Self { query, rows }
    }

    /// The query that produced this table.
    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn band_names(&self) -> &[String] {
        &self.query.band_names
    }

    pub fn rows(&self) -> &[TimeSeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns an iterator over `(timestamp, value)` for `band`.
    ///
    /// Empty if `band` was not requested.
    pub fn band<'a>(
        &'a self,
        band: &'a str,
    ) -> impl Iterator<Item = (DateTime<Utc>, BandValue)> + 'a {
        self.rows
            .iter()
            .filter_map(move |row| row.get(band).map(|val| (row.timestamp, val)))
    }

    /// Number of rows where `band` is missing.
    pub fn missing(&self, band: &str) -> usize {
        self.band(band).filter(|(_, val)| val.is_missing()).count()
    }

    /// Returns count, range and mean of every requested band.
    pub fn summary(&self) -> Vec<BandSummary> {
        self.band_names()
            .iter()
            .map(|band| {
                let values: Vec<f64> = self.band(band).filter_map(|(_, val)| val.value()).collect();
                let present = values.len();
                let min = values.iter().copied().reduce(f64::min);
                let max = values.iter().copied().reduce(f64::max);
                #[allow(clippy::cast_precision_loss)]
                let mean = (present > 0).then(|| values.iter().sum::<f64>() / present as f64);
                BandSummary {
                    band: band.clone(),
                    present,
                    missing: self.len() - present,
                    min,
                    max,
                    mean,
                }
            })
            .collect()
    }

    /// Returns a copy of this table with every present value of `band`
    /// multiplied by `factor`.
    ///
    /// Extraction returns values exactly as stored; products with a
    /// published scale factor (e.g. 0.0001 for vegetation indices) are
    /// normalized with this.
    #[must_use]
    pub fn scaled(&self, band: &str, factor: f64) -> Self {
        let mut scaled = self.clone();
        for row in &mut scaled.rows {
            for (_, val) in row.band_values.iter_mut().filter(|(name, _)| name == band) {
                if let BandValue::Present(v) = val {
                    *v *= factor;
                }
            }
        }
        scaled
    }

    /// Writes this table as CSV: a `time` column then one column per
    /// band, missing values left empty.
    pub fn write_csv<W: Write>(&self, wtr: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(wtr);
        wtr.write_record(std::iter::once("time").chain(self.band_names().iter().map(String::as_str)))?;
        for row in &self.rows {
            let time = row.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
            let values = row
                .band_values
                .iter()
                .map(|(_, val)| val.value().map_or_else(String::new, |v| v.to_string()));
            wtr.write_record(std::iter::once(time).chain(values))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BandValue, TimeSeriesRow, TimeSeriesTable};
    use crate::Query;
    use approx::assert_relative_eq;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn table() -> TimeSeriesTable {
        let query = Query::builder()
            .point(28.60, 77.22)
            .collection("MODIS/061/MOD13Q1")
            .bands(["NDVI", "EVI"])
            .start(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
            .end(NaiveDate::from_ymd_opt(2020, 1, 31).unwrap())
            .scale(250.0)
            .build()
            .unwrap();
        let row = |day, ndvi: Option<f64>, evi: Option<f64>| TimeSeriesRow {
            timestamp: Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap(),
            image_id: format!("2020_01_{day:02}"),
            band_values: vec![("NDVI".into(), ndvi.into()), ("EVI".into(), evi.into())],
        };
        TimeSeriesTable::new(
            query,
            vec![
                row(1, Some(3521.0), Some(2044.0)),
                row(17, Some(3688.0), None),
            ],
        )
    }

    #[test]
    fn test_band_value() {
        assert_eq!(BandValue::from(Some(0.0)), BandValue::Present(0.0));
        assert_eq!(BandValue::from(None), BandValue::Missing);
        assert!(BandValue::Missing.is_missing());
        assert_eq!(BandValue::Missing.value(), None);
    }

    #[test]
    fn test_band_and_missing() {
        let table = table();
        let evi: Vec<_> = table.band("EVI").map(|(_, val)| val).collect();
        assert_eq!(evi, [BandValue::Present(2044.0), BandValue::Missing]);
        assert_eq!(table.missing("EVI"), 1);
        assert_eq!(table.missing("NDVI"), 0);
        assert_eq!(table.band("LST").count(), 0);
    }

    #[test]
    fn test_summary() {
        let summary = table().summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].band, "NDVI");
        assert_eq!(summary[0].present, 2);
        assert_eq!(summary[0].min, Some(3521.0));
        assert_eq!(summary[0].max, Some(3688.0));
        assert_relative_eq!(summary[0].mean.unwrap(), 3604.5);
        assert_eq!(summary[1].present, 1);
        assert_eq!(summary[1].missing, 1);
    }

    #[test]
    fn test_scaled_leaves_missing_alone() {
        let table = table().scaled("EVI", 0.0001);
        assert_relative_eq!(table.rows()[0].get("EVI").unwrap().value().unwrap(), 0.2044);
        assert_eq!(table.rows()[1].get("EVI"), Some(BandValue::Missing));
        assert_eq!(
            table.rows()[0].get("NDVI"),
            Some(BandValue::Present(3521.0))
        );
    }

    #[test]
    fn test_write_csv() {
        let mut out = Vec::new();
        table().write_csv(&mut out).unwrap();
        let csv = String::from_utf8(out).unwrap();
        assert_eq!(
            csv,
            "time,NDVI,EVI\n\
             2020-01-01T00:00:00Z,3521,2044\n\
             2020-01-17T00:00:00Z,3688,\n"
        );
    }

    #[test]
    fn test_json_serializes_missing_as_null() {
        let json = serde_json::to_value(table()).unwrap();
        let evi = &json["rows"][1]["band_values"][1];
        assert_eq!(evi[0], "EVI");
        assert!(evi[1].is_null());
    }
}
