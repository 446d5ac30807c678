use crate::{QueryError, SeriesError};
use chrono::NaiveDate;
use geo::geometry::Point;
use std::collections::HashSet;

/// A request for the time series of one or more bands at a point.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Latitude in degrees.
    pub latitude: f64,

    /// Longitude in degrees.
    pub longitude: f64,

    /// Identifier of the image collection to sample.
    pub collection_id: String,

    /// Bands to sample, in output column order.
    pub band_names: Vec<String>,

    /// First day of the range (inclusive).
    pub start_date: NaiveDate,

    /// Last day of the range (inclusive).
    pub end_date: NaiveDate,

    /// Ground sampling distance in meters.
    pub scale: f64,
}

impl Query {
    pub fn builder() -> QueryBuilder {
        QueryBuilder {
            point: None,
            collection_id: None,
            band_names: None,
            start_date: None,
            end_date: None,
            scale: None,
        }
    }

    /// Query location as a `Point` (x: longitude, y: latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Checks everything about this query that can be checked without
    /// asking the collection.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.collection_id.trim().is_empty() {
            return Err(QueryError::EmptyCollectionId);
        }
        if self.band_names.is_empty() {
            return Err(QueryError::NoBands);
        }
        let mut seen = HashSet::with_capacity(self.band_names.len());
        for band in &self.band_names {
            if !seen.insert(band.as_str()) {
                return Err(QueryError::DuplicateBand(band.clone()));
            }
        }
        if self.start_date > self.end_date {
            return Err(QueryError::DateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(QueryError::Latitude(self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(QueryError::Longitude(self.longitude));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(QueryError::Scale(self.scale));
        }
        Ok(())
    }
}

pub struct QueryBuilder {
    /// Location to sample (required).
    point: Option<Point<f64>>,

    /// Collection identifier (required).
    collection_id: Option<String>,

    /// Bands to sample (required).
    band_names: Option<Vec<String>>,

    /// First day of the range (required).
    start_date: Option<NaiveDate>,

    /// Last day of the range (required).
    end_date: Option<NaiveDate>,

    /// Ground sampling distance (meters, required).
    scale: Option<f64>,
}

impl QueryBuilder {
    /// Location to sample, in degrees (required).
    #[must_use]
    pub fn point(mut self, latitude: f64, longitude: f64) -> Self {
        self.point = Some(Point::new(longitude, latitude));
        self
    }

    /// Collection identifier (required).
    #[must_use]
    pub fn collection(mut self, id: impl Into<String>) -> Self {
        self.collection_id = Some(id.into());
        self
    }

    /// Bands to sample, in output column order (required).
    #[must_use]
    pub fn bands<I, S>(mut self, bands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.band_names = Some(bands.into_iter().map(Into::into).collect());
        self
    }

    /// First day of the range, inclusive (required).
    #[must_use]
    pub fn start(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Last day of the range, inclusive (required).
    #[must_use]
    pub fn end(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Ground sampling distance (meters, required).
    #[must_use]
    pub fn scale(mut self, meters: f64) -> Self {
        self.scale = Some(meters);
        self
    }

    /// Returns the assembled [Query].
    ///
    /// Only presence of parameters is checked here; see
    /// [`Query::validate`].
    pub fn build(self) -> Result<Query, SeriesError> {
        let point = self.point.ok_or(SeriesError::Builder("point"))?;
        let collection_id = self
            .collection_id
            .ok_or(SeriesError::Builder("collection"))?;
        let band_names = self.band_names.ok_or(SeriesError::Builder("bands"))?;
        let start_date = self.start_date.ok_or(SeriesError::Builder("start"))?;
        let end_date = self.end_date.ok_or(SeriesError::Builder("end"))?;
        let scale = self.scale.ok_or(SeriesError::Builder("scale"))?;
        Ok(Query {
            latitude: point.y(),
            longitude: point.x(),
            collection_id,
            band_names,
            start_date,
            end_date,
            scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{NaiveDate, Query, QueryError};
    use crate::SeriesError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn delhi() -> Query {
        Query::builder()
            .point(28.60, 77.22)
            .collection("ECMWF/ERA5_LAND/DAILY_AGGR")
            .bands(["temperature_2m_min", "temperature_2m_max"])
            .start(date(2000, 1, 1))
            .end(date(2015, 12, 31))
            .scale(11132.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder() {
        let query = delhi();
        assert_eq!(query.latitude, 28.60);
        assert_eq!(query.longitude, 77.22);
        assert_eq!(query.point().x(), 77.22);
        assert_eq!(query.band_names.len(), 2);
        assert_eq!(query.validate(), Ok(()));
    }

    #[test]
    fn test_builder_missing_param() {
        let err = Query::builder()
            .point(0.0, 0.0)
            .collection("c")
            .bands(["b"])
            .start(date(2000, 1, 1))
            .end(date(2000, 1, 2))
            .build()
            .unwrap_err();
        assert!(matches!(err, SeriesError::Builder("scale")));
    }

    #[test]
    fn test_validate() {
        let mut query = delhi();
        query.band_names.clear();
        assert_eq!(query.validate(), Err(QueryError::NoBands));

        let mut query = delhi();
        query.band_names.push("temperature_2m_min".into());
        assert_eq!(
            query.validate(),
            Err(QueryError::DuplicateBand("temperature_2m_min".into()))
        );

        let mut query = delhi();
        query.start_date = date(2016, 1, 1);
        assert!(matches!(
            query.validate(),
            Err(QueryError::DateRange { .. })
        ));

        let mut query = delhi();
        query.latitude = 90.5;
        assert_eq!(query.validate(), Err(QueryError::Latitude(90.5)));

        let mut query = delhi();
        query.longitude = f64::NAN;
        assert!(matches!(query.validate(), Err(QueryError::Longitude(_))));

        let mut query = delhi();
        query.scale = 0.0;
        assert_eq!(query.validate(), Err(QueryError::Scale(0.0)));

        let mut query = delhi();
        query.collection_id = " ".into();
        assert_eq!(query.validate(), Err(QueryError::EmptyCollectionId));
    }

    #[test]
    fn test_single_day_range_is_valid() {
        let mut query = delhi();
        query.end_date = query.start_date;
        assert_eq!(query.validate(), Ok(()));
    }
}
