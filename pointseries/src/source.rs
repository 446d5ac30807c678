//! Image collection collaborator.

use crate::SourceError;
use chrono::{DateTime, NaiveDate, Utc};
use geo::geometry::Point;
use std::collections::BTreeSet;

/// A not-yet-executed selection of images from a collection.
///
/// Filters are only composed here; a source evaluates them when asked
/// for [`ImageCollectionSource::images`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionFilter {
    collection_id: String,
    date_range: Option<(NaiveDate, NaiveDate)>,
    point: Option<Point<f64>>,
}

impl CollectionFilter {
    pub fn new(collection_id: impl Into<String>) -> Self {
        Self {
            collection_id: collection_id.into(),
            date_range: None,
            point: None,
        }
    }

    /// Restrict to images acquired on `start..=end`.
    #[must_use]
    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    /// Restrict to images whose footprint covers `point`.
    #[must_use]
    pub fn point(mut self, point: Point<f64>) -> Self {
        self.point = Some(point);
        self
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    pub fn dates(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.date_range
    }

    pub fn location(&self) -> Option<Point<f64>> {
        self.point
    }

    /// Returns `true` if an image acquired at `time` passes the date
    /// filter, if any.
    pub fn accepts_time(&self, time: DateTime<Utc>) -> bool {
        self.date_range.map_or(true, |(start, end)| {
            let day = time.date_naive();
            start <= day && day <= end
        })
    }
}

/// One image selected by a [CollectionFilter].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub collection_id: String,
    pub image_id: String,
    pub timestamp: DateTime<Utc>,
}

/// A queryable set of time-stamped raster images.
///
/// Sources must be `Sync`; point sampling fans out across threads.
pub trait ImageCollectionSource: Sync {
    /// Names of the bands images in `collection_id` carry.
    fn list_available_bands(&self, collection_id: &str) -> Result<BTreeSet<String>, SourceError>;

    /// Selects images acquired on `start..=end`.
    fn filter_by_date_range(
        &self,
        collection_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CollectionFilter, SourceError> {
        Ok(CollectionFilter::new(collection_id).date_range(start, end))
    }

    /// Narrows `filter` to images covering `point`.
    fn filter_by_point(
        &self,
        filter: CollectionFilter,
        point: Point<f64>,
    ) -> Result<CollectionFilter, SourceError> {
        Ok(filter.point(point))
    }

    /// Executes `filter`.
    fn images(&self, filter: &CollectionFilter) -> Result<Vec<ImageRecord>, SourceError>;

    /// Samples `band` of `image` at `point`, aggregated to `scale`
    /// meters.
    ///
    /// `Ok(None)` means the image has no data there.
    fn sample_point(
        &self,
        image: &ImageRecord,
        band: &str,
        point: Point<f64>,
        scale: f64,
    ) -> Result<Option<f64>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::{CollectionFilter, NaiveDate};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_accepts_time_is_inclusive() {
        let filter = CollectionFilter::new("c").date_range(
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 31).unwrap(),
        );
        let first = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let last = Utc.with_ymd_and_hms(2020, 1, 31, 23, 59, 59).unwrap();
        let after = Utc.with_ymd_and_hms(2020, 2, 1, 0, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2019, 12, 31, 23, 59, 59).unwrap();
        assert!(filter.accepts_time(first));
        assert!(filter.accepts_time(last));
        assert!(!filter.accepts_time(after));
        assert!(!filter.accepts_time(before));
    }

    #[test]
    fn test_unfiltered_accepts_everything() {
        let filter = CollectionFilter::new("c");
        assert!(filter.accepts_time(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(filter.location(), None);
    }
}
