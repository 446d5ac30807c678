use crate::{
    source::{ImageCollectionSource, ImageRecord},
    BandValue, Query, QueryError, SeriesError, TimeSeriesRow, TimeSeriesTable,
};
use log::{debug, warn};
use rayon::prelude::*;

/// Extracts the time series `query` describes from `source`.
///
/// Shorthand for `Extractor::new(source).extract(query)`.
pub fn extract<S>(source: &S, query: &Query) -> Result<TimeSeriesTable, SeriesError>
where
    S: ImageCollectionSource + ?Sized,
{
    Extractor::new(source).extract(query)
}

/// Samples a point through every image of a collection.
pub struct Extractor<'a, S: ?Sized> {
    source: &'a S,

    /// Sample images on the rayon pool (defaults to true).
    parallel: bool,
}

impl<'a, S> Extractor<'a, S>
where
    S: ImageCollectionSource + ?Sized,
{
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            parallel: true,
        }
    }

    /// Sample images on the rayon pool (defaults to true).
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Returns one row per image acquired at the query point within the
    /// query's date range, in chronological order.
    ///
    /// Images with identical timestamps are all kept, in the order the
    /// source returned them. A band the source could not sample for an
    /// image is [`BandValue::Missing`] in that image's row.
    pub fn extract(&self, query: &Query) -> Result<TimeSeriesTable, SeriesError> {
        query.validate()?;

        let available = self.source.list_available_bands(&query.collection_id)?;
        let unknown: Vec<String> = query
            .band_names
            .iter()
            .filter(|band| !available.contains(*band))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(QueryError::UnknownBands {
                collection: query.collection_id.clone(),
                bands: unknown,
            }
            .into());
        }

        let (images, filter_runtime) = {
            let now = std::time::Instant::now();
            let filter = self.source.filter_by_date_range(
                &query.collection_id,
                query.start_date,
                query.end_date,
            )?;
            let filter = self.source.filter_by_point(filter, query.point())?;
            let mut images = self.source.images(&filter)?;
            let before = images.len();
            images.retain(|image| filter.accepts_time(image.timestamp));
            if images.len() != before {
                warn!(
                    "{}: dropped {} image(s) outside {}..={}",
                    query.collection_id,
                    before - images.len(),
                    query.start_date,
                    query.end_date
                );
            }
            (images, now.elapsed())
        };

        let (mut rows, sample_runtime) = {
            let now = std::time::Instant::now();
            let rows: Vec<TimeSeriesRow> = if self.parallel {
                images
                    .into_par_iter()
                    .map(|image| self.sample_image(query, image))
                    .collect()
            } else {
                images
                    .into_iter()
                    .map(|image| self.sample_image(query, image))
                    .collect()
            };
            (rows, now.elapsed())
        };

        // Stable, so coincident timestamps keep source order.
        rows.sort_by_key(|row| row.timestamp);

        debug!(
            "extract; collection: {}, rows: {}, filter_exec: {:?}, sample_exec: {:?}",
            query.collection_id,
            rows.len(),
            filter_runtime,
            sample_runtime
        );

        Ok(TimeSeriesTable::new(query.clone(), rows))
    }
}

/// Private API.
impl<'a, S> Extractor<'a, S>
where
    S: ImageCollectionSource + ?Sized,
{
    fn sample_image(&self, query: &Query, image: ImageRecord) -> TimeSeriesRow {
        let point = query.point();
        let band_values = query
            .band_names
            .iter()
            .map(|band| {
                let val = match self.source.sample_point(&image, band, point, query.scale) {
                    Ok(val) => BandValue::from(val),
                    Err(e) => {
                        warn!("{}: sampling {band} failed: {e}", image.image_id);
                        BandValue::Missing
                    }
                };
                (band.clone(), val)
            })
            .collect();
        TimeSeriesRow {
            timestamp: image.timestamp,
            image_id: image.image_id,
            band_values,
        }
    }
}
