//! Georeferenced per-band sample grids.

use geo::{
    geometry::{Coord, Point, Rect},
    Intersects,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Meters per degree of latitude.
const M_PER_DEG_LAT: f64 = 110_574.0;

/// Meters per degree of longitude at the equator.
const M_PER_DEG_LON: f64 = 111_320.0;

/// A north-up grid of samples for one or more bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster {
    /// `[longitude, latitude]` of the grid's north-west corner.
    origin: [f64; 2],

    /// Degrees per pixel, both axes.
    resolution: f64,

    /// Number of pixel rows (north to south).
    rows: usize,

    /// Number of pixel columns (west to east).
    cols: usize,

    /// Row-major samples per band; `None` is a masked pixel.
    bands: BTreeMap<String, Vec<Option<f64>>>,
}

impl Raster {
    /// Returns an empty raster with its north-west corner at `origin`.
    pub fn new(origin: Coord<f64>, resolution: f64, rows: usize, cols: usize) -> Self {
        Self {
            origin: [origin.x, origin.y],
            resolution,
            rows,
            cols,
            bands: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) `name` with row-major `samples`.
    #[must_use]
    pub fn band(mut self, name: impl Into<String>, samples: Vec<Option<f64>>) -> Self {
        self.bands.insert(name.into(), samples);
        self
    }

    /// Checks grid geometry and band lengths.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(format!("invalid resolution {}", self.resolution));
        }
        if self.rows == 0 || self.cols == 0 {
            return Err(format!("empty grid {}x{}", self.rows, self.cols));
        }
        let len = self
            .rows
            .checked_mul(self.cols)
            .ok_or_else(|| format!("grid {}x{} too large", self.rows, self.cols))?;
        for (name, samples) in &self.bands {
            if samples.len() != len {
                return Err(format!(
                    "band {name} has {} samples, expected {len}",
                    samples.len(),
                ));
            }
        }
        Ok(())
    }

    /// Returns the number of pixels in this raster, saturating at
    /// `usize::MAX`.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.rows.saturating_mul(self.cols)
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bands.keys().map(String::as_str)
    }

    /// Area covered by this raster, in degrees.
    #[allow(clippy::cast_precision_loss)]
    pub fn footprint(&self) -> Rect<f64> {
        let [west, north] = self.origin;
        let east = west + self.cols as f64 * self.resolution;
        let south = north - self.rows as f64 * self.resolution;
        Rect::new(Coord { x: west, y: south }, Coord { x: east, y: north })
    }

    /// Returns `true` if `point` lies within (or on the edge of) this
    /// raster's footprint.
    pub fn covers(&self, point: Point<f64>) -> bool {
        self.footprint().intersects(&point)
    }

    /// Ground size of one pixel at `latitude`, in meters.
    ///
    /// Pixels are not square on the ground; this is the longer side.
    pub fn native_scale(&self, latitude: f64) -> f64 {
        let ns = self.resolution * M_PER_DEG_LAT;
        let ew = self.resolution * M_PER_DEG_LON * latitude.to_radians().cos();
        ns.max(ew)
    }

    /// Returns the value of `band` at `point` aggregated to `scale`
    /// meters.
    ///
    /// At or below native scale this is the containing pixel. Above it,
    /// the mean of unmasked pixels in a window roughly `scale` meters
    /// wide centered on the containing pixel.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn sample(&self, band: &str, point: Point<f64>, scale: f64) -> Option<f64> {
        let samples = self.bands.get(band)?;
        let (col, row) = self.pixel(point)?;
        let native = self.native_scale(point.y());
        let value = |xy| {
            self.xy_to_linear_index(xy)
                .and_then(|idx| samples.get(idx))
                .copied()
                .flatten()
        };
        if scale <= native {
            return value((col, row));
        }

        let span = ((scale / native).ceil() as usize).max(1);
        let before = span / 2;
        let after = span - 1 - before;
        let (col_lo, col_hi) = (
            col.saturating_sub(before),
            col.saturating_add(after).min(self.cols - 1),
        );
        let (row_lo, row_hi) = (
            row.saturating_sub(before),
            row.saturating_add(after).min(self.rows - 1),
        );

        let (sum, count) = (row_lo..=row_hi)
            .flat_map(|y| (col_lo..=col_hi).map(move |x| (x, y)))
            .filter_map(value)
            .fold((0.0, 0_usize), |(sum, count), val| (sum + val, count + 1));

        (count > 0).then(|| sum / count as f64)
    }
}

/// Private API
impl Raster {
    /// Returns the `(column, row)` of the pixel containing `point`.
    ///
    /// Points on the east or south edge belong to the last
    /// column/row.
    #[allow(clippy::cast_sign_loss)]
    fn pixel(&self, point: Point<f64>) -> Option<(usize, usize)> {
        if !self.covers(point) {
            return None;
        }
        let max_col = isize::try_from(self.cols.checked_sub(1)?).ok()?;
        let max_row = isize::try_from(self.rows.checked_sub(1)?).ok()?;
        let (x, y) = self.coord_to_xy(point.0);
        let col = x.clamp(0, max_col) as usize;
        let row = y.clamp(0, max_row) as usize;
        Some((col, row))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn coord_to_xy(&self, coord: Coord<f64>) -> (isize, isize) {
        let [west, north] = self.origin;
        let x = ((coord.x - west) / self.resolution).floor() as isize;
        let y = ((north - coord.y) / self.resolution).floor() as isize;
        (x, y)
    }

    /// Returns `None` if the index doesn't fit in a `usize`.
    fn xy_to_linear_index(&self, (x, y): (usize, usize)) -> Option<usize> {
        self.cols.checked_mul(y)?.checked_add(x)
    }
}
