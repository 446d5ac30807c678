use criterion::{criterion_group, criterion_main, Criterion};
use pointseries::{
    chrono::{Duration, NaiveDate, TimeZone, Utc},
    extract,
    geo::geometry::Coord,
    Catalog, Collection, Extractor, Image, Query, Raster,
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

const ERA5: &str = "ECMWF/ERA5_LAND/DAILY_AGGR";
const BANDS: [&str; 3] = [
    "temperature_2m_min",
    "temperature_2m_max",
    "total_precipitation_sum",
];

/// Sixteen years of daily 3x3 rasters over Delhi.
fn daily_catalog(start: NaiveDate, end: NaiveDate) -> Catalog {
    let images = (0..=(end - start).num_days())
        .map(|n| {
            let day = start + Duration::days(n);
            #[allow(clippy::cast_precision_loss)]
            let value = n as f64;
            let raster = BANDS.iter().fold(
                Raster::new(Coord { x: 77.1, y: 28.7 }, 0.1, 3, 3),
                |raster, band| raster.band(*band, vec![Some(value); 9]),
            );
            Image {
                id: day.format("%Y%m%d").to_string(),
                time: Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap()),
                raster,
            }
        })
        .collect();
    Catalog::from_collections([Collection::new(ERA5, BANDS, images).unwrap()])
}

fn point_series(c: &mut Criterion) {
    let mut group = c.benchmark_group("Point Series");

    let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2015, 12, 31).unwrap();
    let catalog = daily_catalog(start, end);

    let query = Query::builder()
        .point(28.60, 77.22)
        .collection(ERA5)
        .bands(BANDS)
        .start(start)
        .end(end)
        .scale(11_132.0)
        .build()
        .unwrap();

    group.bench_with_input("daily parallel", &(&catalog, &query), |b, (c, q)| {
        b.iter(|| extract(*c, q).unwrap())
    });

    group.bench_with_input("daily sequential", &(&catalog, &query), |b, (c, q)| {
        b.iter(|| Extractor::new(*c).parallel(false).extract(q).unwrap())
    });
}

criterion_group!(benches, point_series);
criterion_main!(benches);
