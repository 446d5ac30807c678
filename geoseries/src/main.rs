mod options;

use anyhow::Error as AnyError;
use clap::Parser;
use log::info;
use options::{Cli, Command as CliCmd, Extract, Output};
use pointseries::{Catalog, Extractor, ImageCollectionSource, Query, TimeSeriesTable};
use std::io::Write;
use textplots::{Chart, Plot, Shape};

fn main() -> Result<(), AnyError> {
    let Cli { catalog, cmd } = Cli::parse();

    env_logger::init();

    let catalog = Catalog::open(catalog)?;

    match cmd {
        CliCmd::Bands { collection } => print_bands(&catalog, &collection)?,
        CliCmd::Collections => print_collections(&catalog)?,
        CliCmd::Extract(extract) => {
            let output = extract.output;
            let table = run_extract(&catalog, extract)?;
            match output {
                Output::Csv => table.write_csv(std::io::stdout().lock())?,
                Output::Json => print_json(&table)?,
                Output::Plot => plot_ascii(&table),
                Output::Summary => print_summary(&table)?,
            }
        }
    };
    Ok(())
}

fn run_extract(catalog: &Catalog, extract: Extract) -> Result<TimeSeriesTable, AnyError> {
    let Extract {
        collection,
        point,
        bands,
        start,
        end,
        scale,
        scale_factor,
        sequential,
        ..
    } = extract;

    let query = Query::builder()
        .point(point.lat, point.lon)
        .collection(collection)
        .bands(bands)
        .start(start)
        .end(end)
        .scale(scale)
        .build()?;

    let mut table = Extractor::new(catalog)
        .parallel(!sequential)
        .extract(&query)?;
    info!("extracted {} rows from {}", table.len(), query.collection_id);

    if let Some(factor) = scale_factor {
        for band in &query.band_names {
            table = table.scaled(band, factor);
        }
    }
    Ok(table)
}

fn print_bands(catalog: &Catalog, collection: &str) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    for band in catalog.list_available_bands(collection)? {
        writeln!(stdout, "{band}")?;
    }
    Ok(())
}

fn print_collections(catalog: &Catalog) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    for id in catalog.collection_ids()? {
        let collection = catalog.collection(&id)?;
        writeln!(stdout, "{id}: {} images", collection.images.len())?;
    }
    Ok(())
}

fn print_json(table: &TimeSeriesTable) -> Result<(), AnyError> {
    let json = serde_json::to_string(table)?;
    println!("{json}");
    Ok(())
}

fn print_summary(table: &TimeSeriesTable) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{} rows", table.len())?;
    for summary in table.summary() {
        let fmt = |val: Option<f64>| val.map_or_else(|| "-".to_owned(), |v| format!("{v:.4}"));
        writeln!(
            stdout,
            "{}: present {}, missing {}, min {}, max {}, mean {}",
            summary.band,
            summary.present,
            summary.missing,
            fmt(summary.min),
            fmt(summary.max),
            fmt(summary.mean),
        )?;
    }
    Ok(())
}

/// Plots the first band against days since the first row. Missing
/// values are skipped.
fn plot_ascii(table: &TimeSeriesTable) {
    let (Some(band), Some(first)) = (table.band_names().first(), table.rows().first()) else {
        return;
    };
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let plot_data: Vec<(f32, f32)> = table
        .band(band)
        .filter_map(|(time, val)| {
            let days = (time - first.timestamp).num_seconds() as f32 / 86_400.0;
            val.value().map(|v| (days, v as f32))
        })
        .collect();
    let x_max = plot_data.last().map_or(1.0, |(x, _)| x.max(1.0));
    println!("{band}");
    Chart::new(300, 150, 0.0, x_max)
        .lineplot(&Shape::Lines(&plot_data))
        .display();
}
