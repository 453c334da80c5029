//! Reads a glider CSV export, prints a depth-time transect summary and the latest position.
//!
//! Usage: `cargo run --example transect -- <table.csv> [schema.json5]`

use chrono::{DateTime, Local};
use env_logger::Builder;
use glider_align::{
    GliderError,
    align::{AlignSettingsBuilder, SortPolicy},
    series::FillValues,
    table::{
        Table,
        schema::{FieldKind, Schema},
    },
    transect::{Transect, latest_fix},
};
use log::{info, warn};
use std::{env, io::prelude::*, process};

fn main() -> Result<(), GliderError<f64>> {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%dT%H:%M:%S.%f"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = env::args().collect::<Vec<String>>();

    if args.len() < 2 {
        eprintln!("Usage: {} <table.csv> [schema.json5]", args[0]);
        process::exit(1);
    }

    let schema = match args.get(2) {
        Some(path) => Schema::from_file(path)?,
        None => Schema::glider(),
    };

    let table = Table::from_path(&args[1], &schema)?;

    info!(
        "loaded {} rows with columns {:?}",
        table.len(),
        table.names().collect::<Vec<&str>>()
    );

    let channels = schema
        .fields()
        .iter()
        .filter(|field| field.kind == FieldKind::Science)
        .map(|field| field.name.as_str())
        .filter(|name| table.column(name).is_some())
        .collect::<Vec<&str>>();

    let settings = AlignSettingsBuilder::default()
        .fill_values(FillValues::erddap())
        .sort_policy(SortPolicy::Sort)
        .build()
        .expect("all settings have defaults");

    let transect = Transect::build(&table, "depth", &channels, &settings)?;

    for channel in transect.channels() {
        let depth_range = channel
            .points()
            .iter()
            .fold((f64::MAX, f64::MIN), |(lo, hi), point| {
                (lo.min(point.depth), hi.max(point.depth))
            });

        info!(
            "{:<16} {:>8} samples, depth {:.1} .. {:.1} m ({})",
            channel.name(),
            channel.points().len(),
            depth_range.0,
            depth_range.1,
            channel.unit().unwrap_or("-")
        );
    }

    match latest_fix(&table, "latitude", "longitude")? {
        Some(fix) => info!(
            "latest fix at {}: {:.4}N {:.4}E",
            DateTime::from_timestamp(fix.timestamp as i64, 0)
                .map(|datetime| datetime.to_rfc3339())
                .unwrap_or_default(),
            fix.latitude,
            fix.longitude
        ),
        None => warn!("no valid position in table"),
    }

    Ok(())
}
