#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line driver for the event map search aggregator.
//!
//! ```text
//! eventmap search --bbox -74.06,40.68,-73.94,40.77 [--keywords jazz] [--max-pages 3]
//! eventmap area --bbox -74.06,40.68,-73.94,40.77 [--wkid 4326]
//! ```
//!
//! `search` treats the bounding box as the map viewport, pages through the
//! results and prints every placed event. The API key comes from
//! `--app-key`, the `EVENTBRITE_APP_KEY` environment variable or the config
//! file, in that order. Ctrl-C cancels outstanding requests.

mod host;

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use eventmap_aggregator::EventAggregator;
use eventmap_aggregator::config::{AggregatorConfig, SearchOverrides};
use eventmap_aggregator::notify::Notification;
use eventmap_aggregator::store::{DataPoint, Stats};
use eventmap_cli_utils::{MultiProgress, PageProgress};
use eventmap_geography::{Extent, SpatialReference, viewport};
use tokio::sync::broadcast::error::RecvError;

use crate::host::ConsoleMapHost;

const APP_KEY_ENV: &str = "EVENTBRITE_APP_KEY";

#[derive(Parser)]
#[command(name = "eventmap", about = "Search for events inside a map viewport")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for events inside a bounding box
    Search(SearchArgs),
    /// Print the search radius and center derived from a bounding box
    Area {
        /// Viewport as `min_lon,min_lat,max_lon,max_lat`
        #[arg(long, allow_hyphen_values = true)]
        bbox: BoundingBox,
        /// Spatial reference the viewport is rendered in
        #[arg(long, default_value = "3857")]
        wkid: u32,
        /// Largest radius in miles
        #[arg(long, default_value_t = viewport::DEFAULT_MAX_RADIUS)]
        max_radius: f64,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Viewport as `min_lon,min_lat,max_lon,max_lat`
    #[arg(long, allow_hyphen_values = true)]
    bbox: BoundingBox,
    /// Search filter
    #[arg(long)]
    keywords: Option<String>,
    /// Upper bound on pages fetched
    #[arg(long)]
    max_pages: Option<u32>,
    /// Fetch only the first page
    #[arg(long)]
    no_autopage: bool,
    /// API key (falls back to `EVENTBRITE_APP_KEY`)
    #[arg(long)]
    app_key: Option<String>,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print placed events as JSON lines
    #[arg(long)]
    json: bool,
}

/// A geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundingBox {
    min_lon: f64,
    min_lat: f64,
    max_lon: f64,
    max_lat: f64,
}

impl FromStr for BoundingBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid coordinate in '{s}': {e}"))?;

        let [min_lon, min_lat, max_lon, max_lat] = values[..] else {
            return Err(format!(
                "expected min_lon,min_lat,max_lon,max_lat, got {} value(s)",
                values.len()
            ));
        };

        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err("longitude must be within [-180, 180]".to_owned());
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err("latitude must be within [-90, 90]".to_owned());
        }

        Ok(Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }
}

impl BoundingBox {
    /// The viewport a map rendering in `sr` would report for this box.
    fn extent(self, sr: SpatialReference) -> Extent {
        match sr {
            SpatialReference::Wgs84 => Extent::new(
                self.min_lon,
                self.min_lat,
                self.max_lon,
                self.max_lat,
                SpatialReference::Wgs84,
            ),
            SpatialReference::WebMercator => Extent::from_geographic_bounds(
                self.min_lon,
                self.min_lat,
                self.max_lon,
                self.max_lat,
            ),
        }
    }
}

fn stats_line(stats: Stats) -> String {
    format!(
        "{} placed, {} without location ({} events)",
        stats.geo_points,
        stats.no_geo,
        stats.processed()
    )
}

fn print_point(point: &DataPoint, json: bool) {
    let event = &point.attributes.event;
    let title = event.title.as_deref().unwrap_or("(untitled)");
    if json {
        let line = serde_json::json!({
            "id": point.id().as_str(),
            "title": title,
            "url": event.url,
            "x": point.geometry.x(),
            "y": point.geometry.y(),
            "source": point.attributes.source_tag,
        });
        println!("{line}");
    } else {
        println!(
            "{:<14} {:>12.1} {:>12.1}  {title}",
            point.id(),
            point.geometry.x(),
            point.geometry.y()
        );
    }
}

async fn search(
    multi: &MultiProgress,
    args: SearchArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let SearchArgs {
        bbox,
        keywords,
        max_pages,
        no_autopage,
        app_key,
        config,
        json,
    } = args;

    let mut config = match &config {
        Some(path) => AggregatorConfig::load(path)?,
        None => AggregatorConfig::default(),
    };
    if let Some(key) = app_key.or_else(|| std::env::var(APP_KEY_ENV).ok()) {
        config.app_key = key;
    }
    if config.app_key.is_empty() {
        log::warn!("No API key set; pass --app-key or set {APP_KEY_ENV}");
    }

    let mut overrides = SearchOverrides::default().with_autopage(!no_autopage);
    overrides.keywords = keywords;
    overrides.max_pages = max_pages;

    let source = Arc::new(config.client()?);
    let host = Arc::new(ConsoleMapHost::new(bbox.extent(SpatialReference::WebMercator)));
    let page_cap = max_pages.unwrap_or(config.max_pages).max(1);

    let aggregator = EventAggregator::builder(source)
        .with_map(host.clone())
        .with_config(config)
        .build()?;

    let mut notifications = aggregator.subscribe();
    let progress = PageProgress::new(multi, "Searching...", page_cap);
    let search = aggregator.update(Some(overrides));
    let mut failure = None;

    loop {
        tokio::select! {
            received = notifications.recv() => match received {
                Ok(Notification::Update { page }) => {
                    progress.page_done(page, stats_line(aggregator.stats()));
                }
                Ok(Notification::Error { message }) => {
                    log::error!("Search failed: {message}");
                    failure = Some(message);
                }
                Ok(Notification::UpdateEnd | Notification::Clear) | Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Skipped {skipped} notification(s)");
                }
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, cancelling search");
                aggregator.clear();
            }
        }
    }

    search.await?;

    let stats = aggregator.stats();
    progress.finish(stats_line(stats));

    for point in aggregator.data_points() {
        print_point(&point, json);
    }
    if !json {
        println!(
            "\n{} ({} marker(s) on the map)",
            stats_line(stats),
            host.marker_count()
        );
    }

    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

fn area(bbox: BoundingBox, wkid: u32, max_radius: f64) -> Result<(), Box<dyn std::error::Error>> {
    let sr = SpatialReference::from_wkid(wkid)?;
    let area = viewport::search_area(&bbox.extent(sr), max_radius);

    println!("viewport: wkid {}", sr.wkid());
    println!(
        "center: {:.6}, {:.6}",
        area.center.y(),
        area.center.x()
    );
    println!("within: {}{}", area.radius, area.units);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = eventmap_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => search(&multi, args).await,
        Commands::Area {
            bbox,
            wkid,
            max_radius,
        } => area(bbox, wkid, max_radius),
    }
}
