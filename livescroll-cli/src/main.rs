//! Livescroll demo driver.

mod cli;
mod dataset;

use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;
use livescroll_lib::GridConfig;
use livescroll_lib::LiveGrid;
use livescroll_lib::coordinator::WindowChange;
use livescroll_lib::model::ColumnDef;
use livescroll_lib::source::InMemorySource;
use simplelog::Config;
use simplelog::WriteLogger;

use crate::cli::Args;

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    destroyed: AtomicUsize,
    selects: AtomicUsize,
}

impl Counters {
    /// Returns (created, destroyed) since the last call.
    fn take(&self) -> (usize, usize) {
        (
            self.created.swap(0, Ordering::Relaxed),
            self.destroyed.swap(0, Ordering::Relaxed),
        )
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match File::create(&args.log_file) {
        Ok(file) => {
            if let Err(e) = WriteLogger::init(args.log_level.into(), Config::default(), file) {
                eprintln!("warning: logging disabled: {e}");
            }
        }
        Err(e) => eprintln!("warning: cannot create {}: {e}", args.log_file.display()),
    }

    if let Err(e) = run(args).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), livescroll_lib::Error> {
    let mut config = match &args.config {
        Some(path) => GridConfig::load(path)?,
        None => GridConfig::default(),
    };
    if let Some(page_size) = args.page_size {
        config = config.with_page_size(page_size);
    }

    let rows = dataset::generate(args.rows, &config.id_field);
    let mut source = InMemorySource::new(rows);
    if args.latency_ms > 0 {
        source = source.with_latency(Duration::from_millis(args.latency_ms));
    }
    log::info!("dataset ready: {} rows", source.len());

    let grid = LiveGrid::new(Arc::new(source), config)?;
    grid.set_columns(vec![
        ColumnDef::new(grid.config().id_field.clone()).with_width(80.0),
        ColumnDef::new("name").with_width(200.0),
        ColumnDef::new("value"),
        ColumnDef::new("created"),
    ]);

    let counters = Arc::new(Counters::default());
    let events = grid.events();
    let c = Arc::clone(&counters);
    let _created = events.row_create.subscribe(move |_| {
        c.created.fetch_add(1, Ordering::Relaxed);
    });
    let c = Arc::clone(&counters);
    let _destroyed = events.row_destroy.subscribe(move |_| {
        c.destroyed.fetch_add(1, Ordering::Relaxed);
    });
    let c = Arc::clone(&counters);
    let _selected = events.select.subscribe(move |rows| {
        c.selects.fetch_add(1, Ordering::Relaxed);
        let ids: Vec<&str> = rows.iter().map(|r| r.id()).collect();
        println!("select: {ids:?}");
    });

    let change = grid.refresh().await?;
    if let Some(initial) = grid.initial_load() {
        if !initial.wait().await {
            log::warn!("initial load superseded");
        }
    }
    report(&grid, &counters, "refresh", &change);

    for step in &args.scroll {
        let markers: Vec<&str> = step.split(',').collect();
        let change = grid.on_live_scroll(&markers).await?;
        report(&grid, &counters, &format!("scroll [{step}]"), &change);
    }

    if !args.select.is_empty() {
        grid.select(Some(args.select.as_slice()));
        println!(
            "selection: {:?} ({} select events)",
            grid.selected_ids(),
            counters.selects.load(Ordering::Relaxed)
        );
    }

    if let Some(field) = args.sort.as_deref() {
        let change = grid.sort_by(Some(field), args.desc).await?;
        report(&grid, &counters, &format!("sort {field}"), &change);
        if let Some(first) = grid.rows().first() {
            println!("  first row: {} = {:?}", first.id(), first.get(field));
        }
    }

    grid.teardown();
    Ok(())
}

fn report(grid: &LiveGrid, counters: &Counters, label: &str, change: &WindowChange) {
    let (created, destroyed) = counters.take();
    println!(
        "{label}: window={:?} total={} rows={} (+{created} -{destroyed})",
        grid.resident_window(),
        grid.total_count(),
        grid.rows().len(),
    );
    if !change.evicted.is_empty() {
        println!("  evicted: {:?}", change.evicted);
    }
    for failure in &change.failed {
        println!("  page {} failed: {}", failure.index, failure.error);
    }
}
