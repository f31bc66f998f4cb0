use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod loader;
mod model;
mod sort;
mod ui;
mod value;

use controller::Controller;
use domain::{SVConfig, SVError, parse_sort_spec};
use model::{Model, Status};
use sort::SortDirection;
use ui::TableUI;

/// A tui based sortable record viewer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path of the csv, parquet or arrow file to view
    path: String,

    /// Seed the view with an initial sort, e.g. "name" or "score:desc"
    #[arg(long, value_parser = parse_sort_spec)]
    sort: Option<(String, SortDirection)>,

    /// Widest a single column may render
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run() -> Result<(), SVError> {
    let args = Args::parse();
    init_tracing()?;
    info!("Starting sv!");

    let path = shellexpand::full(&args.path).map_err(|e| SVError::LoadingFailed(e.to_string()))?;
    let data = loader::load(PathBuf::from(path.as_ref()))?;

    let config = SVConfig::default().with_max_column_width(args.max_column_width);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(
        &config,
        data,
        args.sort,
        size.width as usize,
        size.height as usize,
    )?;
    let ui = TableUI::new();
    let controller = Controller::new(&config);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event()? {
            model.update(message)?;
        }
    }

    Ok(())
}

// The terminal owns stdout, so logs go to a file next to the data.
fn init_tracing() -> Result<(), SVError> {
    let logfile = File::create("sv.log")?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(logfile))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
