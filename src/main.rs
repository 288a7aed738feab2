//! CLI entry point: load the configured input files, resolve the default
//! filter selection, and emit the dashboard snapshot (console summary plus
//! a JSON payload for the presentation layer).

use std::path::Path;
use std::process;

use habmon_service::config::AppConfig;
use habmon_service::dataset;
use habmon_service::filter::FilterState;
use habmon_service::logging::{self, DataSource, LogLevel};
use habmon_service::model::PipelineError;
use habmon_service::snapshot;

const SNAPSHOT_PATH: &str = "habmon_snapshot.json";

fn main() {
    dotenv::dotenv().ok();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HABMON_CONFIG").ok())
        .unwrap_or_else(|| "habmon.toml".to_string());

    if let Err(e) = run(&config_path) {
        logging::error(DataSource::System, None, &e.to_string());
        eprintln!("fatal: {}", e);
        process::exit(1);
    }
}

fn run(config_path: &str) -> Result<(), PipelineError> {
    let cfg = AppConfig::load(Path::new(config_path))?;

    let level = match cfg.log.level.as_str() {
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warning,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    };
    logging::init_logger(level, cfg.log.file.as_deref());

    let view = dataset::build_dataset(&cfg)?;

    // Fresh session: no prior selections, community data off until the
    // user opts in. Resolution fills in the keyword default and the
    // trailing date window.
    let resolved = FilterState::default().resolve(&view, &cfg);
    let snap = snapshot::build_snapshot(&view, &resolved);

    snapshot::print_summary(&snap);
    snapshot::write_snapshot(&snap, Path::new(SNAPSHOT_PATH))?;
    logging::info(
        DataSource::System,
        None,
        &format!("snapshot written to {}", SNAPSHOT_PATH),
    );

    Ok(())
}
