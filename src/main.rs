//! Command-line inspection of race photo detection files.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use runview::config::AppConfig;
use runview::format::FormatError;
use runview::model::ConfidenceThresholds;
use runview::store::RecordStore;

#[derive(Parser, Debug)]
#[command(name = "runview")]
#[command(about = "Inspect race photo detection files", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a detection file and print review progress and statistics.
    Summary {
        file: PathBuf,
        /// Minimum bib detection confidence (default from config)
        #[arg(long)]
        bib_threshold: Option<f64>,
        /// Minimum shoe detection confidence (default from config)
        #[arg(long)]
        shoe_threshold: Option<f64>,
    },

    /// List bib numbers in bib order with the best photo of each.
    Bibs {
        file: PathBuf,
        /// Only list bibs of this run category
        #[arg(short, long)]
        category: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Installed before the config is read; the configured level applies after.
    let env_filter = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Trace)
        .parse_default_env()
        .init();
    if let Some(level) = max_level(env_filter, None) {
        log::set_max_level(level);
    }

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load_from_default_path(),
    }
    .unwrap_or_default();

    if let Some(level) = max_level(env_filter, Some(&config)) {
        log::set_max_level(level);
    }

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Level to apply on top of the logger, or `None` when `RUST_LOG` decides.
/// Until a config is loaded `info` is used.
fn max_level(env_filter: bool, config: Option<&AppConfig>) -> Option<log::LevelFilter> {
    if env_filter {
        return None;
    }
    Some(config.map_or(log::LevelFilter::Info, |c| {
        c.preferences.log_level.to_level_filter()
    }))
}

fn run(command: Command, config: &AppConfig) -> Result<(), FormatError> {
    let mut store = RecordStore::new();

    match command {
        Command::Summary {
            file,
            bib_threshold,
            shoe_threshold,
        } => {
            let defaults = config.confidence_thresholds();
            let thresholds = ConfidenceThresholds::new(
                bib_threshold.unwrap_or(defaults.bib),
                shoe_threshold.unwrap_or(defaults.shoes),
            );

            let summary = store.load_file(&file, thresholds)?;
            let progress = store.progress();
            let stats = store.collect_stats(&config.brand_labels());

            println!("{}", file.display());
            println!(
                "  records:    {} ({} below thresholds)",
                summary.kept, summary.discarded
            );
            println!(
                "  checked:    {}/{} ({:.1}%)",
                progress.checked, progress.total, progress.percentage
            );
            println!("  bibs:       {}", store.index().all_bibs(None).len());
            println!("  categories: {}", stats.categories.join(", "));
            println!("  genders:    {}", stats.genders.join(", "));
            println!("  brands:     {}", stats.brands.join(", "));
        }

        Command::Bibs { file, category } => {
            store.load_file(&file, config.confidence_thresholds())?;
            let index = store.index();

            for bib in index.all_bibs(category.as_deref()) {
                let best = match &category {
                    Some(category) => index.best_for(&bib, category),
                    None => index.best_overall(&bib),
                };
                let Some(entry) = best else {
                    continue;
                };
                let image = store
                    .get(entry.position)
                    .map(|record| record.image_path.as_str())
                    .unwrap_or_default();
                println!(
                    "{:>8}  {:<8} {:<3} {:>6.3}  {}",
                    bib, entry.category, entry.gender, entry.total_confidence, image
                );
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use runview::config::LogLevel;

    #[test]
    fn test_config_load_is_logged_at_info() {
        assert_eq!(max_level(false, None), Some(log::LevelFilter::Info));
    }

    #[test]
    fn test_configured_level_applies_after_load() {
        let mut config = AppConfig::default();
        config.preferences.log_level = LogLevel::Debug;
        assert_eq!(max_level(false, Some(&config)), Some(log::LevelFilter::Debug));
    }

    #[test]
    fn test_rust_log_overrides_config() {
        assert_eq!(max_level(true, Some(&AppConfig::default())), None);
        assert_eq!(max_level(true, None), None);
    }
}
