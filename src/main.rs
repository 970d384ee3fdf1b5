use microstructure_rv::models::{load_bars, write_daily_rv, write_garch_input};
use microstructure_rv::{AccuracyReport, DailyPipeline, MonteCarloDriver, Result, RvConfig};
use std::fs;
use std::path::Path;
use tracing::{info, Level};

const CONFIG_PATH: &str = "rv.toml";
const ENSEMBLE_PATH: &str = "ensemble.csv";
const ACCURACY_PATH: &str = "accuracy.json";
const BARS_PATH: &str = "data/bars.csv";
const DAILY_RV_PATH: &str = "data/daily_rv.csv";
const GARCH_INPUT_PATH: &str = "data/garch_input.csv";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = if Path::new(CONFIG_PATH).exists() {
        info!("Loading configuration from {}", CONFIG_PATH);
        RvConfig::from_toml(CONFIG_PATH)?
    } else {
        info!("No {} found, using default parameters", CONFIG_PATH);
        RvConfig::default()
    };

    run_monte_carlo(&config)?;

    if Path::new(BARS_PATH).exists() {
        run_empirical(&config)?;
    } else {
        info!("No {} found, skipping empirical pipeline", BARS_PATH);
    }

    Ok(())
}

fn run_monte_carlo(config: &RvConfig) -> Result<()> {
    let driver = MonteCarloDriver::new(config.clone())?;
    let ensemble = driver.run()?;
    ensemble.write_csv(ENSEMBLE_PATH)?;
    info!(rows = ensemble.len(), "Wrote {}", ENSEMBLE_PATH);

    let report = AccuracyReport::from_ensemble(&ensemble)?;
    println!("\n{}", report);
    fs::write(ACCURACY_PATH, report.to_json()?)?;

    Ok(())
}

fn run_empirical(config: &RvConfig) -> Result<()> {
    let bars = load_bars(BARS_PATH)?;
    let pipeline = DailyPipeline::new(config.empirical)?;
    let rows = pipeline.run(&bars)?;

    write_daily_rv(DAILY_RV_PATH, &rows)?;
    write_garch_input(GARCH_INPUT_PATH, &rows)?;
    info!(days = rows.len(), "Wrote {} and {}", DAILY_RV_PATH, GARCH_INPUT_PATH);

    Ok(())
}
