//! End-to-end test of the daily pipeline through real CSV files

use microstructure_rv::config::EmpiricalConfig;
use microstructure_rv::math::{HestonParams, HestonSolver, NoiseSpec, SamplingGrid};
use microstructure_rv::models::{
    load_bars, write_daily_rv, write_garch_input, DailyPipeline, EmpiricalError,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::Write as _;
use std::fs;
use tempfile::tempdir;

const HEADER: &str = "Date,Timestamp,Open,High,Low,Close,Volume";

/// One-second bars from 09:30:00 built from a noisy simulated day.
fn simulated_day_csv(date: &str, seconds: usize, seed: u64, out: &mut String) {
    let solver = HestonSolver::new(HestonParams::default()).unwrap();
    let grid = SamplingGrid {
        seconds_per_day: seconds,
        ..SamplingGrid::default()
    };
    let mut rng = StdRng::seed_from_u64(seed);
    let path = solver.simulate_day(&grid, 100f64.ln(), &mut rng).unwrap();
    let observed = NoiseSpec::Iid { sd: 0.0002 }
        .inject(&path.log_price, &mut rng)
        .unwrap();

    for (i, y) in observed.observed.iter().enumerate() {
        let t = 34_200 + i;
        let close = y.exp();
        writeln!(
            out,
            "{},{:02}:{:02}:{:02},{:.6},{:.6},{:.6},{:.6},100",
            date,
            t / 3600,
            (t % 3600) / 60,
            t % 60,
            close,
            close,
            close,
            close
        )
        .unwrap();
    }
}

#[test]
fn test_pipeline_round_trip() {
    let dir = tempdir().unwrap();
    let bars_path = dir.path().join("bars.csv");

    let mut csv = format!("{}\n", HEADER);
    simulated_day_csv("20230103", 3_600, 1, &mut csv);
    // a single bar has no increments and is skipped
    csv.push_str("20230104,09:30:00,101.0,101.0,101.0,101.0,100\n");
    simulated_day_csv("20230105", 3_600, 2, &mut csv);
    fs::write(&bars_path, csv).unwrap();

    let bars = load_bars(&bars_path).unwrap();
    assert_eq!(bars.len(), 2 * 3_601 + 1);

    let pipeline = DailyPipeline::new(EmpiricalConfig::default()).unwrap();
    let rows = pipeline.run(&bars).unwrap();
    assert_eq!(rows.len(), 2);

    for row in &rows {
        assert_eq!(row.n_increments, 3_600);
        assert!(row.rqq.unwrap() > 0.0);
        assert!(row.var_eps > 0.0);
        assert!(row.k_boost >= 1 && row.k_zma >= 1);
        assert!(row.rv_zma >= 0.0);
        assert!(row.rv_naive > row.rv_5min);
    }

    let daily_path = dir.path().join("daily_rv.csv");
    write_daily_rv(&daily_path, &rows).unwrap();
    let daily = fs::read_to_string(&daily_path).unwrap();
    let mut lines = daily.lines();
    assert_eq!(
        lines.next().unwrap(),
        "date,var_eps,RQQ,K_boost,K_zma,RV_naive,RV_5min,RV_boost,RV_ZMA"
    );
    assert!(lines.next().unwrap().starts_with("2023-01-03,"));
    assert!(lines.next().unwrap().starts_with("2023-01-05,"));
    assert!(lines.next().is_none());

    let garch_path = dir.path().join("garch_input.csv");
    write_garch_input(&garch_path, &rows).unwrap();
    let garch = fs::read_to_string(&garch_path).unwrap();
    assert!(garch.starts_with("date,RV_5min,RV_ZMA,log_close\n2023-01-03,"));
    assert_eq!(garch.lines().count(), 3);
}

#[test]
fn test_malformed_record_reports_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    fs::write(
        &path,
        format!(
            "{}\n20230103,09:30:00,100,100,100,100,10\n20230103,09:30:01,100,100,100,abc,10\n",
            HEADER
        ),
    )
    .unwrap();

    match load_bars(&path) {
        Err(EmpiricalError::Record { line, .. }) => assert_eq!(line, 3),
        other => panic!("expected a record error, got {:?}", other),
    }
}

#[test]
fn test_missing_column_and_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    fs::write(&path, "Date,Timestamp,Close\n20230103,09:30:00,100\n").unwrap();
    assert!(matches!(load_bars(&path), Err(EmpiricalError::Data(_))));

    assert!(matches!(
        load_bars(dir.path().join("missing.csv")),
        Err(EmpiricalError::Io(_))
    ));
}

#[test]
fn test_out_of_order_file_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bars.csv");
    fs::write(
        &path,
        format!(
            "{}\n20230103,09:30:01,100,100,100,100,10\n20230103,09:30:00,100,100,100,100,10\n",
            HEADER
        ),
    )
    .unwrap();
    assert!(matches!(load_bars(&path), Err(EmpiricalError::Data(_))));
}
