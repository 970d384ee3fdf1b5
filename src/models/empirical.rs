//! Daily realized variance table from an intraday OHLCV panel.
//!
//! Bars are grouped into contiguous calendar-day spans over one bar vector.
//! Each day is processed on its own: noise variance from the full-frequency
//! RV, quarticity from realized quadpower quarticity, then the optimal K and
//! the estimator bank on the day's log closes.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::EmpiricalConfig;
use crate::error::DataError;
use crate::estimators::{
    bipower_variation, log_returns, naive_rv, noise_variance_estimate,
    realized_quadpower_quarticity, KFallback, OptimalK, RvBank,
};
use crate::validation::{validate_bar, validate_bar_series, BarColumns};

#[derive(Debug, Error)]
pub enum EmpiricalError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Invalid record at line {line}: {source}")]
    Record {
        line: u64,
        #[source]
        source: DataError,
    },
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// One intraday OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// Read and validate a `Date,Timestamp,Open,High,Low,Close,Volume` panel.
pub fn load_bars<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>, EmpiricalError> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns = BarColumns::from_headers(reader.headers()?)?;

    let mut bars = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let bar = validate_bar(&record, &columns)
            .map_err(|source| EmpiricalError::Record { line, source })?;
        bars.push(bar);
    }

    validate_bar_series(&bars)?;
    info!(bars = bars.len(), "Loaded intraday bars");
    Ok(bars)
}

/// Half-open range `start..end` of bars belonging to one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySpan {
    pub date: NaiveDate,
    pub start: usize,
    pub end: usize,
}

impl DaySpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn increments(&self) -> usize {
        self.len().saturating_sub(1)
    }
}

/// Day boundaries over a time-ordered bar vector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayIndex {
    spans: Vec<DaySpan>,
}

impl DayIndex {
    pub fn build(bars: &[Bar]) -> Self {
        let mut spans: Vec<DaySpan> = Vec::new();
        for (i, bar) in bars.iter().enumerate() {
            let date = bar.date();
            if let Some(span) = spans.last_mut() {
                if span.date == date {
                    span.end = i + 1;
                    continue;
                }
            }
            spans.push(DaySpan {
                date,
                start: i,
                end: i + 1,
            });
        }
        Self { spans }
    }

    pub fn spans(&self) -> &[DaySpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn day<'a>(&self, bars: &'a [Bar], span: &DaySpan) -> &'a [Bar] {
        &bars[span.start..span.end]
    }
}

/// One row of the daily estimator table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRvRow {
    pub date: NaiveDate,
    pub n_increments: usize,
    pub var_eps: f64,
    pub rqq: Option<f64>,
    pub k_boost: usize,
    pub k_zma: usize,
    /// Set when the day's optimal K fell back to `(1, 1)`
    pub k_fallback: Option<KFallback>,
    pub rv_naive: f64,
    pub rv_5min: f64,
    pub rv_boost: f64,
    pub rv_zma: f64,
    /// Log of the day's last close
    pub log_close: f64,
}

pub struct DailyPipeline {
    config: EmpiricalConfig,
}

impl DailyPipeline {
    pub fn new(config: EmpiricalConfig) -> Result<Self, EmpiricalError> {
        config
            .validate()
            .map_err(|e| EmpiricalError::InvalidParameters(e.to_string()))?;
        Ok(Self { config })
    }

    pub fn run(&self, bars: &[Bar]) -> Result<Vec<DailyRvRow>, EmpiricalError> {
        validate_bar_series(bars)?;
        let index = DayIndex::build(bars);

        let mut rows = Vec::with_capacity(index.len());
        for span in index.spans() {
            match self.process_day(index.day(bars, span), span.date) {
                Some(row) => rows.push(row),
                None => debug!(date = %span.date, bars = span.len(), "Skipping day without increments"),
            }
        }

        let fallbacks = rows.iter().filter(|r| r.k_fallback.is_some()).count();
        let zma_naive = rows
            .iter()
            .filter(|r| r.k_fallback.is_none() && r.k_zma <= 1)
            .count();
        if zma_naive > 0 {
            warn!(days = zma_naive, "K_zma rounded to 1, RV_ZMA equals RV_naive on these days");
        }

        info!(
            days = index.len(),
            rows = rows.len(),
            fallbacks,
            "Daily RV table built"
        );
        Ok(rows)
    }

    /// `None` for days with fewer than one increment.
    pub fn process_day(&self, day: &[Bar], date: NaiveDate) -> Option<DailyRvRow> {
        let y: Vec<f64> = day.iter().map(|b| b.close.ln()).collect();
        let n = y.len().checked_sub(1).filter(|&n| n >= 1)?;

        let full = naive_rv(&y);
        let var_eps = noise_variance_estimate(full, n)?;
        let returns = log_returns(&y);
        let rqq = realized_quadpower_quarticity(&returns);

        let k = match rqq {
            Some(q) => OptimalK::select(var_eps, q, self.config.horizon, n),
            None => {
                warn!(%date, increments = n, "optimal K fallback to 1: {}", KFallback::TooFewReturns);
                OptimalK::disabled(KFallback::TooFewReturns)
            }
        };
        let bank = RvBank::compute(&y, k.k_sub, k.k_zma, self.config.five_min_stride);

        debug!(
            %date,
            increments = n,
            var_eps,
            rqq = ?rqq,
            bipower = ?bipower_variation(&returns),
            k_boost = k.k_sub,
            k_zma = k.k_zma,
            "day processed"
        );

        Some(DailyRvRow {
            date,
            n_increments: n,
            var_eps,
            rqq,
            k_boost: k.k_sub,
            k_zma: k.k_zma,
            k_fallback: k.fallback,
            rv_naive: bank.naive,
            rv_5min: bank.five_min,
            rv_boost: bank.subsample,
            rv_zma: bank.zma,
            log_close: *y.last()?,
        })
    }
}

#[derive(Serialize)]
struct DailyRvCsvRow {
    date: NaiveDate,
    var_eps: f64,
    #[serde(rename = "RQQ")]
    rqq: Option<f64>,
    #[serde(rename = "K_boost")]
    k_boost: usize,
    #[serde(rename = "K_zma")]
    k_zma: usize,
    #[serde(rename = "RV_naive")]
    rv_naive: f64,
    #[serde(rename = "RV_5min")]
    rv_5min: f64,
    #[serde(rename = "RV_boost")]
    rv_boost: f64,
    #[serde(rename = "RV_ZMA")]
    rv_zma: f64,
}

#[derive(Serialize)]
struct GarchInputRow {
    date: NaiveDate,
    #[serde(rename = "RV_5min")]
    rv_5min: f64,
    #[serde(rename = "RV_ZMA")]
    rv_zma: f64,
    log_close: f64,
}

/// `date,var_eps,RQQ,K_boost,K_zma,RV_naive,RV_5min,RV_boost,RV_ZMA`; RQQ is
/// empty on days with fewer than four returns.
pub fn write_daily_rv<P: AsRef<Path>>(path: P, rows: &[DailyRvRow]) -> Result<(), EmpiricalError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(DailyRvCsvRow {
            date: row.date,
            var_eps: row.var_eps,
            rqq: row.rqq,
            k_boost: row.k_boost,
            k_zma: row.k_zma,
            rv_naive: row.rv_naive,
            rv_5min: row.rv_5min,
            rv_boost: row.rv_boost,
            rv_zma: row.rv_zma,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// `date,RV_5min,RV_ZMA,log_close` input for the volatility model comparison.
pub fn write_garch_input<P: AsRef<Path>>(
    path: P,
    rows: &[DailyRvRow],
) -> Result<(), EmpiricalError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(GarchInputRow {
            date: row.date,
            rv_5min: row.rv_5min,
            rv_zma: row.rv_zma,
            log_close: row.log_close,
        })?;
    }
    writer.flush()?;
    Ok(())
}
