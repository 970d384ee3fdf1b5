pub mod accuracy;
pub mod empirical;
pub mod simulation;

pub use accuracy::{score_column, AccuracyReport, AccuracyRow};
pub use empirical::{
    load_bars, write_daily_rv, write_garch_input, Bar, DailyPipeline, DailyRvRow, DayIndex,
    DaySpan, EmpiricalError,
};
pub use simulation::{EnsembleResult, KSelection, MonteCarloDriver, SimulationError, TrialRecord};
