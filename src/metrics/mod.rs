// Metric model.
// Metric kinds, their on-disk schema, and the daily time series shared by every layer.

pub mod kind;
pub mod series;

pub use kind::MetricKind;
pub use series::{DailyCount, DailyTally, MetricSeries, to_date};
