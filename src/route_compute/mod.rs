mod frontier;
mod ksp;
mod label_setting;
pub mod metric;
mod records;

pub use ksp::KShortestPaths;
pub use label_setting::{LabelSettingEngine, RelaxationMode, SearchQuery, SearchSummary, Seed};
pub use metric::{
    replay, DelayConstrainedMetric, Direction, EdgeMetric, EdgeOnly, Excluding, Hop,
    LoadAwareMetric, LoopFreeMetric, MetricShape, PathMetric, Potentials, PreviousEdgeMetric,
    PreviousEdgeOnly, Step, TurnPenaltyMetric, Visibility, WeightMetric,
};
