// Pipeline processing: reshaping parsed records into analysis-ready tables

pub mod behavior;
pub mod destination;
pub mod potential;
pub mod spending;
pub mod visitors;

pub use behavior::BehaviorScoreTable;
pub use potential::{PotentialRow, PotentialTable, YearlyAvgSpend};
pub use spending::SpendPartition;
pub use visitors::AnnualVisitors;
