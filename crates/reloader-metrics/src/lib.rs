pub mod collector;

pub use collector::{CycleResult, ReloaderMetrics};
