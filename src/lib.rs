pub mod core;
pub mod detector;
pub mod export;
pub mod fusion;

pub use core::model::{AnatomyFinding, ChartEntry, PathologyFinding};
pub use fusion::{ChartFusionEngine, FusionConfig, FusionEngine, OrphanPolicy};
