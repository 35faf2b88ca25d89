pub mod json_export;

use anyhow::Result;

use crate::core::model::ChartEntry;

pub use json_export::JsonExporter;

pub trait Exporter {
    fn export(&self, chart: &[ChartEntry]) -> Result<()>;
}
