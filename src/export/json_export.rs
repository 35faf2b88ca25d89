use std::fs;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::model::ChartEntry;
use crate::export::Exporter;

/// Writes the fused chart as `chart.json`, the literal wire payload the
/// dental-chart API ingests.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    out_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(out_dir: PathBuf) -> Self {
        Self { out_dir }
    }
}

impl Exporter for JsonExporter {
    fn export(&self, chart: &[ChartEntry]) -> Result<()> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join("chart.json");
        let data = serde_json::to_string_pretty(chart)?;
        fs::write(path, data)?;
        Ok(())
    }
}
