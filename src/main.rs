use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use dentfuse::core::positions::IsoClassMap;
use dentfuse::detector::{Detector, JsonDetector};
use dentfuse::export::{Exporter, JsonExporter};
use dentfuse::{ChartFusionEngine, FusionConfig, FusionEngine, OrphanPolicy};

#[derive(Parser, Debug)]
#[command(name = "dentfuse")]
#[command(version, about = "Fuse dental anatomy and pathology detections into a chart", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fuse two detector output files into a chart
    Fuse {
        /// Anatomy detector output (JSON list of tooth records)
        anatomy: PathBuf,

        /// Pathology detector output (JSON list of finding records)
        pathology: PathBuf,

        /// Output directory for chart.json (default: ./chart_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Custom ISO class map (JSON object of class_id -> position)
        #[arg(long)]
        iso_map: Option<PathBuf>,

        /// Policy for updates that reference no chartable tooth
        #[arg(long, value_enum, default_value_t = Orphans::Emit)]
        orphans: Orphans,

        /// Discard detector records at or below this score
        #[arg(long)]
        min_score: Option<f32>,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show summary information about detector output files
    Inspect {
        /// Anatomy detector output
        anatomy: PathBuf,

        /// Pathology detector output
        pathology: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Orphans {
    Emit,
    Drop,
    Placeholder,
}

impl From<Orphans> for OrphanPolicy {
    fn from(value: Orphans) -> Self {
        match value {
            Orphans::Emit => OrphanPolicy::Emit,
            Orphans::Drop => OrphanPolicy::Drop,
            Orphans::Placeholder => OrphanPolicy::Placeholder,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fuse {
            anatomy,
            pathology,
            output,
            iso_map,
            orphans,
            min_score,
            quiet,
        } => fuse(anatomy, pathology, output, iso_map, orphans, min_score, quiet),
        Commands::Inspect { anatomy, pathology } => inspect(anatomy, pathology),
    }
}

#[allow(clippy::too_many_arguments)]
fn fuse(
    anatomy: PathBuf,
    pathology: PathBuf,
    output: Option<PathBuf>,
    iso_map: Option<PathBuf>,
    orphans: Orphans,
    min_score: Option<f32>,
    quiet: bool,
) -> Result<()> {
    for input in [&anatomy, &pathology] {
        if !input.is_file() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
    }

    let output_dir = output.unwrap_or_else(|| PathBuf::from("chart_output"));

    let mut detector = JsonDetector::new(anatomy.clone(), pathology.clone());
    if let Some(path) = iso_map {
        detector = detector.with_iso_map(
            IsoClassMap::from_path(&path)
                .with_context(|| format!("Failed to load ISO map: {}", path.display()))?,
        );
    }
    if let Some(floor) = min_score {
        detector = detector.with_min_score(floor);
    }

    if !quiet {
        println!("[*] Anatomy: {}", anatomy.display());
        println!("[*] Pathology: {}", pathology.display());
        println!("[*] Output: {}", output_dir.display());
    }

    let teeth = detector.anatomy_findings()?;
    let findings = detector.pathology_findings()?;

    let engine = ChartFusionEngine::with_config(FusionConfig {
        orphan_policy: orphans.into(),
        ..FusionConfig::default()
    });
    let chart = engine.fuse(&teeth, &findings)?;

    if !quiet {
        let updates = chart.iter().filter(|e| e.as_update().is_some()).count();
        println!(
            "[+] Fused {} teeth and {} findings into {} entries ({} updates)",
            teeth.len(),
            findings.len(),
            chart.len(),
            updates
        );
    }

    JsonExporter::new(output_dir.clone())
        .export(&chart)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    if !quiet {
        println!("[✓] Done! Chart saved to: {}", output_dir.join("chart.json").display());
    }

    Ok(())
}

fn inspect(anatomy: PathBuf, pathology: PathBuf) -> Result<()> {
    let detector = JsonDetector::new(anatomy.clone(), pathology.clone());
    let teeth = detector.anatomy_findings()?;
    let findings = detector.pathology_findings()?;

    println!("Detector Output");
    println!("===============");
    println!("Teeth: {}", teeth.len());
    let positions: Vec<String> = teeth.iter().map(|t| t.sub_label.clone()).collect();
    println!("Positions: {}", positions.join(", "));

    println!("Findings: {}", findings.len());
    let mut by_label: BTreeMap<String, usize> = BTreeMap::new();
    for finding in &findings {
        *by_label.entry(finding.label.clone()).or_default() += 1;
    }
    for (label, count) in by_label {
        println!("  {}: {}", label, count);
    }

    Ok(())
}
