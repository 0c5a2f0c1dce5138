//! Command-line profiler for built-in and JSON-described networks.

use clap::Parser;
use net_calculator::config::ProfileConfig;
use net_calculator::model::Model;
use net_calculator::models::Architecture;
use net_calculator::report::dot::write_dot;
use net_calculator::report::ReportFormat;
use net_calculator::serialization::load_model;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Static MAC, parameter and sparsity profiler for layer graphs", long_about = None)]
struct Args {
    /// Built-in architecture to profile
    #[arg(short, long, value_enum)]
    arch: Option<Architecture>,

    /// JSON model description to profile instead of a built-in architecture
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    format: Option<ReportFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also write the layer graph in Graphviz DOT format
    #[arg(long)]
    dot: Option<PathBuf>,

    /// JSON run configuration; flags override its settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print plain numbers instead of K/M/G/B suffixes
    #[arg(long)]
    raw: bool,
}

impl Args {
    fn into_config(self) -> Result<ProfileConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ProfileConfig::load(path)?,
            None => ProfileConfig::default(),
        };
        if let Some(arch) = self.arch {
            config.architecture = arch;
            config.model_path = None;
        }
        if self.model.is_some() {
            config.model_path = self.model;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if self.output.is_some() {
            config.output = self.output;
        }
        if self.dot.is_some() {
            config.dot = self.dot;
        }
        config.raw_numbers |= self.raw;
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false).with_writer(io::stderr))
        .init();

    let config = Args::parse().into_config()?;

    let mut model = build_model(&config)?;
    let report = model.profile()?;

    match &config.output {
        Some(path) => {
            let file = create_file(path)?;
            report.write(config.format, BufWriter::new(file), config.raw_numbers)?;
            info!(path = %path.display(), format = ?config.format, "report written");
        }
        None => report.write(config.format, io::stdout().lock(), config.raw_numbers)?,
    }

    if let Some(path) = &config.dot {
        let mut writer = BufWriter::new(create_file(path)?);
        write_dot(&model, &mut writer)?;
        writer.flush()?;
        info!(path = %path.display(), "layer graph written");
    }
    Ok(())
}

fn build_model(config: &ProfileConfig) -> Result<Model, Box<dyn std::error::Error>> {
    match &config.model_path {
        Some(path) => {
            info!(path = %path.display(), "loading model description");
            Ok(load_model(path)?)
        }
        None => {
            info!(arch = %config.architecture, "building architecture");
            Ok(config.architecture.build()?)
        }
    }
}

fn create_file(path: &Path) -> io::Result<File> {
    if path.exists() {
        warn!(path = %path.display(), "overwriting existing file");
    }
    File::create(path)
}
