//! CLI argument parsing for bdg-replication

use crate::config::AnalysisConfig;
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bdg-replication")]
#[command(version)]
#[command(about = "Replicate the Bullying Dictator Game analysis and render an HTML report", long_about = None)]
pub struct Cli {
    /// TOML file overriding the built-in analysis configuration
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Local dataset path (used as the download cache)
    #[arg(short, long, value_name = "PATH")]
    pub data: Option<PathBuf>,

    /// Remote dataset location, fetched only when the local file is missing
    #[arg(long = "data-url", value_name = "URL")]
    pub data_url: Option<String>,

    /// Directory receiving the report and chart files
    #[arg(short, long = "output-dir", value_name = "DIR", default_value = "report")]
    pub output_dir: PathBuf,

    /// Enable debug tracing output (to stderr)
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied
    pub fn analysis_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(data) = &self.data {
            config.data.cache_path = data.clone();
        }
        if let Some(url) = &self.data_url {
            config.data.url = Some(url.clone());
        }
        config.output.dir = self.output_dir.clone();
        Ok(config)
    }
}
