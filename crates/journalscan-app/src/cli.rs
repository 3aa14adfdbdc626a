// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments and how they fold into a pipeline configuration.

use std::path::PathBuf;

use clap::Parser;
use journalscan_core::PipelineConfig;
use journalscan_core::error::Result;

#[derive(Debug, Parser)]
#[command(name = "journalscan")]
#[command(about = "Straighten, crop and enhance photos of handwritten journal pages for OCR")]
#[command(version)]
pub struct Cli {
    /// Photos to process (JPEG, PNG, TIFF, ...).
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Directory for `<stem>.processed.png` and `<stem>.report.json`.
    #[arg(long)]
    pub out: PathBuf,

    /// JSON pipeline configuration. Missing fields take their defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Quantisation steps per colour channel (2 to 8).
    #[arg(long)]
    pub posterize: Option<u8>,

    /// Contrast multiplier (1.5 to 2.5).
    #[arg(long)]
    pub contrast: Option<f32>,

    /// Final gamma exponent (0.3 to 0.6).
    #[arg(long)]
    pub gamma: Option<f32>,

    /// Pages processed at once. Defaults to the number of CPUs.
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Only fix page geometry; skip the enhancement chain.
    #[arg(long)]
    pub no_enhance: bool,
}

impl Cli {
    /// Load the config file (or defaults), apply flag overrides, validate.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(levels) = self.posterize {
            config.enhancement.posterize_levels = levels;
        }
        if let Some(contrast) = self.contrast {
            config.enhancement.contrast_level = contrast;
        }
        if let Some(gamma) = self.gamma {
            config.enhancement.gamma_level = gamma;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn job_count(&self) -> usize {
        self.jobs
            .filter(|&n| n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }
}
