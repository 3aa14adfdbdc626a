// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// journalscan: prepare photos of handwritten journal pages for OCR.
//
// Entry point. Initialises logging, builds the pipeline from the command line,
// and runs the batch.

mod batch;
mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use journalscan_core::human_errors::humanize_error;
use journalscan_imaging::PreprocessingPipeline;

use batch::{BatchSettings, PageOutcome, process_batch};
use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(images = cli.images.len(), "journalscan starting");

    let config = match cli.pipeline_config() {
        Ok(config) => config,
        Err(err) => {
            let human = humanize_error(&err);
            eprintln!("{} {}", human.message, human.suggestion);
            tracing::error!(error = %err, "invalid configuration");
            return ExitCode::from(2);
        }
    };

    if let Err(err) = std::fs::create_dir_all(&cli.out) {
        eprintln!("Could not create output directory {}: {err}", cli.out.display());
        return ExitCode::from(2);
    }

    let pipeline = match PreprocessingPipeline::from_config(&config) {
        Ok(pipeline) => Arc::new(pipeline),
        Err(err) => {
            tracing::error!(error = %err, "pipeline construction failed");
            return ExitCode::from(2);
        }
    };
    let settings = Arc::new(BatchSettings {
        out_dir: cli.out.clone(),
        params: config.enhancement.clone(),
        enhance: !cli.no_enhance,
        jobs: cli.job_count(),
    });

    let outcomes = process_batch(pipeline, settings, cli.images.clone()).await;

    let mut failures = 0usize;
    for outcome in &outcomes {
        match outcome {
            PageOutcome::Written {
                input,
                image_path,
                report_path,
                path_taken,
            } => {
                println!(
                    "{} -> {} ({:?}, report {})",
                    input.display(),
                    image_path.display(),
                    path_taken,
                    report_path.display()
                );
            }
            PageOutcome::Failed {
                input,
                error,
                detail,
            } => {
                failures += 1;
                eprintln!(
                    "{}: {} {} [{}]",
                    input.display(),
                    error.message,
                    error.suggestion,
                    detail
                );
            }
        }
    }

    tracing::info!(
        processed = outcomes.len() - failures,
        failed = failures,
        "journalscan finished"
    );
    if outcomes.iter().any(PageOutcome::is_failure) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
