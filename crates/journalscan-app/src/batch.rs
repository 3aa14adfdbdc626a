// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch processing. Each page is an independent pipeline invocation on the
// tokio blocking pool; a semaphore caps how many run at once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use journalscan_core::error::{JournalScanError, Result};
use journalscan_core::human_errors::{HumanError, humanize_error};
use journalscan_core::{EnhancementParameters, PathTaken};
use journalscan_imaging::{PreprocessingPipeline, RasterBuffer};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, instrument};

/// Shared, read-only settings for one batch.
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub out_dir: PathBuf,
    pub params: EnhancementParameters,
    pub enhance: bool,
    pub jobs: usize,
}

/// What happened to one input file.
#[derive(Debug)]
pub enum PageOutcome {
    Written {
        input: PathBuf,
        image_path: PathBuf,
        report_path: PathBuf,
        path_taken: PathTaken,
    },
    Failed {
        input: PathBuf,
        error: HumanError,
        detail: String,
    },
}

impl PageOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// `<out_dir>/<stem>.processed.png` and `<out_dir>/<stem>.report.json`.
pub fn output_paths(out_dir: &Path, input: &Path) -> (PathBuf, PathBuf) {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    (
        out_dir.join(format!("{stem}.processed.png")),
        out_dir.join(format!("{stem}.report.json")),
    )
}

/// Run one page start to finish. Blocking.
#[instrument(skip(pipeline, settings), fields(input = %input.display()))]
pub fn process_page(
    pipeline: &PreprocessingPipeline,
    settings: &BatchSettings,
    input: &Path,
) -> Result<PageOutcome> {
    let image = RasterBuffer::open(input)?;
    let result = if settings.enhance {
        pipeline.process(image, &settings.params)
    } else {
        pipeline.normalize(image)
    };

    let (image_path, report_path) = output_paths(&settings.out_dir, input);
    result.image().save(&image_path)?;
    let json = serde_json::to_string_pretty(result.report())?;
    std::fs::write(&report_path, json)?;

    info!(
        path = ?result.path_taken(),
        output = %image_path.display(),
        "Page written"
    );
    Ok(PageOutcome::Written {
        input: input.to_path_buf(),
        image_path,
        report_path,
        path_taken: result.path_taken(),
    })
}

fn failed(input: PathBuf, err: &JournalScanError) -> PageOutcome {
    error!(input = %input.display(), error = %err, "Page failed");
    PageOutcome::Failed {
        input,
        error: humanize_error(err),
        detail: err.to_string(),
    }
}

/// Process every input, at most `settings.jobs` at a time. Results come back
/// in input order; one failed page never stops the others.
pub async fn process_batch(
    pipeline: Arc<PreprocessingPipeline>,
    settings: Arc<BatchSettings>,
    inputs: Vec<PathBuf>,
) -> Vec<PageOutcome> {
    let permits = Arc::new(Semaphore::new(settings.jobs.max(1)));
    let mut tasks = JoinSet::new();

    for (index, input) in inputs.iter().cloned().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        let settings = Arc::clone(&settings);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                let err = JournalScanError::Io(std::io::Error::other("batch was shut down"));
                return (index, failed(input, &err));
            };
            let page = input.clone();
            let joined =
                tokio::task::spawn_blocking(move || process_page(&pipeline, &settings, &page))
                    .await;
            let outcome = match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => failed(input, &err),
                Err(join_err) => failed(
                    input,
                    &JournalScanError::Io(std::io::Error::other(join_err.to_string())),
                ),
            };
            (index, outcome)
        });
    }

    let mut outcomes: Vec<Option<PageOutcome>> = inputs.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, outcome)) => outcomes[index] = Some(outcome),
            Err(join_err) => error!(error = %join_err, "Batch task aborted"),
        }
    }

    outcomes
        .into_iter()
        .zip(inputs)
        .map(|(outcome, input)| {
            outcome.unwrap_or_else(|| {
                failed(
                    input,
                    &JournalScanError::Io(std::io::Error::other("task did not complete")),
                )
            })
        })
        .collect()
}
