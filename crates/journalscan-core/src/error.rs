// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for journalscan.
//
// Only decoding (and the I/O around it) is fatal to a pipeline run. Conditions
// the pipeline recovers from are recorded as `PipelineWarning`s in the report.

use thiserror::Error;

/// Top-level error type for all journalscan operations.
#[derive(Debug, Error)]
pub enum JournalScanError {
    // -- Image errors --
    #[error("could not decode image: {0}")]
    Decode(String),

    #[error("raster must have non-zero size (got {width}x{height})")]
    EmptyRaster { width: u32, height: u32 },

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, JournalScanError>;
