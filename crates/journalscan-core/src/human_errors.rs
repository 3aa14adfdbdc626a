// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the journaling front end.
//
// The pipeline always yields an image for a decodable photo, so the only
// failure a journaler should normally see is "could not open the photo".

use crate::error::JournalScanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Retrying may work (e.g. the file was still being written).
    Transient,
    /// The user must pick a different file or fix a setting.
    ActionRequired,
    /// A bug or environment problem the user cannot fix.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether retrying the same action can succeed.
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `JournalScanError` into a message a journaler can act on.
pub fn humanize_error(err: &JournalScanError) -> HumanError {
    match err {
        JournalScanError::Decode(_) | JournalScanError::EmptyRaster { .. } => HumanError {
            message: "We couldn't open that photo.".into(),
            suggestion: "Choose a JPEG, PNG, HEIC-exported or TIFF photo of your journal page and try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        JournalScanError::Encode(detail) => HumanError {
            message: "We couldn't save the cleaned-up page.".into(),
            suggestion: format!("Check there is free space on your disk, then try again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        JournalScanError::Ocr(_) => HumanError {
            message: "We couldn't read the handwriting on this page.".into(),
            suggestion: "Make sure the text-recognition models are installed, then try again.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        JournalScanError::InvalidConfig(detail) => HumanError {
            message: "One of the scan settings is out of range.".into(),
            suggestion: format!("Reset the scan settings to their defaults. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        JournalScanError::Io(io) => humanize_io_error(io),

        JournalScanError::Serialization(_) => HumanError {
            message: "The settings file is damaged.".into(),
            suggestion: "Delete the settings file or fix its contents; defaults will be used.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}

fn humanize_io_error(io: &std::io::Error) -> HumanError {
    match io.kind() {
        std::io::ErrorKind::NotFound => HumanError {
            message: "We couldn't open that photo.".into(),
            suggestion: "The file may have been moved or deleted. Pick it again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        std::io::ErrorKind::PermissionDenied => HumanError {
            message: "We don't have permission to open that file.".into(),
            suggestion: "Allow access to the folder in your system settings, then try again.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
        _ => HumanError {
            message: "Something went wrong reading or writing a file.".into(),
            suggestion: format!("Try again in a moment. ({io})"),
            retriable: true,
            severity: Severity::Transient,
        },
    }
}
