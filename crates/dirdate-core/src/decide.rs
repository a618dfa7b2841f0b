use chrono::NaiveDate;

use crate::naming::{clean_folder_name, CaseStyle};
use crate::scan::DateHistogram;

pub const NO_VALID_DATES: &str = "no valid dates";

/// What to do with one folder, given its date evidence.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Rename {
        date: NaiveDate,
        proposed_name: String,
        confidence: f64,
    },
    /// The proposed name is the current name
    Unchanged { proposed_name: String, confidence: f64 },
    Skip { reason: String, confidence: Option<f64> },
}

/// Share of scanned files that agree on the mode date, in `[0, 1]`.
pub fn confidence(mode_count: usize, total_scanned: usize) -> f64 {
    if total_scanned == 0 {
        return 0.0;
    }
    (mode_count as f64 / total_scanned as f64).min(1.0)
}

/// Turn a histogram into a rename proposal or a skip.
///
/// The mode date wins; among dates with equal counts the one seen first
/// during the scan wins. A confidence exactly at `threshold` passes.
pub fn decide(histogram: &DateHistogram, folder_name: &str, threshold: f64, case: CaseStyle) -> Decision {
    let Some((date, count)) = histogram.mode() else {
        return Decision::Skip {
            reason: NO_VALID_DATES.to_string(),
            confidence: None,
        };
    };

    let confidence = confidence(count, histogram.total_scanned);
    if confidence < threshold {
        return Decision::Skip {
            reason: format!("low confidence: {:.2}", confidence),
            confidence: Some(confidence),
        };
    }

    let cleaned = clean_folder_name(folder_name, case);
    let proposed_name = format!("{} {}", date.format("%Y-%m-%d"), cleaned)
        .trim_end()
        .to_string();

    if proposed_name == folder_name {
        Decision::Unchanged { proposed_name, confidence }
    } else {
        Decision::Rename {
            date,
            proposed_name,
            confidence,
        }
    }
}
