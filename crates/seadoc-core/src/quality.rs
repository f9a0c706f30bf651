//! OCR quality gating.
//!
//! Scores extracted text with cheap lexical heuristics and gates the
//! expensive AI correction call behind the score. Correction failure keeps
//! the original text; it is never fatal to the pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::collab::TextCorrector;

/// Assessment of extracted text quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// 0 (garbage) to 100 (clean).
    pub quality_score: u8,
    pub needs_correction: bool,
    /// Human-readable findings behind the score.
    pub issues: Vec<String>,
}

/// Text after the optional correction step.
#[derive(Debug, Clone)]
pub struct CorrectedText {
    pub text: String,
    pub corrected: bool,
}

/// Score text quality.
///
/// The score is a weighted blend of word-character ratio, control-character
/// density, replacement-character density, and broken-line frequency. The
/// heuristic is monotone: injecting garbling into text never raises its
/// score.
pub fn assess(text: &str, quality_threshold: u8) -> QualityAssessment {
    if text.trim().is_empty() {
        return QualityAssessment {
            quality_score: 0,
            needs_correction: true,
            issues: vec!["text is empty".to_string()],
        };
    }

    let total = text.chars().count() as f64;
    let mut issues = Vec::new();

    let word_chars = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || ",.;:-/()'\"".contains(*c))
        .count() as f64;
    let word_ratio = word_chars / total;
    if word_ratio < 0.85 {
        issues.push(format!(
            "low recognizable-character ratio: {:.0}%",
            word_ratio * 100.0
        ));
    }

    let control = text
        .chars()
        .filter(|c| c.is_control() && *c != '\n' && *c != '\r' && *c != '\t')
        .count() as f64;
    let control_density = control / total;
    if control_density > 0.0 {
        issues.push(format!(
            "control characters present: {:.1}%",
            control_density * 100.0
        ));
    }

    let replacement = text.chars().filter(|c| *c == '\u{FFFD}').count() as f64;
    let replacement_density = replacement / total;
    if replacement_density > 0.0 {
        issues.push(format!(
            "replacement characters present: {:.1}%",
            replacement_density * 100.0
        ));
    }

    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let broken_lines = lines
        .iter()
        .filter(|l| {
            // Counted by word characters, so padding a line with garbage
            // never moves it past the cutoff
            let line_word_chars = l.chars().filter(|c| c.is_alphanumeric()).count();
            line_word_chars < 4 && !l.trim().chars().all(|c| c.is_ascii_digit())
        })
        .count() as f64;
    let broken_ratio = if lines.is_empty() {
        0.0
    } else {
        broken_lines / lines.len() as f64
    };
    if broken_ratio > 0.3 {
        issues.push(format!("fragmented lines: {:.0}%", broken_ratio * 100.0));
    }

    let score = 100.0
        * word_ratio
        * (1.0 - control_density * 10.0).max(0.0)
        * (1.0 - replacement_density * 5.0).max(0.0)
        * (1.0 - broken_ratio * 0.5);
    let quality_score = score.clamp(0.0, 100.0) as u8;

    QualityAssessment {
        quality_score,
        needs_correction: quality_score < quality_threshold,
        issues,
    }
}

/// Run AI correction when the assessment calls for it.
///
/// The call is bounded by `timeout`; expiry, failure, and no-op all keep the
/// original text flagged uncorrected.
pub async fn maybe_correct(
    text: &str,
    assessment: &QualityAssessment,
    filename: &str,
    corrector: &dyn TextCorrector,
    timeout: Duration,
) -> CorrectedText {
    if !assessment.needs_correction {
        return CorrectedText {
            text: text.to_string(),
            corrected: false,
        };
    }

    match tokio::time::timeout(timeout, corrector.correct(text, filename)).await {
        Ok(Ok(correction)) if correction.success && correction.correction_applied => {
            tracing::info!(
                filename,
                score = assessment.quality_score,
                "Applied AI text correction"
            );
            CorrectedText {
                text: correction.corrected_text,
                corrected: true,
            }
        }
        Ok(Ok(_)) => {
            tracing::debug!(filename, "Correction was a no-op, keeping original text");
            CorrectedText {
                text: text.to_string(),
                corrected: false,
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(filename, error = %e, "Text correction failed, keeping original text");
            CorrectedText {
                text: text.to_string(),
                corrected: false,
            }
        }
        Err(_) => {
            tracing::warn!(
                filename,
                timeout_secs = timeout.as_secs(),
                "Text correction timed out, keeping original text"
            );
            CorrectedText {
                text: text.to_string(),
                corrected: false,
            }
        }
    }
}
