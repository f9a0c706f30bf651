//! Processing-path selection.
//!
//! A pure decision over file type, page count, and text-layer richness:
//! image inputs and small or text-poor PDFs take the slow (full extraction)
//! path; only large PDFs with a rich text layer take the fast path. Parse
//! failures degrade to the slow path rather than failing the request.

use crate::config::PipelineConfig;
use crate::error::IngestError;
use crate::pdf::{self, ProbeResult};
use crate::pipeline::types::{PathDecision, ProcessingPath};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "bmp"];

/// Lowercased file extension, if any.
fn extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
}

fn is_image(filename: &str) -> bool {
    extension(filename).is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

/// Reject invalid input before any pipeline stage runs.
///
/// Input errors are terminal and never retried.
pub fn validate_input(
    bytes: &[u8],
    filename: &str,
    cfg: &PipelineConfig,
) -> Result<(), IngestError> {
    if bytes.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    if bytes.len() as u64 > cfg.max_file_bytes {
        return Err(IngestError::FileTooLarge {
            size: bytes.len() as u64,
            max: cfg.max_file_bytes,
        });
    }

    let ext = extension(filename).ok_or_else(|| IngestError::UnsupportedFileType {
        extension: String::new(),
    })?;
    if ext != "pdf" && !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(IngestError::UnsupportedFileType { extension: ext });
    }

    if !magic_matches(bytes, &ext) {
        return Err(IngestError::InvalidMagic);
    }

    Ok(())
}

/// Check leading magic bytes against the declared extension.
fn magic_matches(bytes: &[u8], ext: &str) -> bool {
    match ext {
        "pdf" => bytes.starts_with(b"%PDF"),
        "jpg" | "jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "png" => bytes.starts_with(&[0x89, b'P', b'N', b'G']),
        "tif" | "tiff" => bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*"),
        "bmp" => bytes.starts_with(b"BM"),
        _ => false,
    }
}

/// Decide the processing path for a document.
///
/// When `probe` is absent and the input is a PDF, the document is probed
/// here; probing is deterministic over the bytes, so identical inputs always
/// yield identical decisions. Callers that already probed pass the result
/// through to avoid a second parse.
pub fn decide(
    bytes: &[u8],
    filename: &str,
    probe: Option<&ProbeResult>,
    cfg: &PipelineConfig,
) -> PathDecision {
    if is_image(filename) {
        return PathDecision {
            path: ProcessingPath::SlowPath,
            reason: "image input has no text layer".to_string(),
            probe: None,
            needs_split: false,
        };
    }

    let owned;
    let probe = match probe {
        Some(p) => p,
        None => match pdf::probe(bytes, cfg.char_threshold) {
            Ok(p) => {
                owned = p;
                &owned
            }
            Err(e) => {
                return PathDecision {
                    path: ProcessingPath::SlowPath,
                    reason: format!("document could not be probed: {e:#}"),
                    probe: None,
                    needs_split: false,
                };
            }
        },
    };

    let decision = if probe.page_count <= cfg.page_threshold {
        // Full extraction is cheap at this size; even a rich text layer is
        // discarded in favor of extraction accuracy.
        PathDecision {
            path: ProcessingPath::SlowPath,
            reason: format!(
                "{} pages within threshold {}; full extraction preferred",
                probe.page_count, cfg.page_threshold
            ),
            probe: Some(probe.clone()),
            needs_split: false,
        }
    } else if probe.char_count >= cfg.char_threshold {
        PathDecision {
            path: ProcessingPath::FastPath,
            reason: format!(
                "{} pages with {} text-layer chars; reusing text layer",
                probe.page_count, probe.char_count
            ),
            probe: Some(probe.clone()),
            needs_split: false,
        }
    } else {
        PathDecision {
            path: ProcessingPath::SlowPath,
            reason: format!(
                "{} pages but only {} text-layer chars; splitting for extraction",
                probe.page_count, probe.char_count
            ),
            probe: Some(probe.clone()),
            needs_split: true,
        }
    };

    tracing::debug!(
        path = %decision.path,
        needs_split = decision.needs_split,
        reason = %decision.reason,
        "Selected processing path"
    );

    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_result(page_count: usize, char_count: usize) -> ProbeResult {
        ProbeResult {
            has_text_layer: char_count >= 400,
            char_count,
            page_count,
            text_content: Some("x".repeat(char_count)),
        }
    }

    #[test]
    fn images_always_take_slow_path() {
        let cfg = PipelineConfig::default();
        for name in ["scan.jpg", "scan.JPEG", "page.png", "img.tiff", "img.bmp"] {
            let decision = decide(&[0xFF], name, None, &cfg);
            assert_eq!(decision.path, ProcessingPath::SlowPath, "{name}");
            assert!(!decision.needs_split);
        }
    }

    #[test]
    fn small_pdfs_take_slow_path_regardless_of_text() {
        let cfg = PipelineConfig::default();
        for pages in [1, 8, 15] {
            let probe = probe_result(pages, 100_000);
            let decision = decide(b"%PDF", "cert.pdf", Some(&probe), &cfg);
            assert_eq!(decision.path, ProcessingPath::SlowPath, "{pages} pages");
            assert!(!decision.needs_split);
        }
    }

    #[test]
    fn large_pdf_with_rich_text_layer_is_fast() {
        let cfg = PipelineConfig::default();
        let probe = probe_result(20, 600);
        let decision = decide(b"%PDF", "cert.pdf", Some(&probe), &cfg);
        assert_eq!(decision.path, ProcessingPath::FastPath);
        assert!(!decision.needs_split);
    }

    #[test]
    fn large_pdf_with_thin_text_layer_needs_split() {
        let cfg = PipelineConfig::default();
        let probe = probe_result(40, 399);
        let decision = decide(b"%PDF", "scan.pdf", Some(&probe), &cfg);
        assert_eq!(decision.path, ProcessingPath::SlowPath);
        assert!(decision.needs_split);
    }

    #[test]
    fn boundary_at_exact_thresholds() {
        let cfg = PipelineConfig::default();

        // 16 pages, exactly 400 chars: fast
        let decision = decide(b"%PDF", "a.pdf", Some(&probe_result(16, 400)), &cfg);
        assert_eq!(decision.path, ProcessingPath::FastPath);

        // exactly 15 pages: slow
        let decision = decide(b"%PDF", "a.pdf", Some(&probe_result(15, 400)), &cfg);
        assert_eq!(decision.path, ProcessingPath::SlowPath);
    }

    #[test]
    fn unparseable_pdf_degrades_to_slow_path() {
        let cfg = PipelineConfig::default();
        let decision = decide(b"%PDF garbage", "broken.pdf", None, &cfg);
        assert_eq!(decision.path, ProcessingPath::SlowPath);
        assert!(decision.reason.contains("could not be probed"));
    }

    #[test]
    fn decision_is_deterministic() {
        let cfg = PipelineConfig::default();
        let bytes = crate::pdf::testpdf::create_pdf_with_pages(3, "same content");
        let first = decide(&bytes, "a.pdf", None, &cfg);
        let second = decide(&bytes, "a.pdf", None, &cfg);
        assert_eq!(first.path, second.path);
        assert_eq!(first.needs_split, second.needs_split);
        assert_eq!(first.reason, second.reason);
    }

    #[test]
    fn validate_rejects_bad_input() {
        let cfg = PipelineConfig::default();

        assert!(matches!(
            validate_input(b"", "a.pdf", &cfg),
            Err(IngestError::EmptyFile)
        ));
        assert!(matches!(
            validate_input(b"%PDF", "a.docx", &cfg),
            Err(IngestError::UnsupportedFileType { .. })
        ));
        assert!(matches!(
            validate_input(b"not a pdf", "a.pdf", &cfg),
            Err(IngestError::InvalidMagic)
        ));

        let mut small_cfg = PipelineConfig::default();
        small_cfg.max_file_bytes = 4;
        assert!(matches!(
            validate_input(b"%PDF-1.4", "a.pdf", &small_cfg),
            Err(IngestError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn validate_accepts_known_types() {
        let cfg = PipelineConfig::default();
        assert!(validate_input(b"%PDF-1.4 rest", "cert.pdf", &cfg).is_ok());
        assert!(validate_input(&[0xFF, 0xD8, 0xFF, 0x00], "scan.jpg", &cfg).is_ok());
        assert!(validate_input(&[0x89, b'P', b'N', b'G'], "scan.png", &cfg).is_ok());
    }
}
