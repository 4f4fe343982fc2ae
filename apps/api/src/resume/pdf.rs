use bytes::Bytes;
use tracing::{info, warn};

use crate::errors::AppError;

/// Extracts text from PDF bytes on the blocking pool.
/// Errors when the document parses but yields no text (scanned resumes).
pub async fn extract_pdf_text(data: Bytes) -> Result<String, AppError> {
    let size = data.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&data))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in PDF extraction: {e}")))?
        .map_err(|e| {
            warn!("PDF text extraction failed ({size} bytes): {e}");
            AppError::Internal(anyhow::anyhow!("PDF 텍스트 추출 실패: {e}"))
        })?;

    let text = normalize_text(&text);
    if text.is_empty() {
        return Err(AppError::Internal(anyhow::anyhow!(
            "PDF 텍스트 추출 실패: no extractable text"
        )));
    }

    info!("Extracted {} characters from a {size}-byte PDF", text.chars().count());
    Ok(text)
}

/// Drops blank lines and trailing whitespace left behind by the extractor.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text_drops_blank_lines() {
        let raw = "김개발  \n\n\n  백엔드 엔지니어\n   \nRust, AWS\n";
        assert_eq!(normalize_text(raw), "김개발\n  백엔드 엔지니어\nRust, AWS");
    }

    #[tokio::test]
    async fn test_garbage_bytes_are_rejected() {
        let result = extract_pdf_text(Bytes::from_static(b"definitely not a pdf")).await;
        assert!(result.is_err());
    }
}
