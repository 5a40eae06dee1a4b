use thiserror::Error;

/// Extensions read as plain UTF-8 regardless of the declared content type.
const TEXT_EXTENSIONS: &[&str] = &[
    ".txt", ".md", ".markdown", ".csv", ".tsv", ".json", ".xml", ".html", ".htm", ".log", ".yaml",
    ".yml", ".rtf",
];

const TEXT_CONTENT_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/x-yaml",
    "application/rtf",
];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),

    #[error("failed to read PDF: {0}")]
    Pdf(String),

    #[error("document contains no text")]
    NoText,
}

/// Pull plain text out of a stored document.
///
/// PDF parsing is CPU-bound and can panic on malformed input, so it runs on
/// the blocking pool and a panic surfaces as [`ExtractError::Pdf`].
pub async fn extract_text(
    content_type: &str,
    extension: &str,
    bytes: Vec<u8>,
) -> Result<String, ExtractError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let text = if extension == ".pdf" || mime == "application/pdf" {
        tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ExtractError::Pdf(e.to_string()))?
            .map_err(|e| ExtractError::Pdf(e.to_string()))?
    } else if mime.starts_with("text/")
        || TEXT_CONTENT_TYPES.contains(&mime.as_str())
        || TEXT_EXTENSIONS.contains(&extension)
    {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        return Err(ExtractError::Unsupported(if mime.is_empty() {
            extension.to_string()
        } else {
            mime
        }));
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(ExtractError::NoText);
    }
    Ok(text.to_string())
}
