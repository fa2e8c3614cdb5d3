//! The (HTML, Markdown) pair produced from one model response.

/// Separator the model is asked to put between the HTML and Markdown renderings.
pub const PAYLOAD_SEPARATOR: &str = "\n---\n";

/// Prefix of the placeholder shown in place of extracted content when inference fails.
pub const FALLBACK_PREFIX: &str = "Error extracting LaTeX";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub html: String,
    pub markdown: String,
}

impl ExtractionResult {
    /// Splits a model response on the first separator. Without a separator both payloads carry
    /// the full (trimmed) text.
    pub fn from_response_text(text: &str) -> Self {
        let text = text.trim();
        match text.split_once(PAYLOAD_SEPARATOR) {
            Some((html, markdown)) => Self {
                html: html.trim().to_string(),
                markdown: markdown.trim().to_string(),
            },
            None => Self {
                html: text.to_string(),
                markdown: text.to_string(),
            },
        }
    }

    /// Placeholder used by the capture flow when the inference call fails, so that a preview
    /// still appears.
    pub fn fallback(error: &impl std::fmt::Display) -> Self {
        let message = format!("{FALLBACK_PREFIX}: {error}");
        Self {
            html: message.clone(),
            markdown: message,
        }
    }
}
