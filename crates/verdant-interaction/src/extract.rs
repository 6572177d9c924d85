//! Markdown-fence stripping for model output.
//!
//! Local models routinely wrap JSON answers in ```json fences even when
//! told not to. The parser runs on the stripped body.

/// Removes a leading ```` ```json ```` (or bare ```` ``` ````) fence and the
/// matching trailing fence. Input without fences is returned unchanged
/// apart from surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        text = rest.trim_start();
        if let Some(body) = text.strip_suffix("```") {
            text = body.trim_end();
        }
    }
    text
}
