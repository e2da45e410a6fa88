//! Utilities for pulling structured documents and source code out of model replies.
//!
//! Replies usually wrap the payload in markdown fences or surround it with
//! commentary. JSON is located by fence first, then by balanced delimiters;
//! source code by language fence, then any fence, then the whole reply.

use lumiere_error::{GenerationError, GenerationErrorKind};

/// Extract a JSON document from a reply that may contain markdown or extra text.
///
/// Strategies, in order:
/// 1. Markdown code blocks: ```json ... ```
/// 2. Balanced braces `{ ... }` or brackets `[ ... ]`, whichever opens first
///
/// # Errors
///
/// Returns a `Malformed` generation error when nothing resembling JSON is found.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::extract_json;
///
/// let reply = "Here is the outline:\n```json\n{\"topic\": \"Binary search\"}\n```\nEnjoy!";
/// assert_eq!(extract_json(reply).unwrap(), "{\"topic\": \"Binary search\"}");
/// ```
pub fn extract_json(response: &str) -> Result<String, GenerationError> {
    if let Some(json) = fenced_block(response, "json") {
        return Ok(json);
    }

    let bracket_pos = response.find('[');
    let brace_pos = response.find('{');

    let order: [(char, char); 2] = match (bracket_pos, brace_pos) {
        (Some(b), Some(c)) if b < c => [('[', ']'), ('{', '}')],
        (Some(_), None) => [('[', ']'), ('{', '}')],
        _ => [('{', '}'), ('[', ']')],
    };

    for (open, close) in order {
        if let Some(json) = extract_balanced(response, open, close) {
            return Ok(json);
        }
    }

    tracing::debug!(response_length = response.len(), "No JSON found in reply");
    Err(GenerationError::new(GenerationErrorKind::Malformed(format!(
        "no JSON document in reply ({} chars)",
        response.len()
    ))))
}

/// Extract source code from a reply.
///
/// Prefers a ```python fence, then the first fence of any language, and
/// falls back to the trimmed reply itself.
///
/// # Examples
///
/// ```
/// use lumiere_pipeline::extract_code;
///
/// let reply = "Sure:\n```python\nfrom manim import *\n```";
/// assert_eq!(extract_code(reply), "from manim import *");
/// assert_eq!(extract_code("  x = 1  "), "x = 1");
/// ```
pub fn extract_code(response: &str) -> String {
    fenced_block(response, "python").unwrap_or_else(|| response.trim().to_string())
}

/// Content of the first markdown fence, preferring one tagged `language`.
///
/// A fence with no closing marker yields everything after the opening line,
/// which is what a truncated reply looks like.
fn fenced_block(response: &str, language: &str) -> Option<String> {
    let pattern = format!("```{}", language);

    if let Some(start) = response.find(&pattern) {
        let content_start = start + pattern.len();
        let body = &response[content_start..];
        return Some(match body.find("```") {
            Some(end) => body[..end].trim().to_string(),
            None => body.trim().to_string(),
        });
    }

    let start = response.find("```")?;
    let content_start = start + 3;
    // Skip an unrecognised language tag on the fence line
    let skip_to = response[content_start..]
        .find('\n')
        .map(|n| content_start + n + 1)
        .unwrap_or(content_start);
    let body = &response[skip_to..];
    Some(match body.find("```") {
        Some(end) => body[..end].trim().to_string(),
        None => body.trim().to_string(),
    })
}

/// Content between the first `open` and its matching `close`, honouring
/// string literals and escapes.
fn extract_balanced(response: &str, open: char, close: char) -> Option<String> {
    let start = response.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(response[start..start + i + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_json_fence() {
        let reply = "{not this}\n```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(reply).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_balanced_braces_ignore_strings() {
        let reply = r#"Outline follows {"title": "a } tricky { title", "n": {"x": 1}} trailing"#;
        let json = extract_json(reply).unwrap();
        assert!(json.ends_with("}}"));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["n"]["x"], 1);
    }

    #[test]
    fn test_array_first_when_it_opens_first() {
        let reply = r#"[{"id": 1}, {"id": 2}]"#;
        assert_eq!(extract_json(reply).unwrap(), reply);
    }

    #[test]
    fn test_no_json_is_malformed() {
        let err = extract_json("I cannot help with that").unwrap_err();
        assert!(err.kind.is_malformed());
    }

    #[test]
    fn test_unclosed_fence_returns_tail() {
        let reply = "```python\nclass A:\n    pass";
        assert_eq!(extract_code(reply), "class A:\n    pass");
    }

    #[test]
    fn test_untagged_fence_skips_language_line() {
        let reply = "```py\nx = 1\n```";
        assert_eq!(extract_code(reply), "x = 1");
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let reply = r#"{"s": "say \"hi\" }"}"#;
        assert_eq!(extract_json(reply).unwrap(), reply);
    }
}
