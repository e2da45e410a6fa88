//! Generation calls with bounded retry on transport failure and malformed output.

use crate::extraction::{extract_code, extract_json};
use lumiere_core::{GenerateRequest, RunConfig, UsageAccumulator};
use lumiere_error::{GenerationError, GenerationErrorKind};
use lumiere_interface::TextGenerator;
use lumiere_rate_limit::{RetryFailure, RetryPolicy};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// One generation call with deadline and usage accounting.
///
/// Usage is recorded for every answered request, including replies that
/// later fail to parse.
///
/// # Errors
///
/// Returns the service error, a `Timeout` when the deadline passes, or
/// `EmptyResponse` for a blank reply.
#[instrument(skip_all, fields(max_tokens = request.max_tokens, model = generator.model_name()))]
pub async fn generate_text(
    generator: &dyn TextGenerator,
    usage: &UsageAccumulator,
    request: &GenerateRequest,
    deadline: Duration,
) -> Result<String, GenerationError> {
    let response = tokio::time::timeout(deadline, generator.generate(request))
        .await
        .map_err(|_| GenerationError::new(GenerationErrorKind::Timeout(deadline.as_secs())))??;

    usage.record(response.usage);
    debug!(
        produced = response.usage.produced,
        total = response.usage.total,
        "Generation answered"
    );

    if response.text.trim().is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::EmptyResponse));
    }
    Ok(response.text)
}

/// Retry budget shared by every generation request of a run.
pub(crate) fn retry_policy(config: &RunConfig) -> RetryPolicy {
    RetryPolicy::new(*config.max_generation_attempts(), *config.retry_delay_ms())
}

/// Generate a document and reduce it with `parse`, retrying within `policy`.
///
/// A parse failure consumes an attempt exactly like a transport failure, and
/// the retry re-issues the same request.
///
/// # Errors
///
/// Returns the last failure and the attempts made once the budget is spent
/// or a permanent error occurs.
pub async fn generate_structured<T, F>(
    generator: &dyn TextGenerator,
    usage: &UsageAccumulator,
    policy: RetryPolicy,
    deadline: Duration,
    label: &str,
    request: &GenerateRequest,
    parse: F,
) -> Result<T, RetryFailure<GenerationError>>
where
    F: Fn(&str) -> Result<T, GenerationError>,
{
    let parse = &parse;
    policy
        .run(label, move |attempt| async move {
            debug!(label, attempt, "Requesting generation");
            let text = generate_text(generator, usage, request, deadline).await?;
            parse(&text)
        })
        .await
}

/// Parse a JSON document of type `T` out of a reply.
///
/// # Errors
///
/// Returns `Malformed` when no JSON is present or it does not match `T`.
pub fn parse_json_document<T: DeserializeOwned>(text: &str) -> Result<T, GenerationError> {
    let json = extract_json(text)?;
    serde_json::from_str(&json).map_err(|e| {
        GenerationError::new(GenerationErrorKind::Malformed(format!(
            "document does not match the expected shape: {}",
            e
        )))
    })
}

/// Parse scene source out of a reply.
///
/// # Errors
///
/// Returns `Malformed` when the reply carries no code.
pub fn parse_code(text: &str) -> Result<String, GenerationError> {
    let code = extract_code(text);
    if code.trim().is_empty() {
        return Err(GenerationError::new(GenerationErrorKind::Malformed(
            "reply contained no code".to_string(),
        )));
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumiere_core::Outline;

    #[test]
    fn test_document_shape_mismatch_is_malformed() {
        let err = parse_json_document::<Outline>(r#"{"title": "no sections"}"#).unwrap_err();
        assert!(err.kind.is_malformed());
    }

    #[test]
    fn test_empty_fence_is_malformed() {
        assert!(parse_code("```python\n```").is_err());
        assert_eq!(parse_code("```python\nx = 1\n```").unwrap(), "x = 1");
    }
}
