//! Topic lists for batch runs.

use lumiere_core::Topic;
use lumiere_error::{JsonError, LumiereResult, StorageError, StorageErrorKind};
use std::path::Path;
use tracing::{debug, instrument};

/// Read a JSON array of topic descriptions.
///
/// Blank entries are dropped.
///
/// # Errors
///
/// Fails when the file cannot be read or is not an array of strings.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_topic_list(path: &Path) -> LumiereResult<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;
    let topics: Vec<String> = serde_json::from_str(&text).map_err(|e| {
        JsonError::new(format!(
            "Topics file {} must be a JSON array of strings: {}",
            path.display(),
            e
        ))
    })?;
    let topics: Vec<String> = topics
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    debug!(count = topics.len(), "Loaded topic list");
    Ok(topics)
}

/// Number descriptions in order, keeping at most `limit` of them.
///
/// # Examples
///
/// ```
/// use lumiere::numbered_topics;
///
/// let topics = numbered_topics(vec!["Binary search".into(), "Heap sort".into()], Some(1));
/// assert_eq!(topics.len(), 1);
/// assert_eq!(*topics[0].index(), 0);
/// ```
pub fn numbered_topics(descriptions: Vec<String>, limit: Option<usize>) -> Vec<Topic> {
    let limit = limit.unwrap_or(usize::MAX);
    descriptions
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, description)| Topic::new(index, description))
        .collect()
}
