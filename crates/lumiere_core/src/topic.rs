//! Topic identity.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9\u{4e00}-\u{9fa5} _\-\{\}\[\]\+&=\u{03C0}\.,']")
        .expect("static pattern")
});
static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern"));

/// Form of an identifier usable as a single path component.
///
/// Separators and NUL become `_`, and `.`, `..` or an empty string gain a
/// leading `_`, so the result can never leave its parent directory.
///
/// ```
/// use lumiere_core::path_component;
///
/// assert_eq!(path_component("a/b"), "a_b");
/// assert_eq!(path_component(".."), "_..");
/// ```
pub fn path_component(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    if cleaned == ".." || cleaned == "." || cleaned.is_empty() {
        format!("_{}", cleaned)
    } else {
        cleaned
    }
}

/// A topic to be turned into a lecture video.
///
/// The index is assigned once, when the topic list is read, and together
/// with the description forms the identity of the topic's output directory.
///
/// # Examples
///
/// ```
/// use lumiere_core::Topic;
///
/// let topic = Topic::new(3, "Binary search (iterative)?");
/// assert_eq!(topic.safe_name(), "Binary_search_iterative");
/// assert_eq!(topic.dir_name(), "3-Binary_search_iterative");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters)]
pub struct Topic {
    index: usize,
    description: String,
}

impl Topic {
    /// Creates a topic with its stable index.
    pub fn new(index: usize, description: impl Into<String>) -> Self {
        Self {
            index,
            description: description.into(),
        }
    }

    /// Filesystem-safe form of the description.
    ///
    /// Keeps letters, digits, CJK ideographs, spaces and a small set of
    /// punctuation, then collapses whitespace runs into single underscores.
    pub fn safe_name(&self) -> String {
        let kept = UNSAFE_CHARS.replace_all(&self.description, "");
        WHITESPACE_RUN.replace_all(kept.trim(), "_").into_owned()
    }

    /// Name of the directory holding every artifact of this topic.
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.index, self.safe_name())
    }

    /// File name of the merged lecture video.
    pub fn merged_file_name(&self) -> String {
        format!("{}.mp4", self.safe_name())
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.index, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name_keeps_allowed_punctuation() {
        let topic = Topic::new(0, "Dijkstra's  shortest-path {weighted}, v2.0");
        assert_eq!(topic.safe_name(), "Dijkstra's_shortest-path_{weighted},_v2.0");
    }

    #[test]
    fn test_safe_name_keeps_cjk() {
        let topic = Topic::new(1, "二分查找 算法");
        assert_eq!(topic.safe_name(), "二分查找_算法");
        assert_eq!(topic.dir_name(), "1-二分查找_算法");
    }

    #[test]
    fn test_merged_file_name() {
        let topic = Topic::new(2, "heap sort");
        assert_eq!(topic.merged_file_name(), "heap_sort.mp4");
    }
}
