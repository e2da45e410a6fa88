use lumiere::{LoggingConfig, load_topic_list, numbered_topics};
use std::io::Write;

#[test]
fn test_topics_file_in_order_without_blanks() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, r#"["Binary search", "  ", " Heap sort ", "Dijkstra's algorithm"]"#)?;

    let descriptions = load_topic_list(file.path())?;
    assert_eq!(descriptions, vec!["Binary search", "Heap sort", "Dijkstra's algorithm"]);

    let topics = numbered_topics(descriptions, Some(2));
    assert_eq!(topics.len(), 2);
    assert_eq!(*topics[1].index(), 1);
    assert_eq!(topics[1].description(), "Heap sort");
    Ok(())
}

#[test]
fn test_topics_file_must_be_string_array() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, r#"{{"topics": ["Binary search"]}}"#)?;

    let err = load_topic_list(file.path()).unwrap_err();
    assert!(err.to_string().contains("JSON array of strings"));
    Ok(())
}

#[test]
fn test_missing_topics_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_topic_list(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn test_no_limit_keeps_everything() {
    let topics = numbered_topics(vec!["a".into(), "b".into(), "c".into()], None);
    let indices: Vec<usize> = topics.iter().map(|t| *t.index()).collect();
    assert_eq!(indices, vec![0, 1, 2]);
}

#[test]
fn test_verbose_raises_default_level() {
    assert_eq!(LoggingConfig::new().with_verbose(true).log_level, "debug");
    assert_eq!(LoggingConfig::new().with_verbose(false).log_level, "info");
}
