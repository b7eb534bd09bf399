//! Integration tests for the logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_init_logging_once_per_process() {
    // A global subscriber can only be installed once, so both the first
    // install and the rejected second install are checked here.
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_spans(false);

    init_logging(config.clone()).expect("first init should succeed");
    tracing::info!(file = %strip_path("/tmp/library/beach.jpg"), "Logging initialized");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/home/user/pictures/2023/beach.jpg"), "beach.jpg");
    assert_eq!(strip_path("D:\\photos\\img_0001.png"), "img_0001.png");
    assert_eq!(strip_path("movie.mp4"), "movie.mp4");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_filter("core_sync=trace")
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.filter.as_deref(), Some("core_sync=trace"));
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
}
