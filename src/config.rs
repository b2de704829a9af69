use std::time::Duration as StdDuration;

use serde::Deserialize;
use time::Duration;

use crate::{error::Result, level::Level, retention::ArchiveMatching};

/// ローテーションの間隔の既定値（1日）
pub const DEFAULT_SLICE_INTERVAL: Duration = Duration::days(1);
/// ログファイルの保存期間の既定値（7日）
pub const DEFAULT_STORAGE_TIME: Duration = Duration::days(7);
/// ローテーションを判定する間隔の既定値
pub const DEFAULT_POLL_INTERVAL: StdDuration = StdDuration::from_secs(30);

/// ファイルに書き込まないときの出力先
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Console {
    #[default]
    Stderr,
    Stdout,
}

/// ロガーの設定
///
/// TOMLから読み込む場合、期間は秒で指定する。
///
/// ```toml
/// level = "info"
/// slice_interval_secs = 3600
/// storage_time_secs = 86400
/// archive_matching = "strict"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawConfig")]
pub struct Config {
    pub level: Level,
    pub slice_interval: Duration,
    pub storage_time: Duration,
    pub poll_interval: StdDuration,
    pub console: Console,
    pub archive_matching: ArchiveMatching,
    /// Unixでシグナルによるレベル変更を受け付けるか。
    pub signals: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Level::Notice,
            slice_interval: DEFAULT_SLICE_INTERVAL,
            storage_time: DEFAULT_STORAGE_TIME,
            poll_interval: DEFAULT_POLL_INTERVAL,
            console: Console::default(),
            archive_matching: ArchiveMatching::default(),
            signals: true,
        }
    }
}

impl Config {
    /// TOML文字列から設定を読み込む。指定の無い項目は既定値になる。
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    level: Level,
    slice_interval_secs: i64,
    storage_time_secs: i64,
    poll_interval_secs: u64,
    console: Console,
    archive_matching: ArchiveMatching,
    signals: bool,
}

impl Default for RawConfig {
    fn default() -> Self {
        let config = Config::default();
        Self {
            level: config.level,
            slice_interval_secs: config.slice_interval.whole_seconds(),
            storage_time_secs: config.storage_time.whole_seconds(),
            poll_interval_secs: config.poll_interval.as_secs(),
            console: config.console,
            archive_matching: config.archive_matching,
            signals: config.signals,
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        Self {
            level: raw.level,
            slice_interval: Duration::seconds(raw.slice_interval_secs),
            storage_time: Duration::seconds(raw.storage_time_secs),
            poll_interval: StdDuration::from_secs(raw.poll_interval_secs.max(1)),
            console: raw.console,
            archive_matching: raw.archive_matching,
            signals: raw.signals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        assert_eq!(Config::default(), Config::from_toml_str("").unwrap());
    }

    #[test]
    fn test_toml_overrides() {
        let config = Config::from_toml_str(
            r#"
            level = "info"
            slice_interval_secs = 3600
            storage_time_secs = -86400
            poll_interval_secs = 5
            console = "stdout"
            archive_matching = "strict"
            signals = false
            "#,
        )
        .unwrap();

        assert_eq!(Level::Info, config.level);
        assert_eq!(Duration::hours(1), config.slice_interval);
        assert_eq!(Duration::days(-1), config.storage_time);
        assert_eq!(StdDuration::from_secs(5), config.poll_interval);
        assert_eq!(Console::Stdout, config.console);
        assert_eq!(ArchiveMatching::Strict, config.archive_matching);
        assert!(!config.signals);
    }

    #[test]
    fn test_invalid_level() {
        assert!(Config::from_toml_str(r#"level = "loud""#).is_err());
    }
}
