//! Timed Rolling Logger
//!
//! ----------------------------------------------------------------------------
//!
//! このクレートには、レベル付きのログを出力する`Logger`構造体が含まれている。
//! `Logger`は、ログファイルを開くまではコンソールへ、開いた後はファイルへ出力する。
//!
//! `Logger`は、以下の機能を持つ。
//!
//! - 指定された間隔ごとに、ログファイルを`{名前}_<yyyy>_<mm>_<dd>_<hh>{拡張子}`へ
//!   改名し、元の名前で新しいファイルを開き直す
//! - 改名したファイルのうち、保存期間を過ぎたものを削除する
//! - `SIGUSR1`で出力の閾値を1段階上げ、`SIGUSR2`で1段階下げる（Unixのみ）
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use time::Duration;
//! use timed_rolling_logger::{notice, warning, Logger};
//!
//! let logger = Arc::new(Logger::new());
//! logger.init_log_file("./app.log")?;
//! logger.set_slice_interval(Duration::hours(1));
//! logger.set_storage_time(Duration::days(1));
//! let background = logger.start()?;
//!
//! notice!(logger, "hello");
//! warning!(logger, "disk usage {}%", 91);
//!
//! background.shutdown();
//! logger.close_file();
//! # Ok::<(), timed_rolling_logger::Error>(())
//! ```

#[macro_use]
mod macros;

pub mod appenders;
mod clock;
mod config;
mod control;
mod error;
mod level;
mod logger;
pub mod retention;
mod scheduler;
mod service;
mod writer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    Config, Console, DEFAULT_POLL_INTERVAL, DEFAULT_SLICE_INTERVAL, DEFAULT_STORAGE_TIME,
};
pub use control::{ControlEvent, ControlSender};
pub use error::{Error, Result};
pub use level::{Level, LevelState};
pub use logger::Logger;
pub use retention::{ArchiveMatching, PruneReport};
pub use scheduler::{RotationScheduler, TickOutcome};
pub use service::Background;
