use std::{sync::Arc, thread::JoinHandle};

use crate::{
    control::{ControlConsumer, ControlSender},
    error::Result,
    logger::Logger,
    scheduler::{RotationScheduler, Worker},
};

/// ロガーのバックグラウンドスレッド
///
/// ローテーションの判定と、レベルの変更要求の受信を行う。`shutdown`を呼ぶか、
/// 破棄するとすべてのスレッドを停止する。
pub struct Background {
    scheduler: Option<Worker>,
    control: Option<ControlConsumer>,
    #[cfg(unix)]
    signals: Option<crate::control::SignalSource>,
}

impl Logger {
    /// バックグラウンドスレッドを起動する。
    ///
    /// 設定で有効な場合、Unixでは`SIGUSR1`と`SIGUSR2`を受け付ける。
    pub fn start(self: &Arc<Self>) -> Result<Background> {
        let mut background = Background {
            scheduler: None,
            control: None,
            #[cfg(unix)]
            signals: None,
        };

        let control = ControlConsumer::spawn(Arc::clone(self))?;
        #[cfg(unix)]
        if self.signals_enabled() {
            background.signals = Some(crate::control::SignalSource::spawn(
                Arc::clone(self),
                control.sender(),
            )?);
        }
        background.control = Some(control);
        background.scheduler = Some(RotationScheduler::new(Arc::clone(self)).spawn()?);

        Ok(background)
    }
}

impl Background {
    /// レベルの変更要求を送るための送信側を返却する。
    pub fn control(&self) -> Option<ControlSender> {
        self.control.as_ref().map(ControlConsumer::sender)
    }

    /// すべてのスレッドを停止し、終了を待つ。
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        #[cfg(unix)]
        if let Some(signals) = self.signals.take() {
            signals.stop();
        }
        if let Some(control) = self.control.take() {
            control.stop();
        }
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.stop();
        }
    }
}

/// スレッドの終了を待つ。スレッドがパニックしていた場合は警告を出力する。
pub(crate) fn join_or_warn(logger: &Logger, handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or("unnamed").to_string();
    if handle.join().is_err() {
        crate::warning!(logger, "{} thread panicked", name);
    }
}

impl Drop for Background {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, level::Level};

    fn quiet_config() -> Config {
        Config {
            signals: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_panicked_thread_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Logger::with_config(quiet_config());
        logger.init_log_file(&path).unwrap();

        let handle = std::thread::Builder::new()
            .name("log-test".to_string())
            .spawn(|| panic!("worker failed"))
            .unwrap();
        join_or_warn(&logger, handle);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[WARNING] log-test thread panicked"));
    }

    #[test]
    fn test_join_finished_thread_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Logger::with_config(quiet_config());
        logger.init_log_file(&path).unwrap();

        join_or_warn(&logger, std::thread::spawn(|| {}));

        assert_eq!("", std::fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn test_control_through_background() {
        let logger = Arc::new(Logger::with_config(quiet_config()));
        let background = logger.start().unwrap();

        let control = background.control().unwrap();
        assert!(control.level_down());
        background.shutdown();

        assert_eq!(Level::Info, logger.level());
        assert!(!control.level_down());
    }

    #[test]
    fn test_independent_instances() {
        let first = Arc::new(Logger::with_config(quiet_config()));
        let second = Arc::new(Logger::with_config(quiet_config()));
        let first_background = first.start().unwrap();
        let second_background = second.start().unwrap();

        first_background.control().unwrap().level_up();
        drop(first_background);
        drop(second_background);

        assert_eq!(Level::Warning, first.level());
        assert_eq!(Level::Notice, second.level());
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_raises_level() {
        use std::{thread, time::Duration};

        let logger = Arc::new(Logger::new());
        let background = logger.start().unwrap();

        signal_hook::low_level::raise(signal_hook::consts::SIGUSR1).unwrap();
        for _ in 0..100 {
            if logger.level() == Level::Warning {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        background.shutdown();

        assert_eq!(Level::Warning, logger.level());
    }
}
