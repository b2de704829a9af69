//! ログレベルを外部から変更する経路
//!
//! レベルの変更要求は`ControlEvent`としてチャネルへ送り、専用のスレッドが
//! 受け取って適用する。Unixでは`SIGUSR1`で閾値を1段階上げ、`SIGUSR2`で
//! 1段階下げる。シグナルの無い環境では`ControlSender`から同じ要求を送れる。

use std::{
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use crate::{
    error::{Error, Result},
    logger::Logger,
};

/// レベルの変更要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    LevelUp,
    LevelDown,
}

#[derive(Debug)]
enum Message {
    Event(ControlEvent),
    Stop,
}

/// 変更要求の送信側
///
/// 複製して複数の箇所から送信できる。
#[derive(Debug, Clone)]
pub struct ControlSender {
    tx: mpsc::Sender<Message>,
}

impl ControlSender {
    /// 変更要求を送る。
    ///
    /// # 戻り値
    ///
    /// 受信側が停止している場合は`false`。
    pub fn send(&self, event: ControlEvent) -> bool {
        self.tx.send(Message::Event(event)).is_ok()
    }

    pub fn level_up(&self) -> bool {
        self.send(ControlEvent::LevelUp)
    }

    pub fn level_down(&self) -> bool {
        self.send(ControlEvent::LevelDown)
    }
}

/// 変更要求を適用するスレッド
#[derive(Debug)]
pub(crate) struct ControlConsumer {
    tx: mpsc::Sender<Message>,
    handle: JoinHandle<()>,
    logger: Arc<Logger>,
}

impl ControlConsumer {
    pub fn spawn(logger: Arc<Logger>) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let consumer_logger = Arc::clone(&logger);
        let handle = thread::Builder::new()
            .name("log-control".to_string())
            .spawn(move || {
                for message in rx {
                    match message {
                        Message::Event(event) => apply(&consumer_logger, event),
                        Message::Stop => break,
                    }
                }
            })
            .map_err(|source| Error::SpawnThread {
                name: "control",
                source,
            })?;

        Ok(Self { tx, handle, logger })
    }

    pub fn sender(&self) -> ControlSender {
        ControlSender {
            tx: self.tx.clone(),
        }
    }

    /// 受信済みの要求を適用してから停止する。
    pub fn stop(self) {
        let _ = self.tx.send(Message::Stop);
        crate::service::join_or_warn(&self.logger, self.handle);
    }
}

fn apply(logger: &Logger, event: ControlEvent) {
    match event {
        ControlEvent::LevelUp => logger.level_up(),
        ControlEvent::LevelDown => logger.level_down(),
    };
}

#[cfg(unix)]
pub(crate) use self::signals::SignalSource;

#[cfg(unix)]
mod signals {
    use std::{
        sync::Arc,
        thread::{self, JoinHandle},
    };

    use signal_hook::{
        consts::{SIGUSR1, SIGUSR2},
        iterator::{Handle, Signals},
    };

    use super::{ControlEvent, ControlSender};
    use crate::{
        error::{Error, Result},
        logger::Logger,
    };

    /// シグナルを変更要求へ変換するスレッド
    pub(crate) struct SignalSource {
        handle: Handle,
        thread: JoinHandle<()>,
        logger: Arc<Logger>,
    }

    impl SignalSource {
        pub fn spawn(logger: Arc<Logger>, sender: ControlSender) -> Result<Self> {
            let mut signals = Signals::new([SIGUSR1, SIGUSR2]).map_err(Error::RegisterSignals)?;
            let handle = signals.handle();
            let source_logger = Arc::clone(&logger);

            let thread = thread::Builder::new()
                .name("log-signals".to_string())
                .spawn(move || {
                    for signal in signals.forever() {
                        let Some(event) = event_for(signal) else {
                            continue;
                        };
                        crate::warning!(
                            source_logger,
                            "receive signal {}",
                            signal_name(signal)
                        );
                        if !sender.send(event) {
                            break;
                        }
                    }
                })
                .map_err(|source| Error::SpawnThread {
                    name: "signal",
                    source,
                })?;

            Ok(Self {
                handle,
                thread,
                logger,
            })
        }

        pub fn stop(self) {
            self.handle.close();
            crate::service::join_or_warn(&self.logger, self.thread);
        }
    }

    fn event_for(signal: i32) -> Option<ControlEvent> {
        match signal {
            SIGUSR1 => Some(ControlEvent::LevelUp),
            SIGUSR2 => Some(ControlEvent::LevelDown),
            _ => None,
        }
    }

    fn signal_name(signal: i32) -> &'static str {
        match signal {
            SIGUSR1 => "SIGUSR1",
            SIGUSR2 => "SIGUSR2",
            _ => "unknown",
        }
    }

}
