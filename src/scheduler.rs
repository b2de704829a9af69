//! 時間によるローテーション
//!
//! 一定間隔（既定では30秒）ごとに、最後のローテーションからローテーションの間隔が
//! 過ぎたかどうかを判定する。過ぎていれば、保存期間を過ぎたファイルを削除して
//! からローテーションする。ファイルへ出力していない間は何もしない。

use std::{
    sync::{
        mpsc::{self, RecvTimeoutError},
        Arc,
    },
    thread::{self, JoinHandle},
};

use time::OffsetDateTime;

use crate::{
    clock::Clock,
    error::{Error, Result},
    logger::Logger,
};

/// 1回の判定の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// ファイルへ出力していない。
    Inactive,
    /// ローテーションの時刻に達していない。
    NotDue,
    /// 削除とローテーションを行った。
    Rotated,
}

#[derive(Debug, Clone)]
pub struct RotationScheduler {
    logger: Arc<Logger>,
}

impl RotationScheduler {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    /// `now`の時点でローテーションが必要かを判定し、必要なら実行する。
    pub fn tick(&self, now: OffsetDateTime) -> TickOutcome {
        let Some(last_rotation) = self.logger.last_rotation() else {
            crate::verbose!(self.logger, "log file closed, skip slicing log");
            return TickOutcome::Inactive;
        };
        // 表せない時刻を超える間隔は、ローテーションしない設定として扱う
        match last_rotation.checked_add(self.logger.slice_interval()) {
            Some(due) if now > due => {}
            _ => return TickOutcome::NotDue,
        }

        self.logger.prune_expired();
        self.logger.rotate();
        TickOutcome::Rotated
    }

    /// 別スレッドで判定を繰り返す。
    ///
    /// 返却した`Worker`を停止するまで、`poll_interval`ごとに`tick`を呼び出す。
    pub(crate) fn spawn(self) -> Result<Worker> {
        let poll_interval = self.logger.poll_interval();
        let logger = Arc::clone(&self.logger);
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("log-rotation".to_string())
            .spawn(move || loop {
                self.tick(self.logger.clock().now());
                match stopped.recv_timeout(poll_interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|source| Error::SpawnThread {
                name: "rotation",
                source,
            })?;

        Ok(Worker {
            stop,
            handle,
            logger,
        })
    }
}

/// 停止できるバックグラウンドスレッド
#[derive(Debug)]
pub(crate) struct Worker {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
    logger: Arc<Logger>,
}

impl Worker {
    pub fn stop(self) {
        let _ = self.stop.send(());
        crate::service::join_or_warn(&self.logger, self.handle);
    }
}
