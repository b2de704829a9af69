//! `tracing-subscriber`との連携
//!
//! `Logger`と`Arc<Logger>`は`MakeWriter`を実装するため、そのまま
//! `tracing_subscriber::fmt::Layer::with_writer`に渡せる。書き込みは
//! `Logger`と同じロックを通り、ローテーション中はコンソールへ出力する。
//! レベルによる絞り込みは`tracing-subscriber`側で行う。

use std::io;

use tracing_subscriber::fmt::MakeWriter;

use crate::logger::Logger;

impl<'a> MakeWriter<'a> for Logger {
    type Writer = &'a Logger;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

impl io::Write for &Logger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use super::*;

    #[test]
    fn test_tracing_events_reach_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Arc::new(Logger::new());
        logger.init_log_file(&path).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Arc::clone(&logger))
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("through tracing");
        });

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("INFO"));
        assert!(content.contains("through tracing"));
    }

    #[test]
    fn test_tracing_output_follows_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let logger = Arc::new(Logger::new());
        logger.init_log_file(&path).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_writer(Arc::clone(&logger))
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("before rotation");
            logger.rotate();
            tracing::warn!("after rotation");
        });

        let live = fs::read_to_string(&path).unwrap();
        assert!(live.contains("after rotation"));
        assert!(!live.contains("before rotation"));
    }
}
