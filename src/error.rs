use std::{io, path::PathBuf};

/// ロガーが返すエラー。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// ログファイルを開けなかった、または作成できなかった。
    #[error("failed to open log file {}: {source}", path.display())]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// ログレベルの名前、またはランクを解釈できなかった。
    #[error("invalid log level: {0}")]
    InvalidLevel(String),

    /// シグナルハンドラを登録できなかった。
    #[error("failed to register signal handlers: {0}")]
    RegisterSignals(#[source] io::Error),

    /// バックグラウンドスレッドを起動できなかった。
    #[error("failed to spawn {name} thread: {source}")]
    SpawnThread {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    /// 設定を解釈できなかった。
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
