use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicU8, Ordering},
        Mutex,
    },
};

use serde::Deserialize;

use crate::error::Error;

/// ログレベル
///
/// 宣言順に重要度が高くなる。出力の閾値はこの順序で比較する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(try_from = "String")]
#[repr(u8)]
pub enum Level {
    Verbose = 0,
    Debug = 1,
    Info = 2,
    Notice = 3,
    Warning = 4,
    Error = 5,
}

impl Level {
    /// 最も低いレベル。
    pub const MIN: Level = Level::Verbose;
    /// 最も高いレベル。
    pub const MAX: Level = Level::Error;

    /// ログ行の先頭に付けるタグを返却する。
    pub fn tag(self) -> &'static str {
        match self {
            Level::Verbose => "[VERB] ",
            Level::Debug => "[DEBUG] ",
            Level::Info => "[INFO] ",
            Level::Notice => "[NOTICE] ",
            Level::Warning => "[WARNING] ",
            Level::Error => "[ERROR] ",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Verbose => "VERBOSE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Notice => "NOTICE",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }

    pub fn rank(self) -> u8 {
        self as u8
    }

    fn from_rank(rank: u8) -> Option<Level> {
        match rank {
            0 => Some(Level::Verbose),
            1 => Some(Level::Debug),
            2 => Some(Level::Info),
            3 => Some(Level::Notice),
            4 => Some(Level::Warning),
            5 => Some(Level::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Level {
    type Error = Error;

    fn try_from(rank: u8) -> Result<Self, Error> {
        Level::from_rank(rank).ok_or_else(|| Error::InvalidLevel(rank.to_string()))
    }
}

impl TryFrom<String> for Level {
    type Error = Error;

    fn try_from(name: String) -> Result<Self, Error> {
        name.parse()
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verbose" | "verb" => Ok(Level::Verbose),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "notice" => Ok(Level::Notice),
            "warning" | "warn" => Ok(Level::Warning),
            "error" => Ok(Level::Error),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

/// 現在の出力閾値
///
/// 書き込み側（`is_enabled`）はロックを取らずに読む。閾値の変更と同時に
/// 出力された1件が古い閾値で判定されることはあるが、次の呼び出しからは
/// 新しい閾値が反映される。
///
/// 変更（`set`、`up`、`down`）は専用のロックで直列化する。このロックは
/// ファイルのロックと同時に取得しない。
#[derive(Debug)]
pub struct LevelState {
    rank: AtomicU8,
    lock: Mutex<()>,
}

impl LevelState {
    pub fn new(level: Level) -> Self {
        Self {
            rank: AtomicU8::new(level.rank()),
            lock: Mutex::new(()),
        }
    }

    /// 現在の閾値を返却する。
    pub fn get(&self) -> Level {
        Level::from_rank(self.rank.load(Ordering::Relaxed)).unwrap_or(Level::Notice)
    }

    /// `level`が出力対象かどうかを返却する。
    pub fn is_enabled(&self, level: Level) -> bool {
        level.rank() >= self.rank.load(Ordering::Relaxed)
    }

    /// 閾値を設定する。
    ///
    /// `[Verbose, Error)`の範囲外は無視する。`Error`へは`up`でのみ到達できる。
    ///
    /// # 戻り値
    ///
    /// 設定した場合は`true`。
    pub fn set(&self, level: Level) -> bool {
        if level >= Level::MAX {
            return false;
        }
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        self.rank.store(level.rank(), Ordering::Relaxed);
        true
    }

    /// 閾値を1段階上げる。
    ///
    /// # 戻り値
    ///
    /// 変更後のレベル。既に`Error`の場合は`None`。
    pub fn up(&self) -> Option<Level> {
        self.step(|rank| rank.checked_add(1).filter(|r| *r <= Level::MAX.rank()))
    }

    /// 閾値を1段階下げる。
    ///
    /// # 戻り値
    ///
    /// 変更後のレベル。既に`Verbose`の場合は`None`。
    pub fn down(&self) -> Option<Level> {
        self.step(|rank| rank.checked_sub(1))
    }

    fn step(&self, next: impl FnOnce(u8) -> Option<u8>) -> Option<Level> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let level = next(self.rank.load(Ordering::Relaxed)).and_then(Level::from_rank)?;
        self.rank.store(level.rank(), Ordering::Relaxed);
        Some(level)
    }
}

impl Default for LevelState {
    fn default() -> Self {
        Self::new(Level::Notice)
    }
}
