use std::{
    fmt,
    io::{self, Write},
    panic::Location,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::{Duration as StdDuration, SystemTime},
};

use time::{format_description::FormatItem, macros::format_description, Duration, OffsetDateTime};

use crate::{
    appenders::{FileTarget, LogFileParts},
    clock::{Clock, SystemClock},
    config::{Config, Console},
    error::Result,
    level::{Level, LevelState},
    retention::{self, ArchiveMatching, PruneReport},
};

const LINE_TIME_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]/[month]/[day] [hour]:[minute]:[second]");

/// レベル付きのログを、ファイルまたはコンソールへ出力するロガー
///
/// プロセス全体で共有する場合は`Arc<Logger>`として保持し、必要な箇所へ渡す。
/// 複数のインスタンスは互いに独立している。
///
/// 閾値とファイルはそれぞれ別のロックで保護し、2つのロックを同時に取得する
/// ことはない。
#[derive(Debug)]
pub struct Logger {
    level: LevelState,
    target: Mutex<FileTarget>,
    // ローテーションの設定はロックせずに読み書きする。同時に変更した場合は
    // 最後に書き込んだ値が有効になる。
    slice_interval_ms: AtomicI64,
    storage_time_ms: AtomicI64,
    poll_interval: StdDuration,
    console: Console,
    archive_matching: ArchiveMatching,
    signals: bool,
    clock: Arc<dyn Clock>,
}

impl Logger {
    /// 既定の設定でロガーを作成する。
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 時刻の取得元を指定してロガーを作成する。
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        let logger = Self {
            level: LevelState::new(config.level),
            target: Mutex::new(FileTarget::new(clock.now())),
            slice_interval_ms: AtomicI64::new(0),
            storage_time_ms: AtomicI64::new(0),
            poll_interval: config.poll_interval,
            console: config.console,
            archive_matching: config.archive_matching,
            signals: config.signals,
            clock,
        };
        logger.set_slice_interval(config.slice_interval);
        logger.set_storage_time(config.storage_time);

        logger
    }

    /// ログファイルを開き、以降の出力をファイルへ切り替える。
    ///
    /// ファイルが存在しない場合は作成する。既にファイルを開いている場合は、
    /// 新しいファイルに置き換える。失敗した場合、出力先は変わらない。
    ///
    /// # 引数
    ///
    /// * path: ログファイルパス。
    pub fn init_log_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let now = self.clock.now();
        self.target().open(path.as_ref(), now)
    }

    /// ログファイルを閉じ、以降の出力をコンソールへ切り替える。
    ///
    /// バックグラウンドのローテーションは、再びファイルを開くまで何もしない。
    pub fn close_file(&self) {
        self.target().close();
    }

    /// ファイルへ出力中かどうかを返却する。
    pub fn is_writing_to_file(&self) -> bool {
        self.target().is_active()
    }

    /// 最後に開いたログファイルのパスを返却する。
    pub fn current_path(&self) -> Option<PathBuf> {
        self.target().path().map(Path::to_path_buf)
    }

    /// ファイルへ出力中の場合、最後にローテーションした時刻（時の単位）を返却する。
    pub fn last_rotation(&self) -> Option<OffsetDateTime> {
        let target = self.target();
        target.is_active().then(|| target.last_rotation())
    }

    /// 現在のファイルを日時付きの名前に改名し、元の名前で新しいファイルを開く。
    ///
    /// 改名中の出力はコンソールへ向かう。改名に失敗した場合は警告を出力し、
    /// 元のファイルをそのまま開き直す。ファイルへ出力していない場合は何もしない。
    pub fn rotate(&self) {
        let now = self.clock.now();
        let renamed = self.target().close_and_rename(now);
        let Some(renamed) = renamed else {
            return;
        };

        if let Some(err) = renamed.error {
            crate::warning!(
                self,
                "rename file {} to {} failed, because {}",
                renamed.path.display(),
                renamed.archive.display(),
                err
            );
        }
        if let Err(err) = self.init_log_file(&renamed.path) {
            crate::warning!(self, "reopen log file after rotation failed, because {}", err);
        }
    }

    /// 保存期間を過ぎたローテーション済みのファイルを削除する。
    ///
    /// 削除中はファイルのロックを保持しない。出力中のファイルは削除しない。
    ///
    /// # 戻り値
    ///
    /// 削除の結果。ファイルを一度も開いていない場合と、ディレクトリを読めなかった
    /// 場合は`None`。
    pub fn prune_expired(&self) -> Option<PruneReport> {
        let (path, last_rotation) = {
            let target = self.target();
            (target.path()?.to_path_buf(), target.last_rotation())
        };

        // 表せない時刻より前に更新されたファイルは無い
        let Some(cutoff) = last_rotation.checked_sub(self.storage_time()) else {
            return Some(PruneReport::default());
        };
        let cutoff = SystemTime::from(cutoff);
        let parts = LogFileParts::from_path(&path);
        let report = match retention::prune_expired(&parts, cutoff, self.archive_matching) {
            Ok(report) => report,
            Err(err) => {
                crate::warning!(
                    self,
                    "try to delete file, read dir {} failed, because {}",
                    parts.directory.display(),
                    err
                );
                return None;
            }
        };

        for (path, err) in &report.failures {
            crate::warning!(
                self,
                "try to delete file, delete file name {} failed, because {}",
                path.display(),
                err
            );
        }
        for path in &report.deleted {
            crate::notice!(
                self,
                "try to delete file, delete file name {} success",
                path.display()
            );
        }

        Some(report)
    }

    /// ローテーションの間隔を設定する。負の値は符号を反転する。
    pub fn set_slice_interval(&self, interval: Duration) {
        self.slice_interval_ms
            .store(to_millis(interval.abs()), Ordering::Relaxed);
    }

    pub fn slice_interval(&self) -> Duration {
        Duration::milliseconds(self.slice_interval_ms.load(Ordering::Relaxed))
    }

    /// ローテーション済みのファイルを保存する期間を設定する。負の値は符号を反転する。
    pub fn set_storage_time(&self, storage_time: Duration) {
        self.storage_time_ms
            .store(to_millis(storage_time.abs()), Ordering::Relaxed);
    }

    pub fn storage_time(&self) -> Duration {
        Duration::milliseconds(self.storage_time_ms.load(Ordering::Relaxed))
    }

    pub(crate) fn poll_interval(&self) -> StdDuration {
        self.poll_interval
    }

    pub(crate) fn signals_enabled(&self) -> bool {
        self.signals
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// 閾値を設定する。`[Verbose, Error)`の範囲外は無視する。
    ///
    /// # 戻り値
    ///
    /// 設定した場合は`true`。
    pub fn set_level(&self, level: Level) -> bool {
        self.level.set(level)
    }

    /// 閾値を1段階上げる。変更した場合は、変更後の閾値で警告を出力する。
    pub fn level_up(&self) -> Option<Level> {
        let level = self.level.up()?;
        crate::warning!(self, "log level up to {}", level);
        Some(level)
    }

    /// 閾値を1段階下げる。変更した場合は、変更後の閾値で警告を出力する。
    pub fn level_down(&self) -> Option<Level> {
        let level = self.level.down()?;
        crate::warning!(self, "log level down to {}", level);
        Some(level)
    }

    pub fn level(&self) -> Level {
        self.level.get()
    }

    /// `level`のログが出力されるかどうかを返却する。
    ///
    /// 閾値はロックせずに読む。閾値の変更と同時に呼び出した場合は、変更前の
    /// 閾値で判定することがある。
    pub fn is_enabled(&self, level: Level) -> bool {
        self.level.is_enabled(level)
    }

    /// ログを1行出力する。
    ///
    /// 通常は`notice!`などのマクロから呼び出す。行には呼び出し元のファイル名と
    /// 行番号を含める。
    #[track_caller]
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.is_enabled(level) {
            return;
        }
        self.emit(level, args, Location::caller());
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>, location: &Location<'_>) {
        let stamp = self
            .clock
            .now()
            .format(LINE_TIME_FORMAT)
            .unwrap_or_default();
        let file = Path::new(location.file())
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| location.file().into());
        let line = format!(
            "{} {}:{}: {}{}\n",
            stamp,
            file,
            location.line(),
            level.tag(),
            args
        );

        self.write_bytes(line.as_bytes());
    }

    /// ファイルのロックを取得して、ファイルまたはコンソールへ書き込む。
    pub(crate) fn write_bytes(&self, buf: &[u8]) {
        let mut target = self.target();
        match target.write(buf) {
            Ok(true) => {}
            // ファイルへ書けない場合もコンソールへ出力する
            Ok(false) | Err(_) => self.write_console(buf),
        }
    }

    fn write_console(&self, buf: &[u8]) {
        let _ = match self.console {
            Console::Stderr => io::stderr().lock().write_all(buf),
            Console::Stdout => io::stdout().lock().write_all(buf),
        };
    }

    fn target(&self) -> MutexGuard<'_, FileTarget> {
        self.target.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn to_millis(duration: Duration) -> i64 {
    i64::try_from(duration.whole_milliseconds()).unwrap_or(i64::MAX)
}
