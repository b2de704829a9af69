use std::{
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

use time::OffsetDateTime;

use crate::error::{Error, Result};

/// ファイル名に拡張子が無い場合に使う拡張子
pub const DEFAULT_SUFFIX: &str = ".log";

/// 出力先のログファイル
///
/// `active`が`true`の間は、`file`は`path`に開かれた追記可能なファイルである。
/// `false`の間、書き込みはコンソールへ向かい、`file`は使わない。
#[derive(Debug)]
pub(crate) struct FileTarget {
    path: Option<PathBuf>,
    file: Option<File>,
    active: bool,
    last_rotation: OffsetDateTime,
}

/// ローテーションでファイルを閉じて改名した結果
#[derive(Debug)]
pub(crate) struct Renamed {
    /// 再び開くべき本来のパス。
    pub path: PathBuf,
    /// 改名後のパス。
    pub archive: PathBuf,
    /// 改名に失敗した場合のエラー。
    pub error: Option<io::Error>,
}

impl FileTarget {
    pub fn new(now: OffsetDateTime) -> Self {
        Self {
            path: None,
            file: None,
            active: false,
            last_rotation: truncate_to_hour(now),
        }
    }

    /// `path`を開いて出力先にする。
    ///
    /// 開けなかった場合、現在の状態は変更しない。
    pub fn open(&mut self, path: &Path, now: OffsetDateTime) -> Result<()> {
        let file = open_log_file(path).map_err(|source| Error::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })?;

        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        self.active = true;
        self.last_rotation = truncate_to_hour(now);

        Ok(())
    }

    /// ファイルを閉じて、以降の出力をコンソールに切り替える。
    pub fn close(&mut self) {
        self.file = None;
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn last_rotation(&self) -> OffsetDateTime {
        self.last_rotation
    }

    /// ファイルへ1行書き込む。
    ///
    /// # 戻り値
    ///
    /// ファイルへ書き込んだ場合は`Ok(true)`、非アクティブの場合は`Ok(false)`。
    pub fn write(&mut self, buf: &[u8]) -> io::Result<bool> {
        match self.file.as_mut() {
            Some(file) if self.active => {
                file.write_all(buf)?;
                file.flush()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// 現在のファイルを閉じ、`at`の日時を埋め込んだ名前に改名する。
    ///
    /// 呼び出し後は非アクティブになる。ファイルへ出力していない場合は`None`。
    pub fn close_and_rename(&mut self, at: OffsetDateTime) -> Option<Renamed> {
        if !self.active {
            return None;
        }
        self.active = false;
        self.file = None;
        let path = self.path.clone()?;

        let archive = LogFileParts::from_path(&path).archive_path(at);
        let error = fs::rename(&path, &archive).err();

        Some(Renamed {
            path,
            archive,
            error,
        })
    }
}

/// ログファイルのパスを分解したもの
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileParts {
    /// ログファイルのディレクトリ。親が無い場合はカレントディレクトリ。
    pub directory: PathBuf,
    /// ファイル名から拡張子を除いた部分。
    pub base_name: String,
    /// 最後の`.`以降。`.`が無い場合は`.log`。
    pub suffix: String,
}

impl LogFileParts {
    pub fn from_path(path: &Path) -> Self {
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (base_name, suffix) = match file_name.rfind('.') {
            Some(pos) => (file_name[..pos].to_string(), file_name[pos..].to_string()),
            None => (file_name, DEFAULT_SUFFIX.to_string()),
        };

        Self {
            directory,
            base_name,
            suffix,
        }
    }

    /// 出力中のファイル名（`{base_name}{suffix}`）を返却する。
    pub fn live_file_name(&self) -> String {
        format!("{}{}", self.base_name, self.suffix)
    }

    pub fn archive_path(&self, at: OffsetDateTime) -> PathBuf {
        self.directory
            .join(archive_file_name(&self.base_name, &self.suffix, at))
    }
}

/// ローテーション後のファイル名を作成して、返却する。
///
/// ファイル名は、`{base_name}_<yyyy>_<mm>_<dd>_<hh>{suffix}`となる。
///
/// # 引数
///
/// - base_name: 拡張子を除いたファイル名。
/// - suffix: 拡張子。
/// - at: ローテーションした日時。
///
/// # 戻り値
///
/// ログファイル名。
pub fn archive_file_name(base_name: &str, suffix: &str, at: OffsetDateTime) -> String {
    format!(
        "{}_{:04}_{:02}_{:02}_{:02}{}",
        base_name,
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        suffix
    )
}

/// 日時を時の単位に切り捨てる。
pub fn truncate_to_hour(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_minute(0)
        .and_then(|t| t.replace_second(0))
        .and_then(|t| t.replace_nanosecond(0))
        .unwrap_or(at)
}

/// ログファイルを追記モードで開く。
///
/// ファイルが存在しない場合は作成する。親ディレクトリが存在しない場合は、
/// 親ディレクトリを作成してから開き直す。
///
/// # 引数
///
/// * path: ログファイルパス。
///
/// # 戻り値
///
/// `File`インスタンス。
pub(crate) fn open_log_file(path: &Path) -> io::Result<File> {
    let mut open_options = OpenOptions::new();
    open_options.append(true).create(true);

    let new_file = open_options.open(path);
    if new_file.is_err() {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                return open_options.open(path);
            }
        }
    }

    new_file
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use time::{format_description, macros::datetime, OffsetDateTime};

    use super::*;

    #[test]
    fn test_archive_file_name() {
        let now = "20180408 16:25:32 +09:00:00";
        let format = format_description::parse(
            "[year][month][day] [hour]:[minute]:[second] [offset_hour \
                sign:mandatory]:[offset_minute]:[offset_second]",
        )
        .unwrap();
        let date = OffsetDateTime::parse(now, &format).unwrap();

        assert_eq!("app_2018_04_08_16.log", archive_file_name("app", ".log", date));
    }

    #[test]
    fn test_parts_with_directory_and_suffix() {
        let parts = LogFileParts::from_path(Path::new("/var/log/app.txt"));
        assert_eq!(PathBuf::from("/var/log"), parts.directory);
        assert_eq!("app", parts.base_name);
        assert_eq!(".txt", parts.suffix);
        assert_eq!("app.txt", parts.live_file_name());
    }

    #[test]
    fn test_parts_without_directory() {
        let parts = LogFileParts::from_path(Path::new("app.log"));
        assert_eq!(PathBuf::from("."), parts.directory);
        assert_eq!("app", parts.base_name);
        assert_eq!(".log", parts.suffix);
    }

    #[test]
    fn test_parts_without_suffix() {
        let parts = LogFileParts::from_path(Path::new("./logs.d/server"));
        assert_eq!(PathBuf::from("./logs.d"), parts.directory);
        assert_eq!("server", parts.base_name);
        assert_eq!(DEFAULT_SUFFIX, parts.suffix);
    }

    #[test]
    fn test_parts_with_multiple_dots() {
        let parts = LogFileParts::from_path(Path::new("logs/app.v2.log"));
        assert_eq!("app.v2", parts.base_name);
        assert_eq!(".log", parts.suffix);
        assert_eq!(
            PathBuf::from("logs/app.v2_2018_04_08_16.log"),
            parts.archive_path(datetime!(2018-04-08 16:59:59 UTC))
        );
    }

    #[test]
    fn test_truncate_to_hour() {
        assert_eq!(
            datetime!(2018-04-08 16:00:00 UTC),
            truncate_to_hour(datetime!(2018-04-08 16:42:17.5 UTC))
        );
    }

    #[test]
    fn test_open_creates_file_and_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("app.log");
        let mut target = FileTarget::new(datetime!(2018-04-08 16:42:00 UTC));

        target
            .open(&path, datetime!(2018-04-08 16:42:00 UTC))
            .unwrap();

        assert!(path.exists());
        assert!(target.is_active());
        assert_eq!(Some(path.as_path()), target.path());
        assert_eq!(datetime!(2018-04-08 16:00:00 UTC), target.last_rotation());
    }

    #[test]
    fn test_open_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "first\n").unwrap();

        let mut target = FileTarget::new(OffsetDateTime::UNIX_EPOCH);
        target.open(&path, OffsetDateTime::UNIX_EPOCH).unwrap();
        assert!(target.write(b"second\n").unwrap());

        let mut content = String::new();
        File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!("first\nsecond\n", content);
    }

    #[test]
    fn test_open_failure_keeps_previous_target() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("app.log");
        let mut target = FileTarget::new(OffsetDateTime::UNIX_EPOCH);
        target.open(&good, OffsetDateTime::UNIX_EPOCH).unwrap();

        // ディレクトリはファイルとして開けない
        let err = target
            .open(dir.path(), OffsetDateTime::UNIX_EPOCH)
            .unwrap_err();
        assert!(matches!(err, Error::OpenLogFile { .. }));
        assert!(target.is_active());
        assert_eq!(Some(good.as_path()), target.path());
    }

    #[test]
    fn test_close_stops_file_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut target = FileTarget::new(OffsetDateTime::UNIX_EPOCH);
        target.open(&path, OffsetDateTime::UNIX_EPOCH).unwrap();

        target.close();

        assert!(!target.is_active());
        assert!(!target.write(b"lost\n").unwrap());
        assert_eq!("", fs::read_to_string(&path).unwrap());
    }

    #[test]
    fn test_close_and_rename() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let mut target = FileTarget::new(OffsetDateTime::UNIX_EPOCH);
        target.open(&path, OffsetDateTime::UNIX_EPOCH).unwrap();
        target.write(b"before\n").unwrap();

        let renamed = target
            .close_and_rename(datetime!(2018-04-08 16:05:00 UTC))
            .unwrap();

        assert!(renamed.error.is_none());
        assert_eq!(path, renamed.path);
        assert_eq!(dir.path().join("app_2018_04_08_16.log"), renamed.archive);
        assert!(!path.exists());
        assert_eq!("before\n", fs::read_to_string(&renamed.archive).unwrap());
        assert!(!target.is_active());
    }

    #[test]
    fn test_close_and_rename_without_file() {
        let mut target = FileTarget::new(OffsetDateTime::UNIX_EPOCH);
        assert!(target.close_and_rename(OffsetDateTime::UNIX_EPOCH).is_none());
    }
}
