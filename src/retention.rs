//! 保存期間を過ぎたログファイルの削除

use std::{
    fs, io,
    path::PathBuf,
    time::SystemTime,
};

use regex::Regex;
use serde::Deserialize;

use crate::appenders::LogFileParts;

/// ローテーション済みのファイルを見分ける方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveMatching {
    /// ファイル名に基底名と拡張子の両方を含むものを対象にする。
    ///
    /// 同じディレクトリにある、名前の一部が同じ別のログも対象になる。
    #[default]
    Substring,
    /// `{base_name}_<yyyy>_<mm>_<dd>_<hh>{suffix}`に一致するものだけを対象にする。
    Strict,
}

/// 削除の結果
#[derive(Debug, Default)]
pub struct PruneReport {
    /// 削除したファイル。
    pub deleted: Vec<PathBuf>,
    /// 削除できなかったファイルとその理由。
    pub failures: Vec<(PathBuf, io::Error)>,
}

/// ファイル名の照合規則
enum Rule {
    Substring,
    /// パターンを作成できなかった場合は`None`で、どのファイルも対象にしない。
    Strict(Option<Regex>),
}

/// ファイル名の照合
struct Matcher<'a> {
    parts: &'a LogFileParts,
    live: String,
    rule: Rule,
}

impl<'a> Matcher<'a> {
    fn new(parts: &'a LogFileParts, matching: ArchiveMatching) -> Self {
        let rule = match matching {
            ArchiveMatching::Substring => Rule::Substring,
            ArchiveMatching::Strict => Rule::Strict(
                Regex::new(&format!(
                    r"^{}_\d{{4}}_\d{{2}}_\d{{2}}_\d{{2}}{}$",
                    regex::escape(&parts.base_name),
                    regex::escape(&parts.suffix)
                ))
                .ok(),
            ),
        };

        Self {
            parts,
            live: parts.live_file_name(),
            rule,
        }
    }

    fn is_candidate(&self, name: &str) -> bool {
        if name == self.live {
            return false;
        }
        match &self.rule {
            Rule::Substring => {
                name.contains(&self.parts.base_name) && name.contains(&self.parts.suffix)
            }
            Rule::Strict(Some(pattern)) => pattern.is_match(name),
            Rule::Strict(None) => false,
        }
    }
}

/// 保存期間を過ぎたログファイルを削除する。
///
/// 出力中のファイル（`{base_name}{suffix}`）は、更新日時に関わらず削除しない。
/// 個々のファイルの読み取りや削除に失敗しても処理を続け、失敗は`PruneReport`に
/// 記録する。
///
/// # 引数
///
/// - parts: 出力中のログファイルのパスを分解したもの。
/// - cutoff: この日時より前に更新されたファイルを削除する。
/// - matching: 対象ファイルの見分け方。
///
/// # 戻り値
///
/// 削除の結果。ディレクトリを読めなかった場合はエラー。
pub fn prune_expired(
    parts: &LogFileParts,
    cutoff: SystemTime,
    matching: ArchiveMatching,
) -> io::Result<PruneReport> {
    let entries = fs::read_dir(&parts.directory)?
        .map(|entry| entry.map(|entry| entry.path()));

    Ok(prune_entries(
        parts,
        entries,
        &Matcher::new(parts, matching),
        cutoff,
    ))
}

fn prune_entries(
    parts: &LogFileParts,
    entries: impl Iterator<Item = io::Result<PathBuf>>,
    matcher: &Matcher<'_>,
    cutoff: SystemTime,
) -> PruneReport {
    let mut report = PruneReport::default();

    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(err) => {
                report.failures.push((parts.directory.clone(), err));
                continue;
            }
        };
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !matcher.is_candidate(name) {
            continue;
        }

        let modified = match fs::symlink_metadata(&path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(err) => {
                report.failures.push((path, err));
                continue;
            }
        };
        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => report.deleted.push(path),
            Err(err) => report.failures.push((path, err)),
        }
    }

    report
}
