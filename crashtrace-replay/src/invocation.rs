//! リプレイエンジンの起動コマンド

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// デフォルトのリプレイエンジン実行ファイル
pub const DEFAULT_PROGRAM: &str = "rr";

/// 記録を再生するサブコマンド
pub const REPLAY_SUBCOMMAND: &str = "replay";

/// リプレイエンジンの起動内容
///
/// 実行ファイルと引数のみを保持します。バッチスクリプトは含みません
/// （スクリプトは起動時に標準入力から渡されます）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayInvocation {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ReplayInvocation {
    /// `program replay [trace_dir]` の形式で起動内容を作成する
    ///
    /// `trace_dir` が `None` の場合はトレース引数を付けず、
    /// リプレイエンジンに最新の記録を選ばせます。
    /// 指定された場合は常に最後の引数になります。
    pub fn new<P: AsRef<Path>>(program: P, trace_dir: Option<&Path>) -> Self {
        let mut args = vec![OsString::from(REPLAY_SUBCOMMAND)];
        if let Some(dir) = trace_dir {
            args.push(dir.as_os_str().to_owned());
        }

        Self {
            program: program.as_ref().to_path_buf(),
            args,
        }
    }

    /// デフォルトの `rr` を使って起動内容を作成する
    pub fn rr(trace_dir: Option<&Path>) -> Self {
        Self::new(DEFAULT_PROGRAM, trace_dir)
    }

    /// 任意の実行ファイルと引数から起動内容を作成する
    ///
    /// `replay` サブコマンドを前提としないエンジンのラッパーや、
    /// テストでの差し替えに使います。
    pub fn from_parts<P, I, S>(program: P, args: I) -> Self
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self {
            program: program.as_ref().to_path_buf(),
            args: args.into_iter().map(|a| a.as_ref().to_owned()).collect(),
        }
    }

    /// 実行ファイルを取得する
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// 引数を取得する
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for ReplayInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_trace_dir() {
        let inv = ReplayInvocation::rr(None);
        assert_eq!(inv.program(), Path::new("rr"));
        assert_eq!(inv.args(), &[OsString::from("replay")]);
    }

    #[test]
    fn test_trace_dir_is_last_argument() {
        let dir = Path::new("/tmp/rr/latest-trace");
        let inv = ReplayInvocation::rr(Some(dir));
        assert_eq!(inv.args().len(), 2);
        assert_eq!(inv.args().last().unwrap(), dir.as_os_str());
    }

    #[test]
    fn test_custom_program() {
        let inv = ReplayInvocation::new("/opt/rr/bin/rr", None);
        assert_eq!(inv.program(), Path::new("/opt/rr/bin/rr"));
        assert_eq!(inv.args()[0], "replay");
    }

    #[test]
    fn test_display() {
        let inv = ReplayInvocation::rr(Some(Path::new("my trace")));
        assert_eq!(inv.to_string(), "rr replay 'my trace'");
        assert_eq!(ReplayInvocation::rr(None).to_string(), "rr replay");
    }
}
