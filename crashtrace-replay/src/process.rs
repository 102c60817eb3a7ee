//! リプレイエンジンのプロセス実行機能

use crate::invocation::ReplayInvocation;
use std::borrow::Cow;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// リプレイエンジンの実行時間の上限（デフォルト）
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// リプレイエンジン実行時のエラー
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// 制限時間内にプロセスが終了しなかった
    #[error("Command timed out after {}", format_duration(.0))]
    Timeout(Duration),

    /// 実行ファイルを起動できなかった
    #[error("Failed to launch '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// プロセスとの入出力に失敗した
    #[error("Failed to communicate with replay engine: {0}")]
    Io(#[from] std::io::Error),

    /// 非同期ランタイムを構築できなかった
    #[error("Failed to build async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

fn format_duration(duration: &Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{} seconds", duration.as_secs())
    } else {
        format!("{} ms", duration.as_millis())
    }
}

/// 終了したリプレイエンジンの結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// 終了コード（シグナルで終了した場合は `None`）
    pub code: Option<i32>,
    /// 終了させたシグナル番号（Unixのみ）
    pub signal: Option<i32>,
    /// 標準出力
    pub stdout: Vec<u8>,
    /// 標準エラー出力
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    /// 終了コードが0かどうか
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// 標準出力をUTF-8として解釈する（不正なバイト列は置換文字になる）
    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// 標準エラー出力をUTF-8として解釈する（不正なバイト列は置換文字になる）
    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }
}

impl From<std::process::Output> for ProcessOutput {
    fn from(output: std::process::Output) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            output.status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: output.status.code(),
            signal,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

/// リプレイエンジンを1回実行する
///
/// バッチスクリプトを標準入力に渡し、終了したプロセスの出力を返します。
/// 再試行は行いません。
pub trait ReplayRunner {
    fn run(&self, invocation: &ReplayInvocation, script: &str)
        -> Result<ProcessOutput, ReplayError>;
}

/// 実際にサブプロセスを起動するランナー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubprocessRunner {
    timeout: Duration,
}

impl SubprocessRunner {
    /// 指定した制限時間でランナーを作成する
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// 制限時間を取得する
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// サブプロセスを起動して終了まで待機する
    ///
    /// スクリプトの書き込みと出力の読み出しを並行して行うので、
    /// パイプのバッファが埋まってもデッドロックしません。
    /// 制限時間を超えた場合、子プロセスは `kill_on_drop` により強制終了されます。
    async fn run_async(
        &self,
        invocation: &ReplayInvocation,
        script: &str,
    ) -> Result<ProcessOutput, ReplayError> {
        let mut child = Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ReplayError::Spawn {
                program: invocation.program().to_path_buf(),
                source,
            })?;

        debug!(pid = ?child.id(), "replay engine spawned");

        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(script.as_bytes()).await {
                // エンジンがスクリプトを読み切る前に終了した場合
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    warn!("replay engine closed stdin before the whole script was sent");
                    Ok(())
                }
                Err(e) => Err(e),
                Ok(()) => stdin.shutdown().await.or_else(|e| {
                    if e.kind() == std::io::ErrorKind::BrokenPipe {
                        Ok(())
                    } else {
                        Err(e)
                    }
                }),
            }
        };

        let exchange = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(Ok(output)) => {
                let output = ProcessOutput::from(output);
                info!(code = ?output.code, signal = ?output.signal, "replay engine exited");
                Ok(output)
            }
            Ok(Err(e)) => Err(ReplayError::Io(e)),
            Err(_) => {
                info!(timeout = ?self.timeout, "replay engine timed out, killing it");
                Err(ReplayError::Timeout(self.timeout))
            }
        }
    }
}

impl Default for SubprocessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl ReplayRunner for SubprocessRunner {
    fn run(
        &self,
        invocation: &ReplayInvocation,
        script: &str,
    ) -> Result<ProcessOutput, ReplayError> {
        info!(command = %invocation, timeout = ?self.timeout, "launching replay engine");

        // 呼び出し元のスレッドだけで完結させる
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ReplayError::Runtime)?;

        runtime.block_on(self.run_async(invocation, script))
    }
}
