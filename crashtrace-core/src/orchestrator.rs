//! トレース取得の実行と結果の報告

use crate::errors::ASAN_NOTE;
use crate::request::{FaultMode, TraceRequest};
use crate::script::CommandScript;
use crate::Result;
use crashtrace_replay::{
    ProcessOutput, ReplayError, ReplayInvocation, ReplayRunner, DEFAULT_PROGRAM,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 1回の実行結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// リプレイエンジンが終了した（エンジン自体の終了コードは問わない）
    Completed {
        /// エンジンの終了コード（シグナル終了なら `None`）
        inner_code: Option<i32>,
    },
    /// 制限時間を超えた
    TimedOut,
    /// 起動または通信に失敗した
    Failed,
}

impl Outcome {
    /// プロセスの終了コード
    ///
    /// デバッガは通常のセッションの後でも0以外で終了することがあるので、
    /// `Completed` は常に0になります。
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Completed { .. } => 0,
            Outcome::TimedOut | Outcome::Failed => 1,
        }
    }
}

/// リプレイエンジンを起動してトレースを取得する
pub struct Orchestrator<R> {
    runner: R,
    program: PathBuf,
}

impl<R: ReplayRunner> Orchestrator<R> {
    /// デフォルトの `rr` を使うオーケストレータを作成する
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: PathBuf::from(DEFAULT_PROGRAM),
        }
    }

    /// リプレイエンジンの実行ファイルを指定する
    pub fn with_program<P: AsRef<Path>>(mut self, program: P) -> Self {
        self.program = program.as_ref().to_path_buf();
        self
    }

    /// ランナーを取得する
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// トレース要求に対する起動内容を作成する
    pub fn invocation(&self, request: &TraceRequest) -> ReplayInvocation {
        ReplayInvocation::new(&self.program, request.trace_dir())
    }

    /// トレースを取得して結果を報告する
    ///
    /// エンジンの標準出力は `out` に、警告やエラーは `err` に書き出します。
    /// 失敗はすべてここで報告され、呼び出し元には終了コードだけが返ります。
    pub fn run<O, E>(&self, request: &TraceRequest, out: &mut O, err: &mut E) -> Result<Outcome>
    where
        O: Write,
        E: Write,
    {
        if request.fault() == FaultMode::Sanitizer {
            for line in ASAN_NOTE {
                writeln!(out, "{}", line)?;
            }
            writeln!(out)?;
        }

        let script = CommandScript::build(request);
        let invocation = self.invocation(request);
        debug!(
            steps = request.steps(),
            output = %request.output(),
            fault = %request.fault(),
            commands = script.len(),
            "built debugger script"
        );

        let outcome = match self.runner.run(&invocation, &script.render()) {
            Ok(output) => {
                report_output(&output, out, err)?;
                Outcome::Completed {
                    inner_code: output.code,
                }
            }
            Err(e @ ReplayError::Timeout(_)) => {
                debug!(error = %e, "replay failed");
                writeln!(err, "Error: {}", e)?;
                Outcome::TimedOut
            }
            Err(e) => {
                debug!(error = %e, "replay failed");
                writeln!(err, "Error: {}", e)?;
                Outcome::Failed
            }
        };

        out.flush()?;
        err.flush()?;
        Ok(outcome)
    }

    /// エンジンを起動せずに、起動内容とスクリプトだけを書き出す
    pub fn dry_run<O: Write>(&self, request: &TraceRequest, out: &mut O) -> Result<()> {
        let script = CommandScript::build(request);
        writeln!(out, "# {}", self.invocation(request))?;
        writeln!(out, "{}", script.render())?;
        out.flush()?;
        Ok(())
    }
}

/// 終了したエンジンの出力を報告する
fn report_output<O: Write, E: Write>(output: &ProcessOutput, out: &mut O, err: &mut E) -> Result<()> {
    writeln!(out, "{}", output.stdout_lossy())?;

    if !output.success() {
        match (output.code, output.signal) {
            (Some(code), _) => writeln!(err, "Warning: gdb exited with code {}", code)?,
            (None, Some(signal)) => writeln!(err, "Warning: gdb terminated by signal {}", signal)?,
            (None, None) => writeln!(err, "Warning: gdb terminated abnormally")?,
        }
        writeln!(err, "{}", output.stderr_lossy())?;
    }

    Ok(())
}
