//! crashtrace CLI - コマンドラインインターフェース
//!
//! rr の記録を再生してクラッシュ地点を探し、その直前に実行された
//! ソース行または命令のトレースを表示します。

use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use crashtrace_core::{FaultMode, Orchestrator, OutputMode, SubprocessRunner, TraceRequest};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// crashtrace - Extract the execution trace leading up to a crash from an rr recording
#[derive(Debug, Parser)]
#[command(name = "crashtrace")]
#[command(version)]
#[command(about = "Extract execution trace before crash from rr recording", long_about = None)]
struct Cli {
    /// Path to rr trace directory (default: latest recording)
    trace_dir: Option<PathBuf>,

    /// Number of steps to trace
    #[arg(short = 'n', long, default_value_t = crashtrace_core::DEFAULT_STEPS,
          value_parser = clap::value_parser!(u32).range(1..))]
    steps: u32,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Source)]
    format: Format,

    /// Handle ASAN crash (requires manual frame navigation)
    #[arg(long)]
    asan: bool,

    /// rr executable to run
    #[arg(long, env = "CRASHTRACE_RR", default_value = crashtrace_replay::DEFAULT_PROGRAM)]
    rr: PathBuf,

    /// Seconds to wait for the replay before giving up
    #[arg(long, default_value_t = crashtrace_replay::DEFAULT_TIMEOUT.as_secs(),
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Print the rr command and the gdb batch script instead of running them
    #[arg(long)]
    print_script: bool,

    /// Increase log verbosity (-v: info, -vv: debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// 出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Source lines with locals
    Source,
    /// Instructions with registers
    Assembly,
}

impl From<Format> for OutputMode {
    fn from(format: Format) -> Self {
        match format {
            Format::Source => OutputMode::Source,
            Format::Assembly => OutputMode::Assembly,
        }
    }
}

impl Cli {
    /// 引数からトレース要求を組み立てる
    fn request(&self) -> Result<TraceRequest> {
        let fault = if self.asan {
            FaultMode::Sanitizer
        } else {
            FaultMode::Plain
        };

        Ok(TraceRequest::new(self.steps)?
            .with_trace_dir(self.trace_dir.clone())
            .with_output(self.format.into())
            .with_fault(fault))
    }
}

/// ログ出力を初期化する
///
/// デバッガの出力を標準出力に流すので、ログは標準エラー出力に書き出す。
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let request = cli.request()?;
    debug!(?request, rr = %cli.rr.display(), timeout = cli.timeout, "parsed arguments");
    let runner = SubprocessRunner::new(Duration::from_secs(cli.timeout));
    let orchestrator = Orchestrator::new(runner).with_program(&cli.rr);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if cli.print_script {
        orchestrator.dry_run(&request, &mut out)?;
        return Ok(());
    }

    let stderr = std::io::stderr();
    let mut err = stderr.lock();
    let outcome = orchestrator.run(&request, &mut out, &mut err)?;

    std::process::exit(outcome.exit_code());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["crashtrace"]).unwrap();
        let req = cli.request().unwrap();
        assert_eq!(req.steps(), 100);
        assert_eq!(req.output(), OutputMode::Source);
        assert_eq!(req.fault(), FaultMode::Plain);
        assert!(req.trace_dir().is_none());
        assert_eq!(cli.timeout, 60);
    }

    #[test]
    fn test_all_options() {
        let cli = Cli::try_parse_from([
            "crashtrace", "-n", "25", "-f", "assembly", "--asan", "/tmp/rr/app-0",
        ])
        .unwrap();
        let req = cli.request().unwrap();
        assert_eq!(req.steps(), 25);
        assert_eq!(req.output(), OutputMode::Assembly);
        assert_eq!(req.fault(), FaultMode::Sanitizer);
        assert_eq!(req.trace_dir(), Some(std::path::Path::new("/tmp/rr/app-0")));
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert!(Cli::try_parse_from(["crashtrace", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["crashtrace", "--steps", "-5"]).is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(Cli::try_parse_from(["crashtrace", "--format", "intel"]).is_err());
    }
}
