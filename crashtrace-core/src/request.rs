//! トレース要求

use crate::errors::TraceError;
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// デフォルトのステップ数
pub const DEFAULT_STEPS: u32 = 100;

/// 各ステップで表示する内容
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// ソース行単位（list / info locals / next）
    #[default]
    Source,
    /// 命令単位（disassemble / info registers / nexti）
    Assembly,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Source => write!(f, "source"),
            OutputMode::Assembly => write!(f, "assembly"),
        }
    }
}

impl FromStr for OutputMode {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" | "src" => Ok(OutputMode::Source),
            "assembly" | "asm" => Ok(OutputMode::Assembly),
            other => Err(TraceError::UnknownOutputMode(other.to_string())),
        }
    }
}

/// クラッシュの種類
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultMode {
    /// 通常のクラッシュ。クラッシュ地点から逆方向にステップ実行する
    #[default]
    Plain,
    /// サニタイザー（ASAN）が検出したクラッシュ
    ///
    /// サニタイザーのランタイムがクラッシュ地点と停止地点の間に複数のフレームを挟むため、
    /// アプリケーション側の最後のフレームへの移動は利用者が手動で行う。
    Sanitizer,
}

impl fmt::Display for FaultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultMode::Plain => write!(f, "plain"),
            FaultMode::Sanitizer => write!(f, "asan"),
        }
    }
}

impl FromStr for FaultMode {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(FaultMode::Plain),
            "asan" | "sanitizer" => Ok(FaultMode::Sanitizer),
            other => Err(TraceError::UnknownFaultMode(other.to_string())),
        }
    }
}

/// 1回の実行に対するトレース要求
///
/// 引数から一度だけ構築され、実行中は変更されません。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRequest {
    trace_dir: Option<PathBuf>,
    steps: NonZeroU32,
    output: OutputMode,
    fault: FaultMode,
}

impl TraceRequest {
    /// ステップ数を指定して要求を作成する
    ///
    /// ステップ数が0の場合はエラーになります。
    pub fn new(steps: u32) -> Result<Self, TraceError> {
        let steps = NonZeroU32::new(steps).ok_or(TraceError::InvalidStepCount)?;
        Ok(Self {
            trace_dir: None,
            steps,
            output: OutputMode::default(),
            fault: FaultMode::default(),
        })
    }

    /// 再生するトレースディレクトリを指定する（未指定なら最新の記録）
    pub fn with_trace_dir(mut self, trace_dir: Option<PathBuf>) -> Self {
        self.trace_dir = trace_dir;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_fault(mut self, fault: FaultMode) -> Self {
        self.fault = fault;
        self
    }

    pub fn trace_dir(&self) -> Option<&Path> {
        self.trace_dir.as_deref()
    }

    pub fn steps(&self) -> u32 {
        self.steps.get()
    }

    pub fn output(&self) -> OutputMode {
        self.output
    }

    pub fn fault(&self) -> FaultMode {
        self.fault
    }
}

impl Default for TraceRequest {
    fn default() -> Self {
        Self {
            trace_dir: None,
            steps: NonZeroU32::new(DEFAULT_STEPS).unwrap_or(NonZeroU32::MIN),
            output: OutputMode::default(),
            fault: FaultMode::default(),
        }
    }
}
