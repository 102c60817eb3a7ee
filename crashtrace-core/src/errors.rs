//! エラー型とエラーメッセージ定数

/// トレース要求の検証エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    /// ステップ数が0
    #[error("Step count must be a positive integer")]
    InvalidStepCount,

    /// 不明な出力形式
    #[error("Unknown output format '{0}' (expected 'source' or 'assembly')")]
    UnknownOutputMode(String),

    /// 不明なクラッシュ種別
    #[error("Unknown fault mode '{0}' (expected 'plain' or 'asan')")]
    UnknownFaultMode(String),
}

/// サニタイザーモードで実行前に表示する注意書き
pub const ASAN_NOTE: &[&str] = &[
    "NOTE: For ASAN crashes, you must manually identify the last app frame.",
    "This script provides a template. Consider running interactively.",
];
