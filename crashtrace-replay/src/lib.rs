//! crashtrace リプレイエンジン制御
//!
//! このクレートは、記録済みの実行（rr のトレース）を再生するリプレイエンジンを
//! サブプロセスとして起動するための低レベル機能を提供します。
//! コマンドラインの組み立て、標準入力へのバッチスクリプト送信、出力の取得、
//! タイムアウト制御を行います。

pub mod invocation;
pub mod process;

pub use invocation::{ReplayInvocation, DEFAULT_PROGRAM, REPLAY_SUBCOMMAND};
pub use process::{
    ProcessOutput, ReplayError, ReplayRunner, SubprocessRunner, DEFAULT_TIMEOUT,
};
