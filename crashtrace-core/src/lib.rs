//! crashtrace のコア機能
//!
//! このクレートは、クラッシュ直前の実行トレースを取り出すための中核ロジックを提供します。
//! 要求の検証、デバッガ用バッチスクリプトの生成、リプレイエンジンの実行結果の報告を統合します。

pub mod command;
pub mod errors;
pub mod orchestrator;
pub mod request;
pub mod script;

pub use command::DebuggerCommand;
pub use errors::TraceError;
pub use orchestrator::{Orchestrator, Outcome};
pub use request::{FaultMode, OutputMode, TraceRequest, DEFAULT_STEPS};
pub use script::CommandScript;

// 他のクレートから使用するために再エクスポート
pub use crashtrace_replay::{ReplayInvocation, ReplayRunner, SubprocessRunner};

/// コア処理の結果型
pub type Result<T> = anyhow::Result<T>;
