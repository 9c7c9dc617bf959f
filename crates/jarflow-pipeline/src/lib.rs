//! jarflow pipeline
//!
//! タスクグラフの実行計画に従って、依存解決・配布物作成・fat jar・
//! イメージビルドを順に実行する。

pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod trace;

pub use error::{PipelineError, Result};
pub use fingerprint::Fingerprint;
pub use pipeline::{Pipeline, PipelineOptions, PipelineReport};
pub use trace::{ExecutionTrace, TraceEvent};
