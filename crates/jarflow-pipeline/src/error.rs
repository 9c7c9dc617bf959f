use crate::trace::ExecutionTrace;
use jarflow_archive::ArchiveError;
use jarflow_build::BuildError;
use jarflow_core::ProjectError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("イメージビルド開始時にアーカイブが存在しません: {0}")]
    ArchiveMissing(PathBuf),

    #[error("イメージビルドのバックエンドが設定されていません")]
    NoImageBackend,

    #[error("タスク '{0}' の実行方法が定義されていません")]
    UnsupportedTask(String),

    #[error("タスク '{task}' が失敗しました: {source}")]
    TaskFailed {
        task: String,
        trace: ExecutionTrace,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// 失敗の根本原因
    pub fn root_cause(&self) -> &PipelineError {
        match self {
            PipelineError::TaskFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// 失敗時点までの実行トレース
    pub fn trace(&self) -> Option<&ExecutionTrace> {
        match self {
            PipelineError::TaskFailed { trace, .. } => Some(trace),
            _ => None,
        }
    }

    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::TaskFailed { task, source, .. } => {
                format!("タスク '{}' が失敗しました\n\n{}", task, source.user_message())
            }
            PipelineError::Build(e) => e.user_message(),
            PipelineError::Archive(ArchiveError::ResolutionFailed { coordinate, tried }) => {
                format!(
                    "依存を解決できませんでした: {}\n\
                     探索した場所:\n{}\n\
                     \n\
                     jarflow.kdl の repositories と座標を確認してください。\n\
                     アーカイブとイメージは作成されていません。",
                    coordinate, tried
                )
            }
            PipelineError::ArchiveMissing(path) => {
                format!(
                    "イメージビルドの入力となるアーカイブがありません: {}\n\
                     \n\
                     dockerize は shadow-jar の完了後に実行される必要があります。\n\
                     `jarflow tasks dockerize` で実行計画を確認してください。",
                    path.display()
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
