use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("依存を解決できません: {coordinate}\n探索した場所:\n{tried}")]
    ResolutionFailed { coordinate: String, tried: String },

    #[error("入力が見つかりません: {0}")]
    SourceNotFound(PathBuf),

    #[error("無効なパターン '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("jar の読み書きに失敗しました: {path}\n理由: {message}")]
    Jar { path: PathBuf, message: String },

    #[error("zip エラー: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("テンプレートエラー: {0}")]
    Template(#[from] tera::Error),

    #[error("HTTP エラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Config(#[from] jarflow_config::ConfigError),

    #[error(transparent)]
    Project(#[from] jarflow_core::ProjectError),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
