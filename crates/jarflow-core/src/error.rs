use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("無効な座標: '{0}' (group:name:version 形式で指定してください)")]
    InvalidCoordinate(String),

    #[error("無効なイメージタグ: {0}")]
    InvalidTag(String),

    #[error("無効なプラットフォーム: '{0}' (例: linux/amd64, linux/arm64/v8)")]
    InvalidPlatform(String),

    #[error("バージョンカタログの読み込みに失敗しました: {path}\n理由: {message}")]
    CatalogParse { path: PathBuf, message: String },

    #[error("カタログにエイリアスが見つかりません: {0}")]
    UnknownAlias(String),

    #[error("カタログのバージョン参照が解決できません: {alias} -> version.ref = \"{reference}\"")]
    UnresolvedVersionRef { alias: String, reference: String },

    #[error("エイリアス '{0}' を使っていますが catalog が指定されていません")]
    CatalogMissing(String),

    #[error(
        "プロジェクトルートが見つかりません\n探索開始位置: {0}\nヒント: jarflow.kdl ファイルを含むディレクトリで実行してください"
    )]
    ProjectRootNotFound(PathBuf),

    #[error("タスクが見つかりません: {0}")]
    UnknownTask(String),

    #[error("循環依存が検出されました: {0}")]
    CircularDependency(String),
}

pub type Result<T> = std::result::Result<T, ProjectError>;
