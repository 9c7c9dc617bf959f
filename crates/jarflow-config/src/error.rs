use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("キャッシュディレクトリが見つかりません")]
    CacheDirNotFound,

    #[error("ホームディレクトリが見つかりません")]
    HomeDirNotFound,

    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリとその親: jarflow.kdl, .jarflow.kdl\n\
        - ./.jarflow/ ディレクトリ\n\
        または JARFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ProjectFileNotFound,

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
