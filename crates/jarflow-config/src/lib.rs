pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// プロジェクトファイルの候補（優先順）
pub const PROJECT_FILE_CANDIDATES: [&str; 3] =
    ["jarflow.kdl", ".jarflow.kdl", ".jarflow/jarflow.kdl"];

/// ダウンロードしたアーティファクトのキャッシュディレクトリを取得
///
/// 1. 環境変数 JARFLOW_CACHE_DIR
/// 2. ~/.cache/jarflow/artifacts（OS ごとのキャッシュディレクトリ）
pub fn get_cache_dir() -> Result<PathBuf> {
    let cache_dir = match std::env::var("JARFLOW_CACHE_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => dirs::cache_dir()
            .ok_or(ConfigError::CacheDirNotFound)?
            .join("jarflow")
            .join("artifacts"),
    };

    if !cache_dir.exists() {
        std::fs::create_dir_all(&cache_dir)?;
    }

    Ok(cache_dir)
}

/// Maven のローカルリポジトリ（~/.m2/repository）
///
/// repositories が指定されていないプロジェクトのデフォルトの取得元
pub fn default_local_repository() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".m2").join("repository"))
}

/// 先頭の `~/` をホームディレクトリに展開
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.to_str().and_then(|s| s.strip_prefix("~/")) {
        Some(rest) => {
            let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
            Ok(home.join(rest))
        }
        None => Ok(path.to_path_buf()),
    }
}

/// プロジェクトの jarflow.kdl を探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 環境変数 JARFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリから上に向かって: jarflow.kdl, .jarflow.kdl, .jarflow/jarflow.kdl
pub fn find_project_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("JARFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Using JARFLOW_CONFIG_PATH");
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "JARFLOW_CONFIG_PATH does not exist, searching instead");
    }

    let current_dir = std::env::current_dir()?;
    find_project_file_from(&current_dir)
}

/// 指定ディレクトリから上に向かって jarflow.kdl を探す
pub fn find_project_file_from(start: &Path) -> Result<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        for candidate in &PROJECT_FILE_CANDIDATES {
            let path = current.join(candidate);
            if path.is_file() {
                tracing::debug!(path = %path.display(), "Found project file");
                return Ok(path);
            }
        }

        // 親ディレクトリへ
        if !current.pop() {
            break;
        }
    }

    Err(ConfigError::ProjectFileNotFound)
}
