//! 依存アーティファクトの解決
//!
//! 宣言された座標ごとに 1 つの jar ファイルを特定する。
//! 推移的な依存の解決は行わない。

use crate::error::{ArchiveError, Result};
use async_trait::async_trait;
use jarflow_core::{Coordinate, Project, Repository, ResolvedDependency};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 解決済みの依存とその実ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub dependency: ResolvedDependency,
    pub path: PathBuf,
}

/// 座標からアーティファクトのファイルを取得する
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf>;
}

/// 宣言順に全ての依存を解決する
///
/// 最初に解決できなかった依存でエラーを返す。
pub async fn resolve_all(
    resolver: &dyn ArtifactResolver,
    dependencies: &[&ResolvedDependency],
) -> Result<Vec<ResolvedArtifact>> {
    let mut artifacts = Vec::with_capacity(dependencies.len());

    for dependency in dependencies {
        let path = resolver.resolve(&dependency.coordinate).await?;
        tracing::debug!(
            coordinate = %dependency.coordinate,
            path = %path.display(),
            "Resolved artifact"
        );
        artifacts.push(ResolvedArtifact {
            dependency: (*dependency).clone(),
            path,
        });
    }

    Ok(artifacts)
}

/// Maven レイアウトのリポジトリから解決するリゾルバ
///
/// ローカルリポジトリ → ダウンロードキャッシュ → リモートリポジトリ の順に探す。
pub struct RepositoryResolver {
    repositories: Vec<Repository>,
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl RepositoryResolver {
    pub fn new(repositories: Vec<Repository>, cache_dir: PathBuf) -> Self {
        Self {
            repositories,
            cache_dir,
            client: reqwest::Client::new(),
        }
    }

    /// プロジェクト設定から作成
    ///
    /// repositories が空の場合は ~/.m2/repository を使う。
    pub fn for_project(project: &Project) -> Result<Self> {
        let mut repositories = project.repositories.clone();
        if repositories.is_empty()
            && let Some(local) = jarflow_config::default_local_repository()
        {
            repositories.push(Repository::Local(local));
        }

        let cache_dir = jarflow_config::get_cache_dir()?;
        Ok(Self::new(repositories, cache_dir))
    }

    pub fn repositories(&self) -> &[Repository] {
        &self.repositories
    }

    fn cached_path(&self, coordinate: &Coordinate) -> PathBuf {
        self.cache_dir.join(coordinate.repository_path())
    }

    /// リモートリポジトリからキャッシュにダウンロード
    ///
    /// 見つからなければ `Ok(None)`。
    async fn download(&self, base_url: &str, coordinate: &Coordinate) -> Result<Option<PathBuf>> {
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            coordinate.repository_url_path()
        );
        tracing::info!(url = %url, "Downloading artifact");

        let response = self
            .client
            .get(&url)
            .header("User-Agent", concat!("jarflow/", env!("CARGO_PKG_VERSION")))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        let bytes = response.bytes().await?;

        let target = self.cached_path(coordinate);
        write_atomically(&target, &bytes)?;
        Ok(Some(target))
    }
}

#[async_trait]
impl ArtifactResolver for RepositoryResolver {
    async fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf> {
        let mut tried = Vec::new();

        for repository in &self.repositories {
            if let Repository::Local(dir) = repository {
                let dir = jarflow_config::expand_home(dir)?;
                let candidate = dir.join(coordinate.repository_path());
                if candidate.is_file() {
                    return Ok(candidate);
                }
                tried.push(format!("  - {}", candidate.display()));
            }
        }

        let cached = self.cached_path(coordinate);
        if cached.is_file() {
            tracing::debug!(coordinate = %coordinate, "Using cached artifact");
            return Ok(cached);
        }

        for repository in &self.repositories {
            if let Repository::Maven(url) = repository {
                match self.download(url, coordinate).await {
                    Ok(Some(path)) => return Ok(path),
                    Ok(None) => tried.push(format!("  - {} (404)", url)),
                    Err(e) => {
                        tracing::warn!(url = %url, error = %e, "Download failed");
                        tried.push(format!("  - {} ({})", url, e));
                    }
                }
            }
        }

        if tried.is_empty() {
            tried.push("  (リポジトリが設定されていません)".to_string());
        }

        Err(ArchiveError::ResolutionFailed {
            coordinate: coordinate.to_string(),
            tried: tried.join("\n"),
        })
    }
}

/// 同じディレクトリの一時ファイルに書いてからリネーム
fn write_atomically(target: &Path, bytes: &[u8]) -> Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| ArchiveError::InvalidConfig(format!("無効なパス: {}", target.display())))?;
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    crate::merger::persist_output(temp, target)
}
