use crate::builder::ImageBuildRequest;
use crate::context::relative_path;
use crate::error::{BuildError, BuildResult};
use jarflow_core::{BuildContext, ImageTagSet, Platform, Project};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// 機密情報を含む可能性があるビルド引数名
const SENSITIVE_PATTERNS: [&str; 5] = ["password", "token", "secret", "api_key", "private_key"];

/// プロジェクト設定からイメージビルドの入力を解決する
pub struct BuildResolver<'a> {
    project: &'a Project,
}

impl<'a> BuildResolver<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// ビルドリクエストを組み立てる
    ///
    /// `platform` は呼び出し側の指定で、None ならプロジェクト設定、
    /// それも無ければホストの既定を使う。
    pub fn resolve(
        &self,
        archive: &Path,
        platform: Option<Platform>,
        no_cache: bool,
    ) -> BuildResult<ImageBuildRequest> {
        let dockerfile = self.resolve_dockerfile()?;
        let context = self.resolve_context()?;
        let build_args = self.resolve_build_args(&context, archive)?;
        let tags = self.resolve_tags()?;
        let platform = platform.or_else(|| self.project.docker.platform.clone());

        Ok(ImageBuildRequest {
            dockerfile,
            context: BuildContext::new(context, platform),
            build_args,
            tags,
            no_cache,
            pull: self.project.docker.pull,
        })
    }

    /// Dockerfileのパスを解決（既定: src/main/docker/Dockerfile）
    pub fn resolve_dockerfile(&self) -> BuildResult<PathBuf> {
        let path = self.project.dockerfile_path();
        if !path.is_file() {
            return Err(BuildError::DockerfileNotFound(path));
        }
        tracing::debug!(dockerfile = %path.display(), "Resolved Dockerfile");
        Ok(path)
    }

    /// ビルドコンテキストのパスを解決
    ///
    /// デフォルトはプロジェクトルート
    pub fn resolve_context(&self) -> BuildResult<PathBuf> {
        let context = self.project.context_dir();

        // コンテキストディレクトリの存在確認
        if !context.exists() {
            return Err(BuildError::ContextNotFound(context));
        }

        if !context.is_dir() {
            return Err(BuildError::InvalidConfig(format!(
                "Build context is not a directory: {}",
                context.display()
            )));
        }

        Ok(context)
    }

    /// ビルド引数を解決
    ///
    /// 値の `{VAR}` はプロジェクト変数と環境変数で展開する。
    /// アーカイブのコンテキスト相対パスは常に `jar-arg`（既定 JAR）で渡す。
    pub fn resolve_build_args(
        &self,
        context: &Path,
        archive: &Path,
    ) -> BuildResult<BTreeMap<String, String>> {
        let mut resolved_args = BTreeMap::new();

        for (key, value) in &self.project.docker.build_args {
            self.validate_build_arg(key);
            resolved_args.insert(key.clone(), self.project.expand(value));
        }

        let jar_arg = self.project.jar_arg();
        let relative = relative_path(context, archive).ok_or_else(|| {
            BuildError::InvalidConfig(format!(
                "アーカイブがビルドコンテキストの外にあります: {} (context: {})",
                archive.display(),
                context.display()
            ))
        })?;
        if let Some(previous) = resolved_args.insert(jar_arg.to_string(), relative) {
            tracing::warn!(
                arg = %jar_arg,
                value = %previous,
                "build-arg is overridden by the archive path"
            );
        }

        Ok(resolved_args)
    }

    /// イメージタグを解決（`<name>:<version>`, `<name>:latest`, 追加のイメージ）
    pub fn resolve_tags(&self) -> BuildResult<ImageTagSet> {
        self.project
            .image_tags()
            .map_err(|e| BuildError::InvalidConfig(e.to_string()))
    }

    /// ビルド引数の検証（機密情報の警告）
    pub fn validate_build_arg(&self, key: &str) -> bool {
        let key_lower = key.to_lowercase();
        let sensitive = SENSITIVE_PATTERNS.iter().any(|p| key_lower.contains(p));
        if sensitive {
            tracing::warn!(
                "警告: ビルド引数 '{}' は機密情報を含む可能性があります。\n\
                 ビルド引数はイメージ履歴に記録されます。\n\
                 機密情報はビルド引数ではなく、シークレットマウントを使用してください。",
                key
            );
        }
        sensitive
    }
}
