use crate::auth::RegistryAuth;
use crate::context::{ContextArchive, ContextBuilder};
use crate::error::{BuildError, BuildResult};
use crate::progress::BuildProgress;
use async_trait::async_trait;
use bollard::Docker;
use bollard::auth::DockerCredentials;
use futures_util::stream::StreamExt;
use jarflow_core::{BuildContext, ImageTagSet, Platform};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// 1 回のイメージビルドに必要な入力
#[derive(Debug, Clone)]
pub struct ImageBuildRequest {
    pub dockerfile: PathBuf,
    pub context: BuildContext,
    pub build_args: BTreeMap<String, String>,
    pub tags: ImageTagSet,
    pub no_cache: bool,
    /// ベースイメージを常に取得し直す
    pub pull: bool,
}

impl ImageBuildRequest {
    /// None ならビルダーの既定（ホスト）のプラットフォーム
    pub fn platform(&self) -> Option<&Platform> {
        self.context.platform.as_ref()
    }

    fn primary_tag(&self) -> BuildResult<String> {
        self.tags
            .primary()
            .map(|t| t.to_string())
            .ok_or_else(|| BuildError::InvalidConfig("イメージタグがありません".to_string()))
    }
}

/// ビルドされたイメージ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    pub tags: Vec<String>,
    pub platform: Option<Platform>,
}

/// イメージをビルドするバックエンド
#[async_trait]
pub trait ImageBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn build(&self, request: &ImageBuildRequest) -> BuildResult<BuiltImage>;
}

/// Docker Engine API (bollard) でビルドする
pub struct DockerApiBuilder {
    docker: Docker,
    auth: RegistryAuth,
}

impl DockerApiBuilder {
    pub fn new(docker: Docker) -> Self {
        Self {
            docker,
            auth: RegistryAuth::new(),
        }
    }

    pub fn with_auth(docker: Docker, auth: RegistryAuth) -> Self {
        Self { docker, auth }
    }

    /// イメージの存在確認
    pub async fn image_exists(&self, image_tag: &str) -> BuildResult<bool> {
        match self.docker.inspect_image(image_tag).await {
            Ok(_) => Ok(true),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                ..
            }) => Ok(false),
            Err(e) => Err(BuildError::DockerConnection(e)),
        }
    }

    /// ビルド出力の処理
    fn handle_build_output(
        progress: &BuildProgress,
        output: bollard::models::BuildInfo,
    ) -> BuildResult<()> {
        if let Some(stream) = output.stream {
            tracing::debug!(target: "jarflow_build::docker", "{}", stream.trim_end());
            progress.set_message(&stream);
        }

        if let Some(error) = output.error {
            return Err(BuildError::BuildFailed(error));
        }

        if let Some(error_detail) = output.error_detail {
            let error_msg = error_detail
                .message
                .unwrap_or_else(|| "Unknown build error".to_string());
            return Err(BuildError::BuildFailed(error_msg));
        }

        if let Some(status) = output.status {
            progress.set_message(&status);
        }

        Ok(())
    }

    /// ビルドコンテキストとベースイメージの認証情報を用意する
    ///
    /// ファイル走査と credential helper の実行はブロッキングなので専用スレッドで行う。
    async fn prepare(
        &self,
        request: &ImageBuildRequest,
    ) -> BuildResult<(ContextArchive, HashMap<String, DockerCredentials>)> {
        let directory = request.context.directory.clone();
        let dockerfile = request.dockerfile.clone();
        let auth = self.auth.clone();

        tokio::task::spawn_blocking(move || -> BuildResult<_> {
            let context = ContextBuilder::create_context(&directory, &dockerfile)?;
            let content = std::fs::read_to_string(&dockerfile)?;
            let credentials = auth.credentials_for_dockerfile(&content)?;
            Ok((context, credentials))
        })
        .await
        .map_err(|e| BuildError::BuildFailed(format!("ビルドコンテキストの作成に失敗しました: {}", e)))?
    }

    /// Engine API に渡すビルドオプション
    #[allow(deprecated)]
    pub fn build_options<'r>(
        request: &'r ImageBuildRequest,
        dockerfile: &'r str,
        primary: &'r str,
    ) -> bollard::image::BuildImageOptions<&'r str> {
        bollard::image::BuildImageOptions {
            dockerfile,
            t: primary,
            buildargs: request
                .build_args
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            nocache: request.no_cache,
            rm: true,      // 中間コンテナを削除
            forcerm: true, // ビルド失敗時も中間コンテナを削除
            pull: request.pull,
            // 空文字ならデーモンの既定プラットフォーム
            platform: request.platform().map(Platform::as_str).unwrap_or(""),
            ..Default::default()
        }
    }

    async fn run_build(
        &self,
        request: &ImageBuildRequest,
        primary: &str,
        progress: &BuildProgress,
    ) -> BuildResult<()> {
        let (context, credentials) = self.prepare(request).await?;
        let options = Self::build_options(request, &context.dockerfile, primary);

        use bytes::Bytes;
        use http_body_util::{Either, Full};
        let body = Full::new(Bytes::from(context.data));
        let credentials = (!credentials.is_empty()).then_some(credentials);
        let mut stream = self
            .docker
            .build_image(options, credentials, Some(Either::Left(body)));

        while let Some(msg) = stream.next().await {
            let output = msg.map_err(BuildError::DockerConnection)?;
            Self::handle_build_output(progress, output)?;
        }
        Ok(())
    }

    /// 残りのタグを付与し、すべてのタグがローカルにあることを確かめる
    async fn apply_tags(&self, request: &ImageBuildRequest, primary: &str) -> BuildResult<()> {
        for tag in request.tags.iter().skip(1) {
            #[allow(deprecated)]
            let options = bollard::image::TagImageOptions {
                repo: tag.name.as_str(),
                tag: tag.tag.as_str(),
            };
            self.docker.tag_image(primary, Some(options)).await?;
            tracing::debug!(source = %primary, tag = %tag, "Tagged image");
        }

        for tag in request.tags.to_strings() {
            if !self.image_exists(&tag).await? {
                return Err(BuildError::BuildFailed(format!(
                    "ビルド後のイメージにタグ {} がありません",
                    tag
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ImageBackend for DockerApiBuilder {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn build(&self, request: &ImageBuildRequest) -> BuildResult<BuiltImage> {
        let primary = request.primary_tag()?;
        tracing::info!(
            image = %primary,
            platform = request.platform().map(Platform::as_str).unwrap_or("host"),
            "Building image"
        );

        let progress = BuildProgress::new(&primary);
        let result = match self.run_build(request, &primary, &progress).await {
            Ok(()) => self.apply_tags(request, &primary).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            progress.finish_error(&e.to_string());
            return Err(e);
        }

        progress.finish_success(&primary);
        Ok(BuiltImage {
            tags: request.tags.to_strings(),
            platform: request.platform().cloned(),
        })
    }
}

/// docker buildx CLI でビルドする（プラットフォーム指定時）
pub struct BuildxBuilder {
    program: String,
}

impl Default for BuildxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildxBuilder {
    pub fn new() -> Self {
        Self::with_program("docker")
    }

    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `docker` に渡す引数
    pub fn buildx_args(request: &ImageBuildRequest) -> Vec<String> {
        let mut args = vec!["buildx".to_string(), "build".to_string()];

        if let Some(platform) = request.platform() {
            args.push("--platform".to_string());
            args.push(platform.to_string());
        }

        for tag in request.tags.iter() {
            args.push("-t".to_string());
            args.push(tag.to_string());
        }

        args.push("-f".to_string());
        args.push(request.dockerfile.display().to_string());

        for (key, value) in &request.build_args {
            args.push("--build-arg".to_string());
            args.push(format!("{}={}", key, value));
        }

        if request.no_cache {
            args.push("--no-cache".to_string());
        }

        if request.pull {
            args.push("--pull".to_string());
        }

        // ローカルのイメージストアに読み込む
        args.push("--load".to_string());
        args.push(request.context.directory.display().to_string());
        args
    }
}

#[async_trait]
impl ImageBackend for BuildxBuilder {
    fn name(&self) -> &'static str {
        "buildx"
    }

    async fn build(&self, request: &ImageBuildRequest) -> BuildResult<BuiltImage> {
        let primary = request.primary_tag()?;
        let args = Self::buildx_args(request);
        tracing::info!(program = %self.program, args = ?args, "Running docker buildx");

        let progress = BuildProgress::new(&primary);
        let output = tokio::process::Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| {
                progress.finish_error(&e.to_string());
                BuildError::BuildxFailed(format!("{} の実行に失敗しました: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            progress.finish_error(&primary);
            return Err(BuildError::BuildxFailed(stderr));
        }

        progress.finish_success(&primary);
        Ok(BuiltImage {
            tags: request.tags.to_strings(),
            platform: request.platform().cloned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn request(dir: &std::path::Path, platform: Option<&str>) -> ImageBuildRequest {
        let mut build_args = BTreeMap::new();
        build_args.insert("JAR".to_string(), "build/libs/control-plane.jar".to_string());
        ImageBuildRequest {
            dockerfile: dir.join("src/main/docker/Dockerfile"),
            context: BuildContext::new(
                dir.to_path_buf(),
                platform.map(|p| p.parse().unwrap()),
            ),
            build_args,
            tags: ImageTagSet::for_project("control-plane", "1.2.3", &[]).unwrap(),
            no_cache: false,
            pull: false,
        }
    }

    #[test]
    fn test_buildx_args_with_platform() {
        let req = request(std::path::Path::new("/work"), Some("linux/arm64"));
        let args = BuildxBuilder::buildx_args(&req);

        assert_eq!(
            args,
            vec![
                "buildx",
                "build",
                "--platform",
                "linux/arm64",
                "-t",
                "control-plane:1.2.3",
                "-t",
                "control-plane:latest",
                "-f",
                "/work/src/main/docker/Dockerfile",
                "--build-arg",
                "JAR=build/libs/control-plane.jar",
                "--load",
                "/work",
            ]
        );
    }

    #[test]
    fn test_buildx_args_without_platform() {
        let mut req = request(std::path::Path::new("/work"), None);
        req.no_cache = true;
        let args = BuildxBuilder::buildx_args(&req);

        assert!(!args.contains(&"--platform".to_string()));
        assert!(args.contains(&"--no-cache".to_string()));
    }

    #[test]
    fn test_buildx_args_pull() {
        let mut req = request(std::path::Path::new("/work"), None);
        assert!(!BuildxBuilder::buildx_args(&req).contains(&"--pull".to_string()));

        req.pull = true;
        assert!(BuildxBuilder::buildx_args(&req).contains(&"--pull".to_string()));
    }

    #[test]
    fn test_build_options_use_cached_base_image_by_default() {
        let mut req = request(std::path::Path::new("/work"), Some("linux/arm64"));
        let options = DockerApiBuilder::build_options(&req, "Dockerfile", "control-plane:1.2.3");

        assert!(!options.pull);
        assert!(!options.nocache);
        assert_eq!(options.platform, "linux/arm64");
        assert_eq!(options.t, "control-plane:1.2.3");
        assert_eq!(options.buildargs["JAR"], "build/libs/control-plane.jar");

        req.pull = true;
        let options = DockerApiBuilder::build_options(&req, "Dockerfile", "control-plane:1.2.3");
        assert!(options.pull);
    }

    /// 接続は最初のリクエストまで行われないので、存在しないソケットでも作れる
    #[cfg(unix)]
    fn unreachable_docker(dir: &std::path::Path) -> Docker {
        let socket = dir.join("docker.sock");
        Docker::connect_with_unix(socket.to_str().unwrap(), 5, bollard::API_DEFAULT_VERSION)
            .unwrap()
    }

    /// デーモンに届かない場合は「イメージなし」ではなく接続エラー
    #[cfg(unix)]
    #[tokio::test]
    async fn test_image_exists_without_daemon() {
        let dir = tempdir().unwrap();
        let builder = DockerApiBuilder::new(unreachable_docker(dir.path()));

        let result = builder.image_exists("control-plane:latest").await;
        assert!(matches!(result, Err(BuildError::DockerConnection(_))));
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "current_thread")]
    async fn test_prepare_context_and_credentials() {
        use base64::Engine;

        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/main/docker")).unwrap();
        fs::create_dir_all(dir.path().join("build/libs")).unwrap();
        fs::write(dir.path().join("build/libs/control-plane.jar"), "jar").unwrap();
        fs::write(
            dir.path().join("src/main/docker/Dockerfile"),
            "FROM ghcr.io/acme/jre:17\nARG JAR\nCOPY ${JAR} /app/app.jar\n",
        )
        .unwrap();

        let config = dir.path().join("config.json");
        let auth = base64::engine::general_purpose::STANDARD.encode("bot:s3cret");
        fs::write(
            &config,
            format!(r#"{{"auths": {{"ghcr.io": {{"auth": "{}"}}}}}}"#, auth),
        )
        .unwrap();

        let builder = DockerApiBuilder::with_auth(
            unreachable_docker(dir.path()),
            RegistryAuth::with_config_path(config),
        );
        let req = request(dir.path(), None);
        let (context, credentials) = builder.prepare(&req).await.unwrap();

        assert_eq!(context.dockerfile, "src/main/docker/Dockerfile");
        assert!(context.files >= 2);
        assert_eq!(credentials["ghcr.io"].username.as_deref(), Some("bot"));
    }

    #[tokio::test]
    async fn test_buildx_failure_is_reported() {
        let req = request(std::path::Path::new("/work"), Some("linux/amd64"));
        let builder = BuildxBuilder::with_program("false");

        let result = builder.build(&req).await;
        assert!(matches!(result, Err(BuildError::BuildxFailed(_))));
    }

    #[tokio::test]
    async fn test_buildx_missing_program() {
        let req = request(std::path::Path::new("/work"), Some("linux/amd64"));
        let builder = BuildxBuilder::with_program("jarflow-no-such-program");

        let result = builder.build(&req).await;
        assert!(matches!(result, Err(BuildError::BuildxFailed(_))));
    }

    #[tokio::test]
    #[ignore] // Docker接続が必要なため、通常のテストではスキップ
    async fn test_build_simple_image() {
        let docker = Docker::connect_with_local_defaults().unwrap();
        let builder = DockerApiBuilder::new(docker);

        let temp_dir = tempdir().unwrap();
        fs::create_dir_all(temp_dir.path().join("src/main/docker")).unwrap();
        fs::create_dir_all(temp_dir.path().join("build/libs")).unwrap();
        fs::write(temp_dir.path().join("build/libs/control-plane.jar"), "jar").unwrap();
        fs::write(
            temp_dir.path().join("src/main/docker/Dockerfile"),
            "FROM alpine:latest\nARG JAR\nCOPY ${JAR} /app/app.jar\n",
        )
        .unwrap();

        let req = request(temp_dir.path(), None);
        let built = builder.build(&req).await.unwrap();
        assert_eq!(built.tags, vec!["control-plane:1.2.3", "control-plane:latest"]);

        assert!(builder.image_exists("control-plane:latest").await.unwrap());

        // クリーンアップ
        for tag in &built.tags {
            #[allow(deprecated)]
            builder
                .docker
                .remove_image(tag, None::<bollard::query_parameters::RemoveImageOptions>, None)
                .await
                .ok();
        }
    }
}
