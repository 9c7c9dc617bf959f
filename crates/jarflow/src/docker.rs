use colored::Colorize;
use jarflow_build::{BuildxBuilder, DockerApiBuilder, ImageBackend};

fn print_connection_help(cause: &dyn std::fmt::Display) {
    eprintln!();
    eprintln!("{}", "✗ Docker接続エラー".red().bold());
    eprintln!();
    eprintln!("{}", "原因:".yellow());
    eprintln!("  {}", cause);
    eprintln!();
    eprintln!("{}", "解決方法:".yellow());
    eprintln!("  • Dockerが起動しているか確認してください");
    eprintln!("  • OrbStackまたはDocker Desktopがインストールされているか確認してください");
    eprintln!("  • docker ps コマンドが正常に動作するか確認してください");
}

/// Docker接続を初期化（エラーハンドリング付き）
pub async fn init_docker_with_error_handling() -> anyhow::Result<bollard::Docker> {
    let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
        print_connection_help(&e);
        anyhow::anyhow!("Docker接続に失敗しました")
    })?;

    // 接続テスト
    if let Err(e) = docker.ping().await {
        print_connection_help(&e);
        return Err(anyhow::anyhow!("Docker接続に失敗しました"));
    }
    Ok(docker)
}

/// イメージビルドのバックエンドを選択
///
/// プラットフォーム指定があれば docker buildx、無ければ Docker Engine API。
pub async fn select_backend(explicit_platform: bool) -> anyhow::Result<Box<dyn ImageBackend>> {
    if explicit_platform {
        tracing::debug!("Using docker buildx for explicit platform");
        return Ok(Box::new(BuildxBuilder::new()));
    }

    let docker = init_docker_with_error_handling().await?;
    Ok(Box::new(DockerApiBuilder::new(docker)))
}
