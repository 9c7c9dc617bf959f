mod commands;
mod docker;
mod utils;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "jarflow")]
#[command(about = "JVM アプリケーションを依存解決からコンテナイメージまで一気通貫でビルド", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 依存解決・アーカイブ作成・イメージビルドまでを実行
    Build {
        /// ターゲットプラットフォーム（例: linux/arm64）。省略時はプロジェクト設定、次にホストの既定
        #[arg(long, env = "JARFLOW_PLATFORM")]
        platform: Option<String>,
        /// キャッシュを使用しない
        #[arg(long)]
        no_cache: bool,
        /// 入力が変わっていなくてもアーカイブを作り直す
        #[arg(long)]
        rerun: bool,
    },
    /// マージ済みアーカイブ（shadow-jar）までを実行
    Jar {
        /// 入力が変わっていなくてもアーカイブを作り直す
        #[arg(long)]
        rerun: bool,
    },
    /// 配布物（tar / zip）を作成
    Dist,
    /// 指定したタスクとその依存を実行
    Run {
        /// タスク名（例: shadow-jar dockerize）
        #[arg(required = true)]
        tasks: Vec<String>,
        /// ターゲットプラットフォーム（dockerize のみ）
        #[arg(long, env = "JARFLOW_PLATFORM")]
        platform: Option<String>,
        /// キャッシュを使用しない
        #[arg(long)]
        no_cache: bool,
        /// 入力が変わっていなくてもアーカイブを作り直す
        #[arg(long)]
        rerun: bool,
    },
    /// タスクグラフと実行計画を表示
    Tasks {
        /// 実行計画を表示するタスク（省略時は全タスク）
        target: Option<String>,
    },
    /// 解決済みのクラスパスを表示
    Classpath {
        #[arg(long, value_enum, default_value = "runtime")]
        scope: ClasspathScope,
    },
    /// 設定を検証
    Validate,
    /// バージョン情報を表示
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum ClasspathScope {
    Compile,
    Runtime,
}

fn init_tracing() {
    // 進捗表示は stdout、ログは stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("jarflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let loaded = utils::load_project()?;

    match cli.command {
        Commands::Build {
            platform,
            no_cache,
            rerun,
        } => {
            let options = commands::pipeline::options(platform.as_deref(), no_cache, rerun)?;
            commands::pipeline::handle(&loaded, &[jarflow_core::graph::DOCKERIZE], options)
                .await?;
        }
        Commands::Jar { rerun } => {
            let options = commands::pipeline::options(None, false, rerun)?;
            commands::pipeline::handle(&loaded, &[jarflow_core::graph::SHADOW_JAR], options)
                .await?;
        }
        Commands::Dist => {
            let targets: Vec<&str> = loaded
                .project
                .distribution
                .formats
                .iter()
                .map(|f| f.task_name())
                .collect();
            let options = commands::pipeline::options(None, false, false)?;
            commands::pipeline::handle(&loaded, &targets, options).await?;
        }
        Commands::Run {
            tasks,
            platform,
            no_cache,
            rerun,
        } => {
            let targets: Vec<&str> = tasks.iter().map(String::as_str).collect();
            let options = commands::pipeline::options(platform.as_deref(), no_cache, rerun)?;
            commands::pipeline::handle(&loaded, &targets, options).await?;
        }
        Commands::Tasks { target } => {
            commands::tasks::handle(&loaded, target.as_deref())?;
        }
        Commands::Classpath { scope } => {
            commands::classpath::handle(&loaded, matches!(scope, ClasspathScope::Compile))?;
        }
        Commands::Validate => {
            commands::validate::handle(&loaded)?;
        }
        Commands::Version => {
            unreachable!("Version is handled before project loading");
        }
    }

    Ok(())
}
