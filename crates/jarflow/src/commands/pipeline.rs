use crate::docker;
use crate::utils;
use colored::Colorize;
use jarflow_archive::RepositoryResolver;
use jarflow_build::ImageBackend;
use jarflow_core::graph::DOCKERIZE;
use jarflow_core::{LoadedProject, Platform};
use jarflow_pipeline::{Pipeline, PipelineOptions, PipelineReport};

pub fn options(
    platform: Option<&str>,
    no_cache: bool,
    rerun: bool,
) -> anyhow::Result<PipelineOptions> {
    let platform = platform.map(str::parse::<Platform>).transpose()?;
    Ok(PipelineOptions {
        platform,
        no_cache,
        rerun,
    })
}

/// `targets` とその依存タスクを実行
pub async fn handle(
    loaded: &LoadedProject,
    targets: &[&str],
    options: PipelineOptions,
) -> anyhow::Result<()> {
    let project = &loaded.project;
    println!(
        "{} {} {}",
        "🔨".bold(),
        project.name.cyan().bold(),
        project.version.dimmed()
    );
    println!();

    let resolver = RepositoryResolver::for_project(project)?;
    let explicit_platform = options.platform.is_some() || project.docker.platform.is_some();
    let mut pipeline = Pipeline::new(loaded, &resolver)?
        .with_options(options)
        .with_observer(utils::print_trace_event);

    // イメージビルドを含む場合のみ Docker に接続
    let needs_image = pipeline
        .graph()
        .execution_plan_for(targets)?
        .iter()
        .any(|t| t.name == DOCKERIZE);
    let backend: Option<Box<dyn ImageBackend>> = if needs_image {
        Some(docker::select_backend(explicit_platform).await?)
    } else {
        None
    };
    if let Some(backend) = &backend {
        pipeline = pipeline.with_image_backend(backend.as_ref());
    }

    match pipeline.run(targets).await {
        Ok(report) => {
            print_summary(&report);
            Ok(())
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ ビルドに失敗しました".red().bold());
            eprintln!();
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("{}", "✓ 完了しました".green().bold());

    if !report.artifacts.is_empty() {
        println!("  依存: {}個", report.artifacts.len());
    }
    for path in &report.distributions {
        println!("  配布物: {}", path.display().to_string().cyan());
    }
    if let Some(archive) = &report.archive {
        println!("  アーカイブ: {}", archive.display().to_string().cyan());
    }
    if let Some(merge) = &report.merge
        && !merge.merged.is_empty()
    {
        println!("  マージしたエントリ:");
        for entry in &merge.merged {
            println!("    - {}", entry);
        }
    }
    if let Some(image) = &report.image {
        let platform = image
            .platform
            .as_ref()
            .map(Platform::as_str)
            .unwrap_or("host");
        println!("  イメージ ({}):", platform);
        for tag in &image.tags {
            println!("    - {}", tag.cyan());
        }
    }
}
