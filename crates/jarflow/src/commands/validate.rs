use crate::utils;
use colored::Colorize;
use jarflow_core::{LoadedProject, TaskGraph};

pub fn handle(loaded: &LoadedProject) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());
    utils::print_loaded_config_files(loaded);
    println!();

    let project = &loaded.project;
    let result = loaded
        .classpath()
        .and_then(|cp| TaskGraph::for_project(project).map(|graph| (cp, graph)));

    let (classpath, graph) = match result {
        Ok(ok) => ok,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 設定エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  プロジェクト: {} {}", project.name.cyan(), project.version);
    if let Some(catalog) = &loaded.catalog {
        println!("  カタログ: {}個のライブラリ", catalog.len());
    }
    println!("  依存: {}個", classpath.entries().len());
    for dependency in classpath.entries() {
        println!(
            "    - {} ({})",
            dependency.coordinate.to_string().cyan(),
            dependency.scope.as_str()
        );
    }
    println!(
        "  メインクラス: {}",
        project
            .application
            .main_class
            .as_deref()
            .unwrap_or("(未設定)")
    );
    println!("  アーカイブ: {}", project.archive_path().display());
    println!("  イメージ:");
    for tag in project.image_tags()?.iter() {
        println!("    - {}", tag.to_string().cyan());
    }
    if let Some(platform) = &project.docker.platform {
        println!("  プラットフォーム: {}", platform);
    }
    println!("  タスク: {}個", graph.tasks().count());

    Ok(())
}
