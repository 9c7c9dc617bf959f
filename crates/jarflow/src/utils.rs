use colored::Colorize;
use jarflow_core::LoadedProject;
use jarflow_pipeline::TraceEvent;

/// プロジェクトファイルを探索して読み込む
pub fn load_project() -> anyhow::Result<LoadedProject> {
    let path = jarflow_config::find_project_file()?;
    tracing::debug!(path = %path.display(), "Found project file");
    Ok(jarflow_core::load_project(&path)?)
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_config_files(loaded: &LoadedProject) {
    println!("📄 読み込んだ設定ファイル:");
    println!("  • {}", loaded.source.display().to_string().cyan());
    if let Some(source) = loaded.catalog.as_ref().and_then(|c| c.source()) {
        println!(
            "  • {} (バージョンカタログ)",
            source.display().to_string().cyan()
        );
    }
}

/// タスクの状態遷移を 1 行で表示
pub fn print_trace_event(event: &TraceEvent) {
    match event {
        TraceEvent::Started(task) => {
            println!("{} {}", "→".blue(), task.bold());
        }
        TraceEvent::Finished(task) => {
            println!("  {} {}", "✓".green(), task);
        }
        TraceEvent::UpToDate(task) => {
            println!("  {} {} {}", "✓".green(), task, "(最新)".dimmed());
        }
        TraceEvent::Failed { task, .. } => {
            println!("  {} {}", "✗".red(), task.red());
        }
    }
}
