use colored::Colorize;
use jarflow_core::{LoadedProject, TaskGraph};

pub fn handle(loaded: &LoadedProject, target: Option<&str>) -> anyhow::Result<()> {
    let graph = TaskGraph::for_project(&loaded.project)?;

    println!("{}", "タスク:".bold());
    for task in graph.tasks() {
        if task.depends_on.is_empty() {
            println!("  {} - {}", task.name.cyan(), task.description);
        } else {
            println!(
                "  {} - {} {}",
                task.name.cyan(),
                task.description,
                format!("(依存: {})", task.depends_on.join(", ")).dimmed()
            );
        }
    }

    let targets: Vec<&str> = match target {
        Some(t) => vec![t],
        None => graph.terminal_tasks().iter().map(|t| t.name.as_str()).collect(),
    };
    let plan = graph.execution_plan_for(&targets)?;

    println!();
    println!("{} {}", "実行計画:".bold(), targets.join(", ").cyan());
    for (i, task) in plan.iter().enumerate() {
        println!("  {}. {}", i + 1, task.name);
    }

    Ok(())
}
