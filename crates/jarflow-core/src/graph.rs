//! タスクグラフ
//!
//! パイプラインの実行順序を名前付きタスクと依存エッジの DAG として表現します。
//! 順序は副作用ではなくグラフから導出されるため、実行前に検査・表示できます。

use crate::error::{ProjectError, Result};
use crate::model::Project;
use std::collections::HashSet;

pub const RESOLVE_DEPENDENCIES: &str = "resolve-dependencies";
pub const DIST_TAR: &str = "dist-tar";
pub const DIST_ZIP: &str = "dist-zip";
pub const SHADOW_JAR: &str = "shadow-jar";
pub const DOCKERIZE: &str = "dockerize";

/// グラフ上の1タスク
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub description: String,
    /// 先に完了している必要があるタスク（宣言順）
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    tasks: Vec<Task>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// プロジェクト設定から標準のパイプライングラフを構築
    ///
    /// ```text
    /// resolve-dependencies <- dist-tar, dist-zip
    /// resolve-dependencies, dist-* <- shadow-jar <- dockerize
    /// ```
    pub fn for_project(project: &Project) -> Result<Self> {
        let mut graph = Self::new();
        graph.add_task(RESOLVE_DEPENDENCIES, "依存座標をアーティファクトに解決")?;

        let mut dist_tasks = Vec::new();
        for format in &project.distribution.formats {
            let name = format.task_name();
            graph.add_task(
                name,
                &format!("{} 形式の配布物を作成", format.extension()),
            )?;
            graph.add_dependency(name, RESOLVE_DEPENDENCIES)?;
            dist_tasks.push(name.to_string());
        }

        graph.add_task(SHADOW_JAR, "実行可能なマージ済みアーカイブを作成")?;
        graph.add_dependency(SHADOW_JAR, RESOLVE_DEPENDENCIES)?;
        let shadow_deps = project
            .shadow
            .depends_on
            .clone()
            .unwrap_or_else(|| dist_tasks.clone());
        for dep in &shadow_deps {
            graph.add_dependency(SHADOW_JAR, dep)?;
        }

        graph.add_task(DOCKERIZE, "アーカイブからコンテナイメージをビルド")?;
        graph.add_dependency(DOCKERIZE, SHADOW_JAR)?;
        // 配布物は shadow-jar の依存設定に関わらずイメージビルドより先
        for dist in &dist_tasks {
            graph.add_dependency(DOCKERIZE, dist)?;
        }

        graph.validate()?;
        Ok(graph)
    }

    pub fn add_task(&mut self, name: &str, description: &str) -> Result<()> {
        if self.task(name).is_some() {
            return Err(ProjectError::InvalidConfig(format!(
                "タスク '{}' は既に定義されています",
                name
            )));
        }
        self.tasks.push(Task {
            name: name.to_string(),
            description: description.to_string(),
            depends_on: Vec::new(),
        });
        Ok(())
    }

    /// `task` が `dependency` の完了を待つエッジを追加
    pub fn add_dependency(&mut self, task: &str, dependency: &str) -> Result<()> {
        if self.task(dependency).is_none() {
            return Err(ProjectError::UnknownTask(dependency.to_string()));
        }
        let node = self
            .tasks
            .iter_mut()
            .find(|t| t.name == task)
            .ok_or_else(|| ProjectError::UnknownTask(task.to_string()))?;

        if !node.depends_on.iter().any(|d| d == dependency) {
            node.depends_on.push(dependency.to_string());
        }
        Ok(())
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// どのタスクからも依存されていないタスク
    pub fn terminal_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| {
                !self
                    .tasks
                    .iter()
                    .any(|other| other.depends_on.contains(&t.name))
            })
            .collect()
    }

    /// グラフ全体に循環がないことを確認
    pub fn validate(&self) -> Result<()> {
        let names: Vec<&str> = self.tasks.iter().map(|t| t.name.as_str()).collect();
        self.execution_plan_for(&names).map(|_| ())
    }

    /// `target` を実行するのに必要なタスクを実行順に返す
    pub fn execution_plan(&self, target: &str) -> Result<Vec<&Task>> {
        self.execution_plan_for(&[target])
    }

    /// 複数ターゲットの実行計画（重複なし、依存は常に先）
    pub fn execution_plan_for(&self, targets: &[&str]) -> Result<Vec<&Task>> {
        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut path = Vec::new();

        for target in targets {
            self.visit(target, &mut path, &mut done, &mut order)?;
        }

        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &str,
        path: &mut Vec<String>,
        done: &mut HashSet<String>,
        order: &mut Vec<&'a Task>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }

        if let Some(pos) = path.iter().position(|p| p == name) {
            let mut cycle: Vec<&str> = path[pos..].iter().map(|s| s.as_str()).collect();
            cycle.push(name);
            return Err(ProjectError::CircularDependency(cycle.join(" -> ")));
        }

        let task = self
            .task(name)
            .ok_or_else(|| ProjectError::UnknownTask(name.to_string()))?;

        path.push(name.to_string());
        for dep in &task.depends_on {
            self.visit(dep, path, done, order)?;
        }
        path.pop();

        done.insert(name.to_string());
        order.push(task);
        Ok(())
    }
}
