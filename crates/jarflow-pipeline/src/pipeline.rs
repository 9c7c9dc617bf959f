//! パイプラインの実行
//!
//! タスクは実行計画の順に 1 つずつ実行し、最初の失敗で残りを中止する。

use crate::error::{PipelineError, Result};
use crate::fingerprint::Fingerprint;
use crate::trace::{ExecutionTrace, TraceEvent};
use jarflow_archive::{
    ArchiveMerger, ArtifactResolver, DistributionBuilder, MergeReport, MergeSource,
    ResolvedArtifact, resolve_all,
};
use jarflow_build::{BuildResolver, BuiltImage, ImageBackend};
use jarflow_core::graph::{DIST_TAR, DIST_ZIP, DOCKERIZE, RESOLVE_DEPENDENCIES, SHADOW_JAR};
use jarflow_core::{Classpath, DistributionFormat, LoadedProject, Platform, TaskGraph};
use std::path::PathBuf;

/// 実行時の指定
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// プロジェクト設定より優先されるプラットフォーム
    pub platform: Option<Platform>,
    pub no_cache: bool,
    /// 最新判定を無視して shadow-jar を再実行
    pub rerun: bool,
}

/// 実行結果
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub trace: ExecutionTrace,
    pub classpath: Option<Classpath>,
    pub artifacts: Vec<ResolvedArtifact>,
    pub distributions: Vec<PathBuf>,
    pub archive: Option<PathBuf>,
    pub merge: Option<MergeReport>,
    pub image: Option<BuiltImage>,
}

type Observer = Box<dyn Fn(&TraceEvent) + Send + Sync>;

pub struct Pipeline<'a> {
    loaded: &'a LoadedProject,
    graph: TaskGraph,
    resolver: &'a dyn ArtifactResolver,
    backend: Option<&'a dyn ImageBackend>,
    options: PipelineOptions,
    observer: Option<Observer>,
}

/// 実行中に各タスクが次のタスクへ渡す状態
#[derive(Default)]
struct PipelineState {
    report: PipelineReport,
}

impl<'a> Pipeline<'a> {
    pub fn new(loaded: &'a LoadedProject, resolver: &'a dyn ArtifactResolver) -> Result<Self> {
        let graph = TaskGraph::for_project(&loaded.project)?;
        Ok(Self {
            loaded,
            graph,
            resolver,
            backend: None,
            options: PipelineOptions::default(),
            observer: None,
        })
    }

    pub fn with_image_backend(mut self, backend: &'a dyn ImageBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// タスクの状態遷移ごとに呼ばれるコールバック
    pub fn with_observer(mut self, observer: impl Fn(&TraceEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    fn record(&self, trace: &mut ExecutionTrace, event: TraceEvent) {
        if let Some(observer) = &self.observer {
            observer(&event);
        }
        trace.record(event);
    }

    /// `targets` とその依存を実行
    pub async fn run(&self, targets: &[&str]) -> Result<PipelineReport> {
        let plan: Vec<String> = self
            .graph
            .execution_plan_for(targets)?
            .into_iter()
            .map(|t| t.name.clone())
            .collect();
        tracing::info!(plan = ?plan, "Execution plan");

        let mut state = PipelineState::default();
        let mut trace = ExecutionTrace::default();

        for task in &plan {
            match self.execute(task, &mut state, &mut trace).await {
                Ok(()) => {}
                Err(e) => {
                    self.record(
                        &mut trace,
                        TraceEvent::Failed {
                            task: task.clone(),
                            message: e.to_string(),
                        },
                    );
                    tracing::error!(task = %task, error = %e, "Task failed, aborting pipeline");
                    return Err(PipelineError::TaskFailed {
                        task: task.clone(),
                        trace,
                        source: Box::new(e),
                    });
                }
            }
        }

        state.report.trace = trace;
        Ok(state.report)
    }

    async fn execute(
        &self,
        task: &str,
        state: &mut PipelineState,
        trace: &mut ExecutionTrace,
    ) -> Result<()> {
        let project = &self.loaded.project;

        match task {
            RESOLVE_DEPENDENCIES => {
                self.record(trace, TraceEvent::Started(task.to_string()));
                let classpath = self.loaded.classpath()?;
                state.report.artifacts = resolve_all(self.resolver, &classpath.runtime()).await?;
                state.report.classpath = Some(classpath);
            }
            DIST_TAR | DIST_ZIP => {
                let format = if task == DIST_TAR {
                    DistributionFormat::Tar
                } else {
                    DistributionFormat::Zip
                };
                self.record(trace, TraceEvent::Started(task.to_string()));
                let output =
                    DistributionBuilder::new(project).build(format, &state.report.artifacts)?;
                state.report.distributions.push(output);
            }
            SHADOW_JAR => {
                let sources = MergeSource::for_project(project, &state.report.artifacts);
                let fingerprint = Fingerprint::compute(project, &sources)?;
                let archive = project.archive_path();

                if !self.options.rerun && fingerprint.is_up_to_date(project) {
                    tracing::info!(archive = %archive.display(), "Archive is up to date");
                    state.report.archive = Some(archive);
                    self.record(trace, TraceEvent::UpToDate(task.to_string()));
                    return Ok(());
                }

                self.record(trace, TraceEvent::Started(task.to_string()));
                let report = ArchiveMerger::for_project(project)?.merge(&sources, &archive)?;
                fingerprint.save(project)?;
                state.report.merge = Some(report);
                state.report.archive = Some(archive);
            }
            DOCKERIZE => {
                // イメージビルドはアーカイブを入力として消費する
                let archive = project.archive_path();
                if !archive.is_file() {
                    return Err(PipelineError::ArchiveMissing(archive));
                }
                self.record(trace, TraceEvent::Started(task.to_string()));

                let backend = self.backend.ok_or(PipelineError::NoImageBackend)?;
                let request = BuildResolver::new(project).resolve(
                    &archive,
                    self.options.platform.clone(),
                    self.options.no_cache,
                )?;
                tracing::info!(backend = backend.name(), tags = ?request.tags.to_strings(), "Building image");
                state.report.image = Some(backend.build(&request).await?);
            }
            other => return Err(PipelineError::UnsupportedTask(other.to_string())),
        }

        self.record(trace, TraceEvent::Finished(task.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jarflow_core::Project;
    use std::path::Path;

    struct NoArtifacts;

    #[async_trait::async_trait]
    impl ArtifactResolver for NoArtifacts {
        async fn resolve(
            &self,
            coordinate: &jarflow_core::Coordinate,
        ) -> jarflow_archive::Result<PathBuf> {
            Err(jarflow_archive::ArchiveError::ResolutionFailed {
                coordinate: coordinate.to_string(),
                tried: String::new(),
            })
        }
    }

    fn loaded(root: &Path) -> LoadedProject {
        LoadedProject {
            project: Project::new("app", "1.0.0", root.to_path_buf()),
            catalog: None,
            source: root.join("jarflow.kdl"),
        }
    }

    #[tokio::test]
    async fn test_dockerize_without_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = loaded(dir.path());
        let pipeline = Pipeline::new(&loaded, &NoArtifacts).unwrap();

        let mut state = PipelineState::default();
        let mut trace = ExecutionTrace::default();
        let result = pipeline.execute(DOCKERIZE, &mut state, &mut trace).await;

        assert!(matches!(result, Err(PipelineError::ArchiveMissing(_))));
        assert!(state.report.image.is_none());
        // 入力が無いまま開始したことにはならない
        assert_eq!(
            trace.position(&TraceEvent::Started(DOCKERIZE.to_string())),
            None
        );
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = loaded(dir.path());
        let pipeline = Pipeline::new(&loaded, &NoArtifacts).unwrap();

        let result = pipeline.run(&["publish"]).await;
        assert!(matches!(
            result,
            Err(PipelineError::Project(jarflow_core::ProjectError::UnknownTask(_)))
        ));
    }

    #[tokio::test]
    async fn test_dockerize_without_backend() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = loaded(dir.path());
        std::fs::create_dir_all(loaded.project.libs_dir()).unwrap();
        std::fs::write(loaded.project.archive_path(), "jar").unwrap();
        let pipeline = Pipeline::new(&loaded, &NoArtifacts).unwrap();

        let mut state = PipelineState::default();
        let mut trace = ExecutionTrace::default();
        let result = pipeline.execute(DOCKERIZE, &mut state, &mut trace).await;

        assert!(matches!(result, Err(PipelineError::NoImageBackend)));
    }
}
