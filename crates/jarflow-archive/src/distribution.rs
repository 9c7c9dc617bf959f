//! 配布物 (tar / zip) の作成
//!
//! `<name>-<version>/lib/` にプロジェクトの thin jar とランタイム依存、
//! `<name>-<version>/bin/` に起動スクリプトを配置する。

use crate::error::{ArchiveError, Result};
use crate::manifest::Manifest;
use crate::merger::{ArchiveMerger, MergeRules, MergeSource, entry_options, persist_output};
use crate::resolver::ResolvedArtifact;
use crate::scripts::StartScripts;
use jarflow_core::{DistributionFormat, Project};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;

#[derive(Debug)]
enum EntryData {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[derive(Debug)]
struct DistEntry {
    path: String,
    data: EntryData,
    mode: u32,
}

/// 配布物のレイアウト（全形式で共通）
#[derive(Debug, Default)]
struct Layout {
    entries: Vec<DistEntry>,
}

impl Layout {
    fn push_bytes(&mut self, path: String, bytes: Vec<u8>, mode: u32) {
        self.entries.push(DistEntry {
            path,
            data: EntryData::Bytes(bytes),
            mode,
        });
    }

    fn push_file(&mut self, path: String, file: PathBuf) {
        self.entries.push(DistEntry {
            path,
            data: EntryData::File(file),
            mode: 0o644,
        });
    }
}

pub struct DistributionBuilder<'a> {
    project: &'a Project,
}

impl<'a> DistributionBuilder<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// 指定形式の配布物を作成し、出力先を返す
    pub fn build(&self, format: DistributionFormat, artifacts: &[ResolvedArtifact]) -> Result<PathBuf> {
        let layout = self.layout(artifacts)?;
        let output = self.project.distribution_path(format);
        let dir = output
            .parent()
            .ok_or_else(|| ArchiveError::InvalidConfig(format!("無効な出力先: {}", output.display())))?;
        fs::create_dir_all(dir)?;

        let temp = tempfile::NamedTempFile::new_in(dir)?;
        match format {
            DistributionFormat::Tar => write_tar(&layout, temp.as_file())?,
            DistributionFormat::Zip => write_zip(&layout, temp.as_file())?,
        }
        persist_output(temp, &output)?;

        tracing::info!(
            distribution = %output.display(),
            entries = layout.entries.len(),
            "Distribution written"
        );
        Ok(output)
    }

    fn layout(&self, artifacts: &[ResolvedArtifact]) -> Result<Layout> {
        let base = self.project.distribution_base_name();
        let mut layout = Layout::default();
        let mut lib_names = Vec::new();
        let mut seen = HashSet::new();

        if let Some(thin_jar) = self.thin_jar()? {
            let name = format!("{}.jar", base);
            seen.insert(name.clone());
            layout.push_bytes(format!("{}/lib/{}", base, name), thin_jar, 0o644);
            lib_names.push(name);
        }

        let runtime = unique_runtime_artifacts(artifacts);
        let mut name_counts: HashMap<String, usize> = HashMap::new();
        for name in seen.iter().cloned().chain(
            runtime
                .iter()
                .map(|a| a.dependency.coordinate.jar_file_name()),
        ) {
            *name_counts.entry(name).or_default() += 1;
        }

        for artifact in runtime {
            let coordinate = &artifact.dependency.coordinate;
            let plain = coordinate.jar_file_name();
            // 同名の jar はグループ名で区別する
            let name = if name_counts.get(&plain).copied().unwrap_or(0) > 1 {
                format!("{}-{}", coordinate.group, plain)
            } else {
                plain
            };
            if !seen.insert(name.clone()) {
                return Err(ArchiveError::InvalidConfig(format!(
                    "配布物の lib/{} が重複しています: {}",
                    name, coordinate
                )));
            }
            if !artifact.path.is_file() {
                return Err(ArchiveError::SourceNotFound(artifact.path.clone()));
            }
            layout.push_file(format!("{}/lib/{}", base, name), artifact.path.clone());
            lib_names.push(name);
        }

        match &self.project.application.main_class {
            Some(main_class) => {
                let scripts = StartScripts::render(&self.project.name, main_class, &lib_names)?;
                layout.push_bytes(
                    format!("{}/bin/{}", base, self.project.name),
                    scripts.unix.into_bytes(),
                    0o755,
                );
                layout.push_bytes(
                    format!("{}/bin/{}.bat", base, self.project.name),
                    scripts.windows.into_bytes(),
                    0o644,
                );
            }
            None => {
                tracing::warn!(
                    project = %self.project.name,
                    "application main-class is not set, start scripts are omitted"
                );
            }
        }

        Ok(layout)
    }

    /// プロジェクト出力だけを含む jar（出力ディレクトリが無ければ None）
    fn thin_jar(&self) -> Result<Option<Vec<u8>>> {
        let sources: Vec<MergeSource> = self
            .project
            .output_dirs()
            .into_iter()
            .filter(|dir| dir.is_dir())
            .map(MergeSource::Directory)
            .collect();
        if sources.is_empty() {
            return Ok(None);
        }

        let merger = ArchiveMerger::new(
            MergeRules::new(&[], &self.project.shadow.exclude)?,
            Manifest::for_application(self.project.application.main_class.as_deref()),
        );
        let mut buffer = Cursor::new(Vec::new());
        merger.merge_to_writer(&sources, &mut buffer)?;
        Ok(Some(buffer.into_inner()))
    }
}

/// ランタイムクラスパス上の依存（同じ座標の重複は除く）
fn unique_runtime_artifacts(artifacts: &[ResolvedArtifact]) -> Vec<&ResolvedArtifact> {
    let mut coordinates = HashSet::new();
    artifacts
        .iter()
        .filter(|a| a.dependency.scope.on_runtime_classpath())
        .filter(|a| coordinates.insert(a.dependency.coordinate.to_string()))
        .collect()
}

fn write_tar(layout: &Layout, file: &File) -> Result<()> {
    let mut tar = tar::Builder::new(file);

    for entry in &layout.entries {
        let bytes = match &entry.data {
            EntryData::Bytes(bytes) => bytes.clone(),
            EntryData::File(path) => fs::read(path)?,
        };
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(entry.mode);
        header.set_mtime(0);
        tar.append_data(&mut header, &entry.path, bytes.as_slice())?;
    }

    tar.finish()?;
    Ok(())
}

fn write_zip(layout: &Layout, file: &File) -> Result<()> {
    let mut zip = ZipWriter::new(file);

    for entry in &layout.entries {
        zip.start_file(entry.path.as_str(), entry_options().unix_permissions(entry.mode))?;
        match &entry.data {
            EntryData::Bytes(bytes) => zip.write_all(bytes)?,
            EntryData::File(path) => {
                let mut source = File::open(path)?;
                std::io::copy(&mut source, &mut zip)?;
            }
        }
    }

    zip.finish()?;
    Ok(())
}

/// 配布物に含まれるエントリ名（確認・表示用）
pub fn list_entries(path: &Path) -> Result<Vec<String>> {
    let is_zip = path.extension().is_some_and(|ext| ext == "zip");
    if is_zip {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            names.push(archive.by_index(index)?.name().to_string());
        }
        Ok(names)
    } else {
        let mut archive = tar::Archive::new(File::open(path)?);
        let mut names = Vec::new();
        for entry in archive.entries()? {
            names.push(entry?.path()?.to_string_lossy().into_owned());
        }
        Ok(names)
    }
}
