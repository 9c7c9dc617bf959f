//! fat jar のマージ
//!
//! プロジェクトの出力ディレクトリとランタイム依存の jar を 1 つのアーカイブにまとめる。
//! マージ対象のエントリ（既定: `META-INF/services/**`）は行の和集合を取り、
//! それ以外のエントリは後から現れたソースが優先される。

use crate::error::{ArchiveError, Result};
use crate::manifest::{MANIFEST_PATH, Manifest};
use crate::resolver::ResolvedArtifact;
use glob::Pattern;
use jarflow_core::{Project, ShadowConfig};
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const SERVICE_FILES_PATTERN: &str = "META-INF/services/**";

/// 署名ファイルの拡張子（マージ後は署名が無効になるため除外）
const SIGNATURE_EXTENSIONS: [&str; 4] = ["SF", "DSA", "RSA", "EC"];

/// マージの入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeSource {
    /// クラス・リソースを含むディレクトリ
    Directory(PathBuf),
    /// jar ファイル
    Jar(PathBuf),
}

impl MergeSource {
    pub fn path(&self) -> &Path {
        match self {
            MergeSource::Directory(path) | MergeSource::Jar(path) => path,
        }
    }

    /// プロジェクト出力 → ランタイム依存 の順に並べた入力
    pub fn for_project(project: &Project, artifacts: &[ResolvedArtifact]) -> Vec<MergeSource> {
        project
            .output_dirs()
            .into_iter()
            .map(MergeSource::Directory)
            .chain(
                artifacts
                    .iter()
                    .filter(|a| a.dependency.scope.on_runtime_classpath())
                    .map(|a| MergeSource::Jar(a.path.clone())),
            )
            .collect()
    }
}

/// エントリごとのマージ・除外ルール
#[derive(Debug, Clone, Default)]
pub struct MergeRules {
    merge: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl MergeRules {
    pub fn new(merge: &[String], exclude: &[String]) -> Result<Self> {
        Ok(Self {
            merge: compile_patterns(merge)?,
            exclude: compile_patterns(exclude)?,
        })
    }

    pub fn from_config(shadow: &ShadowConfig) -> Result<Self> {
        let mut merge = Vec::with_capacity(shadow.merge.len() + 1);
        if shadow.merge_service_files {
            merge.push(SERVICE_FILES_PATTERN.to_string());
        }
        merge.extend(shadow.merge.iter().cloned());
        Self::new(&merge, &shadow.exclude)
    }

    pub fn is_merged(&self, path: &str) -> bool {
        self.merge.iter().any(|p| p.matches(path))
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        is_manifest(path) || is_signature_file(path) || self.exclude.iter().any(|p| p.matches(path))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ArchiveError::InvalidPattern {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn is_manifest(path: &str) -> bool {
    path.eq_ignore_ascii_case(MANIFEST_PATH)
}

fn is_signature_file(path: &str) -> bool {
    let Some(name) = path.strip_prefix("META-INF/") else {
        return false;
    };
    if name.contains('/') {
        return false;
    }
    name.rsplit_once('.').is_some_and(|(_, ext)| {
        SIGNATURE_EXTENSIONS
            .iter()
            .any(|sig| ext.eq_ignore_ascii_case(sig))
    })
}

/// マージ結果の要約
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// 出力されたエントリ数（マニフェストを含む）
    pub entries: usize,
    /// 複数のソースから行をマージしたエントリ
    pub merged: Vec<String>,
    /// 後のソースで上書きされたエントリ
    pub overwritten: Vec<String>,
    /// 除外されたエントリ数
    pub excluded: usize,
    /// 入力ソース数
    pub sources: usize,
}

#[derive(Debug)]
enum EntryContent {
    Plain(Vec<u8>),
    Lines {
        lines: Vec<String>,
        seen: HashSet<String>,
        contributors: usize,
    },
}

/// エントリパスの初出順を保ったエントリ集合
#[derive(Debug, Default)]
struct EntrySet {
    order: Vec<String>,
    contents: HashMap<String, EntryContent>,
    overwritten: Vec<String>,
    excluded: usize,
}

impl EntrySet {
    fn add(&mut self, rules: &MergeRules, path: String, data: Vec<u8>) {
        if rules.is_excluded(&path) {
            tracing::trace!(entry = %path, "Excluded entry");
            self.excluded += 1;
            return;
        }

        if rules.is_merged(&path) {
            let text = String::from_utf8_lossy(&data);
            if !self.contents.contains_key(&path) {
                self.order.push(path.clone());
            }
            let entry = self
                .contents
                .entry(path)
                .or_insert_with(|| EntryContent::Lines {
                    lines: Vec::new(),
                    seen: HashSet::new(),
                    contributors: 0,
                });
            if let EntryContent::Lines {
                lines,
                seen,
                contributors,
            } = entry
            {
                *contributors += 1;
                for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    if seen.insert(line.to_string()) {
                        lines.push(line.to_string());
                    }
                }
            }
            return;
        }

        match self.contents.get_mut(&path) {
            Some(existing) => {
                *existing = EntryContent::Plain(data);
                if !self.overwritten.contains(&path) {
                    self.overwritten.push(path);
                }
            }
            None => {
                self.order.push(path.clone());
                self.contents.insert(path, EntryContent::Plain(data));
            }
        }
    }
}

/// 複数のソースを 1 つの jar にまとめる
#[derive(Debug, Clone)]
pub struct ArchiveMerger {
    rules: MergeRules,
    manifest: Manifest,
}

impl ArchiveMerger {
    pub fn new(rules: MergeRules, manifest: Manifest) -> Self {
        Self { rules, manifest }
    }

    pub fn for_project(project: &Project) -> Result<Self> {
        Ok(Self::new(
            MergeRules::from_config(&project.shadow)?,
            Manifest::for_application(project.application.main_class.as_deref()),
        ))
    }

    /// マージして `output` に書き出す
    ///
    /// 同じディレクトリの一時ファイルに書いてからリネームするため、
    /// 失敗しても中途半端なアーカイブは残らない。
    pub fn merge(&self, sources: &[MergeSource], output: &Path) -> Result<MergeReport> {
        let dir = output
            .parent()
            .ok_or_else(|| ArchiveError::InvalidConfig(format!("無効な出力先: {}", output.display())))?;
        fs::create_dir_all(dir)?;

        let temp = tempfile::NamedTempFile::new_in(dir)?;
        let report = self.merge_to_writer(sources, temp.as_file())?;
        persist_output(temp, output)?;

        tracing::info!(
            archive = %output.display(),
            entries = report.entries,
            merged = report.merged.len(),
            "Archive written"
        );
        Ok(report)
    }

    /// マージして任意の writer に書き出す
    pub fn merge_to_writer<W: Write + Seek>(
        &self,
        sources: &[MergeSource],
        writer: W,
    ) -> Result<MergeReport> {
        let mut entries = EntrySet::default();
        let mut source_count = 0;

        for source in sources {
            match source {
                MergeSource::Directory(dir) => {
                    if !dir.is_dir() {
                        tracing::warn!(dir = %dir.display(), "Output directory does not exist, skipping");
                        continue;
                    }
                    read_directory(dir, &self.rules, &mut entries)?;
                }
                MergeSource::Jar(jar) => {
                    if !jar.is_file() {
                        return Err(ArchiveError::SourceNotFound(jar.clone()));
                    }
                    read_jar(jar, &self.rules, &mut entries)?;
                }
            }
            source_count += 1;
        }

        let mut zip = ZipWriter::new(writer);
        let options = entry_options();

        zip.start_file(MANIFEST_PATH, options)?;
        zip.write_all(self.manifest.render().as_bytes())?;

        let mut report = MergeReport {
            entries: 1,
            sources: source_count,
            excluded: entries.excluded,
            overwritten: entries.overwritten,
            ..Default::default()
        };

        for path in &entries.order {
            let Some(content) = entries.contents.get(path) else {
                continue;
            };
            zip.start_file(path.as_str(), options)?;
            match content {
                EntryContent::Plain(data) => zip.write_all(data)?,
                EntryContent::Lines {
                    lines,
                    contributors,
                    ..
                } => {
                    for line in lines {
                        zip.write_all(line.as_bytes())?;
                        zip.write_all(b"\n")?;
                    }
                    if *contributors > 1 {
                        report.merged.push(path.clone());
                    }
                }
            }
            report.entries += 1;
        }

        zip.finish()?;
        Ok(report)
    }
}

/// 再現性のためタイムスタンプは固定
/// 一時ファイルを `output` にリネームする
///
/// 一時ファイルは 0600 で作られるため、コンテナ内の非 root ユーザーからも
/// 読めるよう 0644 にしてから置き換える。
pub(crate) fn persist_output(temp: tempfile::NamedTempFile, output: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    temp.persist(output).map_err(|e| ArchiveError::Io(e.error))?;
    Ok(())
}

pub(crate) fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
}

fn read_directory(dir: &Path, rules: &MergeRules, entries: &mut EntrySet) -> Result<()> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    for file in files {
        let relative = file
            .strip_prefix(dir)
            .map_err(|e| ArchiveError::InvalidConfig(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let data = fs::read(&file)?;
        entries.add(rules, name, data);
    }
    Ok(())
}

pub(crate) fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

fn read_jar(jar: &Path, rules: &MergeRules, entries: &mut EntrySet) -> Result<()> {
    let jar_error = |e: zip::result::ZipError| ArchiveError::Jar {
        path: jar.to_path_buf(),
        message: e.to_string(),
    };

    let mut archive = ZipArchive::new(File::open(jar)?).map_err(jar_error)?;
    tracing::debug!(jar = %jar.display(), entries = archive.len(), "Reading jar");

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(jar_error)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.add(rules, name, data);
    }
    Ok(())
}
