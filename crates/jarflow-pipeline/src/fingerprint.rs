//! shadow-jar の入力フィンガープリント
//!
//! 設定と入力ファイル（パス・サイズ・更新時刻）の SHA-256。
//! 保存時にはできあがったアーカイブのサイズと更新時刻も記録し、
//! 入力とアーカイブの両方が前回と一致すれば shadow-jar は最新とみなす。

use crate::error::Result;
use jarflow_archive::MergeSource;
use jarflow_core::Project;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn compute(project: &Project, sources: &[MergeSource]) -> Result<Self> {
        let mut hasher = Sha256::new();

        hasher.update(format!("jarflow {}\n", env!("CARGO_PKG_VERSION")));
        hasher.update(format!("archive {}\n", project.archive_name()));
        hasher.update(format!(
            "main-class {}\n",
            project.application.main_class.as_deref().unwrap_or("")
        ));
        hasher.update(format!(
            "merge-service-files {}\n",
            project.shadow.merge_service_files
        ));
        for pattern in &project.shadow.merge {
            hasher.update(format!("merge {}\n", pattern));
        }
        for pattern in &project.shadow.exclude {
            hasher.update(format!("exclude {}\n", pattern));
        }

        for source in sources {
            match source {
                MergeSource::Directory(dir) => {
                    hasher.update(format!("dir {}\n", dir.display()));
                    if dir.is_dir() {
                        let mut files = Vec::new();
                        collect_files(dir, &mut files)?;
                        files.sort();
                        for file in files {
                            hash_file_metadata(&mut hasher, &file)?;
                        }
                    }
                }
                MergeSource::Jar(jar) => {
                    hasher.update("jar ");
                    hash_file_metadata(&mut hasher, jar)?;
                }
            }
        }

        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 保存先（build/tmp/jarflow/shadow-jar.sha256）
    pub fn path_for(project: &Project) -> PathBuf {
        project
            .build_dir()
            .join("tmp")
            .join("jarflow")
            .join("shadow-jar.sha256")
    }

    /// 前回保存したフィンガープリントとアーカイブの状態
    fn load(project: &Project) -> Option<(Self, String)> {
        let content = fs::read_to_string(Self::path_for(project)).ok()?;
        let mut lines = content.lines();
        let inputs = lines.next()?.trim().to_string();
        let archive = lines.next()?.trim().to_string();
        Some((Self(inputs), archive))
    }

    /// アーカイブを書き出した後に呼ぶ
    pub fn save(&self, project: &Project) -> Result<()> {
        let stamp = archive_stamp(&project.archive_path())?;
        let path = Self::path_for(project);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, format!("{}\n{}\n", self.0, stamp))?;
        Ok(())
    }

    /// 入力が前回と一致し、アーカイブが前回書き出したままなら最新
    pub fn is_up_to_date(&self, project: &Project) -> bool {
        let Some((saved, saved_stamp)) = Self::load(project) else {
            return false;
        };
        match archive_stamp(&project.archive_path()) {
            Ok(stamp) => saved == *self && saved_stamp == stamp,
            Err(_) => false,
        }
    }
}

/// アーカイブのサイズと更新時刻
fn archive_stamp(archive: &Path) -> Result<String> {
    let metadata = fs::metadata(archive)?;
    if !metadata.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("not a file: {}", archive.display()),
        )
        .into());
    }
    Ok(format!("{} {}", metadata.len(), modified_nanos(&metadata)))
}

fn modified_nanos(metadata: &fs::Metadata) -> u128 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
        .unwrap_or_default()
}

fn hash_file_metadata(hasher: &mut Sha256, path: &Path) -> Result<()> {
    let metadata = fs::metadata(path)?;
    hasher.update(format!(
        "{} {} {}\n",
        path.display(),
        metadata.len(),
        modified_nanos(&metadata)
    ));
    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
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
