use crate::error::{BuildError, BuildResult};
use flate2::Compression;
use flate2::write::GzEncoder;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};
use tar::Builder;

/// コンテキスト外の Dockerfile を格納する名前
const EXTERNAL_DOCKERFILE_NAME: &str = ".jarflow.Dockerfile";

/// .dockerignore のルール
///
/// 後に書かれたルールが優先される。`!` で始まる行は除外の取り消し。
#[derive(Debug, Clone, Default)]
pub struct DockerIgnore {
    rules: Vec<(Pattern, bool)>,
}

impl DockerIgnore {
    /// コンテキストルートの .dockerignore を読み込む（無ければ空）
    pub fn load(context_path: &Path) -> BuildResult<Self> {
        let path = context_path.join(".dockerignore");
        if !path.is_file() {
            return Ok(Self::default());
        }
        Self::parse(&fs::read_to_string(&path)?)
    }

    pub fn parse(content: &str) -> BuildResult<Self> {
        let mut rules = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (negated, pattern) = match line.strip_prefix('!') {
                Some(rest) => (true, rest.trim()),
                None => (false, line),
            };
            let pattern = pattern
                .trim_start_matches("./")
                .trim_start_matches('/')
                .trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }
            let compiled = Pattern::new(pattern).map_err(|e| {
                BuildError::InvalidConfig(format!(".dockerignore のパターンが無効です '{}': {}", pattern, e))
            })?;
            rules.push((compiled, negated));
        }

        Ok(Self { rules })
    }

    /// コンテキストからの相対パス（`/` 区切り）が除外対象か
    ///
    /// 親ディレクトリがマッチした場合も除外される。
    pub fn is_ignored(&self, relative: &str) -> bool {
        let mut ignored = false;
        for (pattern, negated) in &self.rules {
            if matches_self_or_parent(pattern, relative) {
                ignored = !negated;
            }
        }
        ignored
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn matches_self_or_parent(pattern: &Pattern, relative: &str) -> bool {
    if pattern.matches(relative) {
        return true;
    }
    relative
        .match_indices('/')
        .any(|(i, _)| pattern.matches(&relative[..i]))
}

/// Docker に送るコンテキスト
#[derive(Debug)]
pub struct ContextArchive {
    /// gzip 圧縮された tar
    pub data: Vec<u8>,
    /// コンテキスト内での Dockerfile のパス
    pub dockerfile: String,
    /// 含まれるファイル数
    pub files: usize,
}

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストをtar.gzアーカイブとして作成
    ///
    /// Dockerfile がコンテキスト外にある場合は `.jarflow.Dockerfile` として追加する。
    pub fn create_context(context_path: &Path, dockerfile_path: &Path) -> BuildResult<ContextArchive> {
        tracing::debug!("Creating build context from: {}", context_path.display());

        let ignore = DockerIgnore::load(context_path)?;
        let dockerfile_in_context = relative_path(context_path, dockerfile_path);

        let mut files = Vec::new();
        collect_files(context_path, context_path, &ignore, &mut files)?;
        files.sort();

        let mut archive_data = Vec::new();
        let dockerfile;
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);

            for (relative, path) in &files {
                tar.append_path_with_name(path, relative)
                    .map_err(BuildError::Io)?;
            }

            dockerfile = match &dockerfile_in_context {
                // Dockerfile と .dockerignore は除外ルールに関係なく送る
                Some(relative) => {
                    if !files.iter().any(|(r, _)| r == relative) {
                        tar.append_path_with_name(dockerfile_path, relative)
                            .map_err(BuildError::Io)?;
                    }
                    relative.clone()
                }
                None => {
                    let content = fs::read(dockerfile_path)?;
                    let mut header = tar::Header::new_gnu();
                    header.set_size(content.len() as u64);
                    header.set_mode(0o644);
                    tar.append_data(&mut header, EXTERNAL_DOCKERFILE_NAME, &content[..])
                        .map_err(BuildError::Io)?;
                    EXTERNAL_DOCKERFILE_NAME.to_string()
                }
            };

            tar.into_inner()
                .and_then(|encoder| encoder.finish())
                .map_err(BuildError::Io)?;
        }

        tracing::debug!(
            bytes = archive_data.len(),
            files = files.len(),
            dockerfile = %dockerfile,
            "Build context created"
        );

        // コンテキストサイズの警告
        Self::check_context_size(archive_data.len());

        Ok(ContextArchive {
            data: archive_data,
            dockerfile,
            files: files.len(),
        })
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "警告: ビルドコンテキストが大きすぎます（{}MB）\n\
                 .dockerignoreファイルで不要なファイルを除外することを推奨します。",
                size / 1024 / 1024
            );
        }
    }
}

/// `base` からの相対パス（`/` 区切り）。`base` の外なら None
pub fn relative_path(base: &Path, path: &Path) -> Option<String> {
    let relative = match path.strip_prefix(base) {
        Ok(relative) => relative.to_path_buf(),
        Err(_) => {
            let base = fs::canonicalize(base).ok()?;
            let path = fs::canonicalize(path).ok()?;
            path.strip_prefix(&base).ok()?.to_path_buf()
        }
    };
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() || parts.iter().any(|p| p == "..") {
        return None;
    }
    Some(parts.join("/"))
}

fn collect_files(
    root: &Path,
    dir: &Path,
    ignore: &DockerIgnore,
    out: &mut Vec<(String, PathBuf)>,
) -> BuildResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(relative) = relative_path(root, &path) else {
            continue;
        };
        if relative != ".dockerignore" && ignore.is_ignored(&relative) {
            // 否定ルールで戻される子があり得るのでディレクトリは辿る
            if !path.is_dir() {
                continue;
            }
        }
        if path.is_dir() {
            collect_files(root, &path, ignore, out)?;
        } else if relative == ".dockerignore" || !ignore.is_ignored(&relative) {
            out.push((relative, path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    fn unpack(archive: &ContextArchive) -> Vec<String> {
        let decoder = flate2::read::GzDecoder::new(&archive.data[..]);
        let mut tar = tar::Archive::new(decoder);
        let mut names: Vec<String> = tar
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_create_context() {
        let temp_dir = tempdir().unwrap();

        fs::create_dir_all(temp_dir.path().join("build/libs")).unwrap();
        fs::write(temp_dir.path().join("build/libs/app.jar"), "jar").unwrap();
        fs::create_dir_all(temp_dir.path().join("src/main/docker")).unwrap();
        let dockerfile = temp_dir.path().join("src/main/docker/Dockerfile");
        fs::write(&dockerfile, "FROM eclipse-temurin:17-jre\nARG JAR\nCOPY ${JAR} app.jar").unwrap();

        let archive = ContextBuilder::create_context(temp_dir.path(), &dockerfile).unwrap();

        assert_eq!(archive.dockerfile, "src/main/docker/Dockerfile");
        assert_eq!(
            unpack(&archive),
            vec!["build/libs/app.jar", "src/main/docker/Dockerfile"]
        );
    }

    #[test]
    fn test_dockerfile_outside_context() {
        let context = tempdir().unwrap();
        let other = tempdir().unwrap();
        fs::write(context.path().join("app.jar"), "jar").unwrap();
        let dockerfile = other.path().join("Dockerfile");
        fs::write(&dockerfile, "FROM alpine").unwrap();

        let archive = ContextBuilder::create_context(context.path(), &dockerfile).unwrap();

        assert_eq!(archive.dockerfile, EXTERNAL_DOCKERFILE_NAME);
        let decoder = flate2::read::GzDecoder::new(&archive.data[..]);
        let mut tar = tar::Archive::new(decoder);
        let mut found = false;
        for entry in tar.entries().unwrap() {
            let mut entry = entry.unwrap();
            if entry.path().unwrap().to_string_lossy() == EXTERNAL_DOCKERFILE_NAME {
                let mut content = String::new();
                entry.read_to_string(&mut content).unwrap();
                assert_eq!(content, "FROM alpine");
                found = true;
            }
        }
        assert!(found);
    }

    #[test]
    fn test_dockerignore_is_honored() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".dockerignore"), "# comment\n.git\nbuild\n!build/libs\n*.log\nDockerfile\n").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref").unwrap();
        fs::create_dir_all(root.join("build/classes")).unwrap();
        fs::write(root.join("build/classes/Main.class"), "x").unwrap();
        fs::create_dir_all(root.join("build/libs")).unwrap();
        fs::write(root.join("build/libs/app.jar"), "jar").unwrap();
        fs::write(root.join("debug.log"), "log").unwrap();
        let dockerfile = root.join("Dockerfile");
        fs::write(&dockerfile, "FROM alpine").unwrap();

        let archive = ContextBuilder::create_context(root, &dockerfile).unwrap();

        assert_eq!(
            unpack(&archive),
            vec![".dockerignore", "Dockerfile", "build/libs/app.jar"]
        );
    }

    #[test]
    fn test_dockerignore_rules() {
        let ignore = DockerIgnore::parse("target\n/secrets/*.pem\n!keep.log\n*.log").unwrap();

        assert!(ignore.is_ignored("target"));
        assert!(ignore.is_ignored("target/classes/A.class"));
        assert!(ignore.is_ignored("secrets/key.pem"));
        assert!(!ignore.is_ignored("src/main/java/A.java"));
        // 後のルールが優先
        assert!(ignore.is_ignored("keep.log"));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/p"), Path::new("/p/build/libs/app.jar")),
            Some("build/libs/app.jar".to_string())
        );
        assert_eq!(relative_path(Path::new("/p/ctx"), Path::new("/q/app.jar")), None);
    }
}
