use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_project_kdl(&self, content: &str) {
        fs::write(self.root.path().join("jarflow.kdl"), content).unwrap();
    }

    pub fn write_file(&self, relative: &str, content: &str) {
        let path = self.root.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    /// Maven レイアウトのローカルリポジトリに jar を置く
    #[allow(dead_code)]
    pub fn install_jar(&self, group: &str, name: &str, version: &str, entries: &[(&str, &str)]) {
        let path = self
            .repository()
            .join(group.replace('.', "/"))
            .join(name)
            .join(version)
            .join(format!("{}-{}.jar", name, version));
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        for (entry, content) in entries {
            zip.start_file(*entry, zip::write::FileOptions::default())
                .unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    pub fn repository(&self) -> PathBuf {
        self.root.path().join("m2")
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}
