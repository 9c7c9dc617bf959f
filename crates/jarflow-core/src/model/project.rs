//! プロジェクト定義

use super::dependency::DependencyDeclaration;
use super::image::{ImageTag, ImageTagSet};
use super::platform::Platform;
use crate::error::Result;
use crate::variables::expand_variables;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Dockerfile の規約上の位置（プロジェクトルートからの相対パス）
pub const DEFAULT_DOCKERFILE: &str = "src/main/docker/Dockerfile";
/// ビルド出力ディレクトリ
pub const BUILD_DIR: &str = "build";
/// ビルド引数でアーカイブのパスを渡すときのデフォルト名
pub const DEFAULT_JAR_ARG: &str = "JAR";

/// Project - ビルドパイプラインの設計図
///
/// jarflow.kdl 1ファイルから構築され、パイプライン実行中は変更されない。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// プロジェクト名（アーカイブ名・イメージ名の既定値）
    pub name: String,
    pub version: String,
    /// jarflow.kdl が置かれたディレクトリ
    pub root: PathBuf,
    /// バージョンカタログのパス（root からの相対パス可）
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDeclaration>,
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub shadow: ShadowConfig,
    #[serde(default)]
    pub distribution: DistributionConfig,
    #[serde(default)]
    pub docker: DockerConfig,
}

/// アーティファクトの取得元
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Repository {
    /// Maven レイアウトのローカルディレクトリ
    Local(PathBuf),
    /// Maven レイアウトのリモートリポジトリ URL
    Maven(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub main_class: Option<String>,
    /// プロジェクト自身のビルド出力（クラス・リソースのディレクトリ）
    #[serde(default)]
    pub outputs: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowConfig {
    pub archive_name: Option<String>,
    /// META-INF/services/** を行単位でマージするか
    pub merge_service_files: bool,
    /// 追加のマージ対象（glob）
    #[serde(default)]
    pub merge: Vec<String>,
    /// アーカイブから除外するエントリ（glob）
    #[serde(default)]
    pub exclude: Vec<String>,
    /// shadow-jar より先に完了させるタスク（None なら配布物タスク全て）
    #[serde(default)]
    pub depends_on: Option<Vec<String>>,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            archive_name: None,
            merge_service_files: true,
            merge: Vec::new(),
            exclude: Vec::new(),
            depends_on: None,
        }
    }
}

/// 配布物の形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionFormat {
    Tar,
    Zip,
}

impl DistributionFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tar" => Some(Self::Tar),
            "zip" => Some(Self::Zip),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Zip => "zip",
        }
    }

    /// 対応するタスク名
    pub fn task_name(&self) -> &'static str {
        match self {
            Self::Tar => "dist-tar",
            Self::Zip => "dist-zip",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub formats: Vec<DistributionFormat>,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            formats: vec![DistributionFormat::Tar, DistributionFormat::Zip],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerConfig {
    pub dockerfile: Option<PathBuf>,
    pub context: Option<PathBuf>,
    /// 追加のイメージ名（`name:version` と `name:latest` は常に付与される）
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
    /// アーカイブの相対パスを渡すビルド引数名
    pub jar_arg: Option<String>,
    pub platform: Option<Platform>,
    /// ビルド時にベースイメージを常に取得し直す（既定: false）
    #[serde(default)]
    pub pull: bool,
}

impl Project {
    pub fn new(name: impl Into<String>, version: impl Into<String>, root: PathBuf) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            root,
            catalog: None,
            variables: HashMap::new(),
            repositories: Vec::new(),
            dependencies: Vec::new(),
            application: ApplicationConfig::default(),
            shadow: ShadowConfig::default(),
            distribution: DistributionConfig::default(),
            docker: DockerConfig::default(),
        }
    }

    /// マージ済みアーカイブのファイル名（既定: `<project>.jar`）
    pub fn archive_name(&self) -> String {
        self.shadow
            .archive_name
            .clone()
            .unwrap_or_else(|| format!("{}.jar", self.name))
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    pub fn libs_dir(&self) -> PathBuf {
        self.build_dir().join("libs")
    }

    pub fn distributions_dir(&self) -> PathBuf {
        self.build_dir().join("distributions")
    }

    /// マージ済みアーカイブの出力先
    pub fn archive_path(&self) -> PathBuf {
        self.libs_dir().join(self.archive_name())
    }

    /// 配布物のベース名 `<name>-<version>`
    pub fn distribution_base_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    pub fn distribution_path(&self, format: DistributionFormat) -> PathBuf {
        self.distributions_dir().join(format!(
            "{}.{}",
            self.distribution_base_name(),
            format.extension()
        ))
    }

    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.as_ref().map(|p| self.root.join(p))
    }

    pub fn output_dirs(&self) -> Vec<PathBuf> {
        self.application
            .outputs
            .iter()
            .map(|p| self.root.join(p))
            .collect()
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.root.join(
            self.docker
                .dockerfile
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DOCKERFILE)),
        )
    }

    pub fn context_dir(&self) -> PathBuf {
        match &self.docker.context {
            Some(ctx) => self.root.join(ctx),
            None => self.root.clone(),
        }
    }

    pub fn jar_arg(&self) -> &str {
        self.docker.jar_arg.as_deref().unwrap_or(DEFAULT_JAR_ARG)
    }

    /// プロジェクト変数で `{VAR}` を展開
    pub fn expand(&self, template: &str) -> String {
        expand_variables(template, &self.variables)
    }

    /// イメージに付与するタグ集合
    pub fn image_tags(&self) -> Result<ImageTagSet> {
        let extra = self
            .docker
            .images
            .iter()
            .map(|image| ImageTag::parse(&self.expand(image)))
            .collect::<Result<Vec<_>>>()?;
        ImageTagSet::for_project(&self.name, &self.version, &extra)
    }
}
