//! jarflow archive
//!
//! 宣言された座標のアーティファクト解決、fat jar のマージ、
//! 配布物 (tar / zip) の作成を提供する。

pub mod distribution;
pub mod error;
pub mod manifest;
pub mod merger;
pub mod resolver;
mod scripts;

pub use distribution::DistributionBuilder;
pub use error::{ArchiveError, Result};
pub use manifest::Manifest;
pub use merger::{ArchiveMerger, MergeReport, MergeRules, MergeSource};
pub use resolver::{ArtifactResolver, RepositoryResolver, ResolvedArtifact, resolve_all};
