//! jarflow image build
//!
//! Dockerfile・ビルドコンテキスト・ビルド引数の解決と、
//! Docker API / docker buildx によるイメージのビルドを提供する。

pub mod auth;
pub mod builder;
pub mod context;
pub mod error;
pub mod progress;
pub mod resolver;

pub use auth::RegistryAuth;
pub use builder::{BuildxBuilder, BuiltImage, DockerApiBuilder, ImageBackend, ImageBuildRequest};
pub use context::{ContextArchive, ContextBuilder, DockerIgnore};
pub use error::{BuildError, BuildResult};
pub use progress::BuildProgress;
pub use resolver::BuildResolver;
