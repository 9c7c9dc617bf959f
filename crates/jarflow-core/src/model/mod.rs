//! モデル定義
//!
//! jarflow で使用されるデータモデルを定義します。

mod coordinate;
mod dependency;
mod image;
mod platform;
mod project;

// Re-exports
pub use coordinate::*;
pub use dependency::*;
pub use image::*;
pub use platform::*;
pub use project::*;
