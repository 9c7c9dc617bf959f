//! イメージタグ

use crate::error::{ProjectError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `name:tag` の組
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageTag {
    /// イメージ名（レジストリ込み）
    pub name: String,
    pub tag: String,
}

impl ImageTag {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let tag = tag.into();

        if name.trim().is_empty() {
            return Err(ProjectError::InvalidTag("(empty image name)".to_string()));
        }
        // 最後の / 以降の `:` はタグ区切りなので名前には含められない
        let last_segment = name.rsplit('/').next().unwrap_or(&name);
        if last_segment.contains(':') {
            return Err(ProjectError::InvalidTag(format!(
                "Image name must not contain a tag: {}",
                name
            )));
        }
        validate_tag(&tag)?;

        Ok(Self { name, tag })
    }

    /// `ghcr.io/org/app:v1` 形式の文字列からパース（タグ省略時は latest）
    pub fn parse(image: &str) -> Result<Self> {
        let (name, tag) = split_image_tag(image);
        Self::new(name, tag)
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// 1つのイメージに付与するタグの順序付き集合
///
/// 重複は持たない。`for_project` で作った集合は必ず
/// `<project>:<version>` と `<project>:latest` を先頭に含む。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTagSet {
    tags: Vec<ImageTag>,
}

impl ImageTagSet {
    pub fn for_project(name: &str, version: &str, extra: &[ImageTag]) -> Result<Self> {
        let mut set = Self::default();
        set.push(ImageTag::new(name, version)?);
        set.push(ImageTag::new(name, "latest")?);
        for tag in extra {
            set.push(tag.clone());
        }
        Ok(set)
    }

    /// 追加（既に含まれていれば何もしない）
    pub fn push(&mut self, tag: ImageTag) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn primary(&self) -> Option<&ImageTag> {
        self.tags.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageTag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.to_string()).collect()
    }
}

impl<'a> IntoIterator for &'a ImageTagSet {
    type Item = &'a ImageTag;
    type IntoIter = std::slice::Iter<'a, ImageTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.tags.iter()
    }
}

/// イメージ名とタグを分離
///
/// # Examples
/// - `ghcr.io/org/app:v1.0` -> `("ghcr.io/org/app", "v1.0")`
/// - `ghcr.io/org/app` -> `("ghcr.io/org/app", "latest")`
/// - `localhost:5000/app:dev` -> `("localhost:5000/app", "dev")`
/// - `ghcr.io/org/app:2` -> `("ghcr.io/org/app", "2")`
pub fn split_image_tag(image: &str) -> (String, String) {
    if let Some(pos) = image.rfind(':') {
        let potential_tag = &image[pos + 1..];
        let potential_image = &image[..pos];

        // localhost:5000/app の `:` はレジストリのポートで、その後ろには / が続く
        if !potential_tag.contains('/') {
            return (potential_image.to_string(), potential_tag.to_string());
        }
    }

    (image.to_string(), "latest".to_string())
}

/// タグのバリデーション
///
/// Docker タグの制約:
/// - 128文字以下
/// - 英数字、ピリオド、ハイフン、アンダースコアのみ
/// - 先頭はピリオドまたはハイフンではない
fn validate_tag(tag: &str) -> Result<()> {
    if tag.is_empty() {
        return Err(ProjectError::InvalidTag("(empty)".to_string()));
    }

    if tag.len() > 128 {
        return Err(ProjectError::InvalidTag(format!(
            "Tag too long ({} characters, max 128)",
            tag.len()
        )));
    }

    if tag.starts_with('.') || tag.starts_with('-') {
        return Err(ProjectError::InvalidTag(tag.to_string()));
    }

    if let Some(c) = tag
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '.' && *c != '-' && *c != '_')
    {
        return Err(ProjectError::InvalidTag(format!(
            "Invalid character '{}' in tag: {}",
            c, tag
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_set_for_project() {
        let set = ImageTagSet::for_project("control-plane", "1.2.3", &[]).unwrap();
        assert_eq!(
            set.to_strings(),
            vec!["control-plane:1.2.3", "control-plane:latest"]
        );
    }

    #[test]
    fn test_tag_set_extra_tags_are_appended_without_duplicates() {
        let extra = vec![
            ImageTag::parse("ghcr.io/acme/control-plane:edge").unwrap(),
            ImageTag::parse("control-plane:latest").unwrap(),
        ];
        let set = ImageTagSet::for_project("control-plane", "1.2.3", &extra).unwrap();
        assert_eq!(
            set.to_strings(),
            vec![
                "control-plane:1.2.3",
                "control-plane:latest",
                "ghcr.io/acme/control-plane:edge",
            ]
        );
        assert_eq!(set.primary().unwrap().tag, "1.2.3");
    }

    #[test]
    fn test_tag_set_rejects_invalid_version() {
        assert!(ImageTagSet::for_project("control-plane", "1.0+build", &[]).is_err());
        assert!(ImageTagSet::for_project("control-plane", "-rc1", &[]).is_err());
        assert!(ImageTagSet::for_project("", "1.0.0", &[]).is_err());
    }

    #[test]
    fn test_split_image_tag_with_tag() {
        let (image, tag) = split_image_tag("ghcr.io/org/app:v1.0");
        assert_eq!(image, "ghcr.io/org/app");
        assert_eq!(tag, "v1.0");
    }

    #[test]
    fn test_split_image_tag_without_tag() {
        let (image, tag) = split_image_tag("ghcr.io/org/app");
        assert_eq!(image, "ghcr.io/org/app");
        assert_eq!(tag, "latest");
    }

    #[test]
    fn test_split_image_tag_with_port() {
        let (image, tag) = split_image_tag("localhost:5000/app");
        assert_eq!(image, "localhost:5000/app");
        assert_eq!(tag, "latest");

        let (image, tag) = split_image_tag("localhost:5000/app:dev");
        assert_eq!(image, "localhost:5000/app");
        assert_eq!(tag, "dev");
    }

    #[test]
    fn test_numeric_tag_is_not_a_port() {
        let tag = ImageTag::parse("ghcr.io/acme/control-plane:2").unwrap();
        assert_eq!(tag.name, "ghcr.io/acme/control-plane");
        assert_eq!(tag.tag, "2");
        assert_eq!(tag.to_string(), "ghcr.io/acme/control-plane:2");

        let tag = ImageTag::parse("app:2").unwrap();
        assert_eq!(tag.to_string(), "app:2");
    }

    #[test]
    fn test_name_with_tag_is_rejected() {
        assert!(ImageTag::new("app:2", "latest").is_err());
        assert!(ImageTag::new("localhost:5000/app", "dev").is_ok());
    }

    #[test]
    fn test_validate_tag_too_long() {
        let long = "a".repeat(129);
        assert!(ImageTag::new("app", long).is_err());
        assert!(ImageTag::new("app", "a".repeat(128)).is_ok());
    }
}
