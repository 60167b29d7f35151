//! Image reference parsing (`[<repository>/]<name>[:<tag>]`)

use crate::error::{RegistryError, Result};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_REPOSITORY: &str = "library";
pub const DEFAULT_TAG: &str = "latest";

/// A parsed image reference; immutable once constructed
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    repository: String,
    name: String,
    tag: String,
}

impl ImageReference {
    pub fn new(
        repository: impl Into<String>,
        name: impl Into<String>,
        tag: impl Into<String>,
    ) -> Result<Self> {
        let reference = Self {
            repository: repository.into(),
            name: name.into(),
            tag: tag.into(),
        };
        reference.validate()?;
        Ok(reference)
    }

    /// Parse an image name into repository, name and tag.
    ///
    /// All of these are the same image:
    /// `library/ubuntu:latest`, `ubuntu:latest`, `ubuntu`
    pub fn parse(image_name: &str) -> Result<Self> {
        let image_name = image_name.trim();
        if image_name.is_empty() {
            return Err(RegistryError::Validation(
                "Image name cannot be empty".to_string(),
            ));
        }

        let (repository, rest) = match image_name.split_once('/') {
            Some((repository, rest)) => (repository, rest),
            None => (DEFAULT_REPOSITORY, image_name),
        };
        let (name, tag) = match rest.split_once(':') {
            Some((name, tag)) => (name, tag),
            None => (rest, DEFAULT_TAG),
        };

        Self::new(repository, name, tag)
    }

    fn validate(&self) -> Result<()> {
        for (part, value) in [
            ("repository", &self.repository),
            ("name", &self.name),
            ("tag", &self.tag),
        ] {
            if value.is_empty() {
                return Err(RegistryError::Validation(format!(
                    "Image {} cannot be empty",
                    part
                )));
            }
            if value.contains(['/', ':', '@']) || value.chars().any(char::is_whitespace) {
                return Err(RegistryError::Validation(format!(
                    "Invalid image {}: {}",
                    part, value
                )));
            }
        }
        Ok(())
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// `<repository>/<name>`, the unit tokens are scoped to
    pub fn scope(&self) -> String {
        format!("{}/{}", self.repository, self.name)
    }

    /// Base file name for an architecture: `<repository>-<name>-<tag>-<arch>`
    pub fn file_stem(&self, arch: &str) -> String {
        format!("{}-{}-{}-{}", self.repository, self.name, self.tag, arch)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.repository, self.name, self.tag)
    }
}

impl FromStr for ImageReference {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
