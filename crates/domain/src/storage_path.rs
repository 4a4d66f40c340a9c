use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult};

/// Maximum accepted length of a storage path or path pattern, in bytes.
pub const STORAGE_PATH_MAX_LENGTH: usize = 1024;

const DELIMITER: char = '/';
const WILDCARD: &str = "*";

/// Normalized object path inside a bucket.
///
/// Leading delimiters are dropped and a trailing delimiter marks a folder. The bucket root is
/// the empty folder path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoragePath {
    normalized: String,
    is_folder: bool,
}

impl StoragePath {
    /// Parses and validates a storage path.
    pub fn parse(value: &str) -> AppResult<Self> {
        if value.len() > STORAGE_PATH_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "storage path exceeds {STORAGE_PATH_MAX_LENGTH} bytes"
            )));
        }

        let without_leading = value.trim_start_matches(DELIMITER);
        let is_folder = without_leading.is_empty() || without_leading.ends_with(DELIMITER);
        let normalized = without_leading
            .strip_suffix(DELIMITER)
            .unwrap_or(without_leading);

        if !normalized.is_empty() {
            for segment in normalized.split(DELIMITER) {
                validate_segment(segment, value)?;
                if segment.contains('*') {
                    return Err(AppError::Validation(format!(
                        "storage path '{value}' must not contain wildcards"
                    )));
                }
            }
        }

        Ok(Self {
            normalized: normalized.to_owned(),
            is_folder,
        })
    }

    /// Returns the normalized path without the folder marker.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.normalized.as_str()
    }

    /// Returns whether the path names a folder.
    #[must_use]
    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    /// Returns whether the path is the bucket root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.normalized.is_empty()
    }

    /// Returns the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.normalized
            .split(DELIMITER)
            .filter(|segment| !segment.is_empty())
    }

    /// Returns whether this path equals `ancestor` or lies below it.
    #[must_use]
    pub fn is_within(&self, ancestor: &StoragePath) -> bool {
        let mut own = self.segments();
        ancestor
            .segments()
            .all(|segment| own.next().is_some_and(|value| value == segment))
    }

    /// Returns the listing prefix for a folder: the normalized path plus a trailing delimiter.
    #[must_use]
    pub fn listing_prefix(&self) -> String {
        if self.normalized.is_empty() {
            String::new()
        } else {
            format!("{}{DELIMITER}", self.normalized)
        }
    }
}

impl Display for StoragePath {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_folder && !self.normalized.is_empty() {
            write!(formatter, "{}{DELIMITER}", self.normalized)
        } else {
            write!(formatter, "{}", self.normalized)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
enum PatternSegment {
    Literal(String),
    AnySegment,
}

/// Storage path pattern declared on a storage permission.
///
/// Grammar: `/`-separated segments. A literal segment matches itself. A `*` segment in a
/// non-final position matches exactly one segment. A final `*` segment matches the prefix
/// folder itself and every descendant below it. `*` alone (or an empty pattern) matches the
/// whole bucket. Wildcards embedded inside a segment are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
    descendants: bool,
}

impl PathPattern {
    /// Parses and validates a path pattern.
    pub fn parse(value: &str) -> AppResult<Self> {
        if value.len() > STORAGE_PATH_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "path pattern exceeds {STORAGE_PATH_MAX_LENGTH} bytes"
            )));
        }

        let trimmed = value.trim().trim_start_matches(DELIMITER);
        let trimmed = trimmed.strip_suffix(DELIMITER).unwrap_or(trimmed);

        if trimmed.is_empty() || trimmed == WILDCARD {
            return Ok(Self {
                source: WILDCARD.to_owned(),
                segments: Vec::new(),
                descendants: true,
            });
        }

        let raw_segments: Vec<&str> = trimmed.split(DELIMITER).collect();
        let last_index = raw_segments.len() - 1;
        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut descendants = false;

        for (index, segment) in raw_segments.into_iter().enumerate() {
            validate_segment(segment, value)?;

            if segment == WILDCARD {
                if index == last_index {
                    descendants = true;
                } else {
                    segments.push(PatternSegment::AnySegment);
                }
                continue;
            }

            if segment.contains('*') {
                return Err(AppError::Validation(format!(
                    "path pattern '{value}' may only use '*' as a whole segment"
                )));
            }

            segments.push(PatternSegment::Literal(segment.to_owned()));
        }

        Ok(Self {
            source: trimmed.to_owned(),
            segments,
            descendants,
        })
    }

    /// Returns the normalized pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.source.as_str()
    }

    /// Returns whether the pattern covers the given path.
    #[must_use]
    pub fn matches(&self, path: &StoragePath) -> bool {
        let path_segments: Vec<&str> = path.segments().collect();

        let length_fits = if self.descendants {
            path_segments.len() >= self.segments.len()
        } else {
            path_segments.len() == self.segments.len()
        };

        length_fits
            && self
                .segments
                .iter()
                .zip(path_segments.iter())
                .all(|(pattern, segment)| match pattern {
                    PatternSegment::AnySegment => true,
                    PatternSegment::Literal(literal) => literal == segment,
                })
    }

    /// Returns whether the pattern covers `folder` and every descendant below it.
    #[must_use]
    pub fn covers_subtree(&self, folder: &StoragePath) -> bool {
        self.descendants && self.matches(folder)
    }
}

fn validate_segment(segment: &str, source: &str) -> AppResult<()> {
    if segment.is_empty() {
        return Err(AppError::Validation(format!(
            "storage path '{source}' contains an empty segment"
        )));
    }

    if segment == "." || segment == ".." {
        return Err(AppError::Validation(format!(
            "storage path '{source}' must not contain relative segments"
        )));
    }

    if segment.chars().any(char::is_control) {
        return Err(AppError::Validation(
            "storage path must not contain control characters".to_owned(),
        ));
    }

    Ok(())
}
