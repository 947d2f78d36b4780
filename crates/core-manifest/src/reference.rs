//! Content identities: references, hierarchical locations and content-type tags

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Segment separator used when rendering a location as a string
pub const LOCATION_SEPARATOR: char = '/';

/// Tag naming a content type (e.g. `"user"`); the manifest partition key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentType(Cow<'static, str>);

impl ContentType {
    /// Create a content type tag usable in `const` position
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create a content type tag from a runtime string (e.g. config or CLI input)
    pub fn from_name<S: Into<String>>(name: S) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hierarchical path of a content item, e.g. `Finance/Quarterly/Revenue`
///
/// Project-contained content uses the project path as its parent; top-level
/// content such as users has a single segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentLocation {
    segments: Vec<String>,
}

impl ContentLocation {
    /// Build a location from already-split segments
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments
            .iter()
            .any(|s| s.is_empty() || s.contains(LOCATION_SEPARATOR))
        {
            return Err(Error::InvalidLocation(segments.join("/")));
        }
        Ok(Self { segments })
    }

    /// Single-segment location for top-level content
    pub fn root<S: Into<String>>(name: S) -> Result<Self> {
        Self::new([name])
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Location of the containing item, `None` for top-level content
    pub fn parent(&self) -> Option<ContentLocation> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Child location one level below this one
    pub fn append<S: Into<String>>(&self, segment: S) -> Result<ContentLocation> {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self::new(segments)
    }

    /// Replace the last segment
    pub fn rename<S: Into<String>>(&self, name: S) -> Result<ContentLocation> {
        let mut segments = self.segments.clone();
        segments.pop();
        segments.push(name.into());
        Self::new(segments)
    }

    /// Whether `prefix` is this location or one of its ancestors
    pub fn starts_with(&self, prefix: &ContentLocation) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl fmt::Display for ContentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for ContentLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim_matches(LOCATION_SEPARATOR);
        if trimmed.is_empty() {
            return Ok(Self::default());
        }
        Self::new(trimmed.split(LOCATION_SEPARATOR))
            .map_err(|_| Error::InvalidLocation(s.to_string()))
    }
}

impl TryFrom<String> for ContentLocation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ContentLocation> for String {
    fn from(location: ContentLocation) -> Self {
        location.to_string()
    }
}

/// Lightweight stub identifying one content item within a system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentReference {
    /// Identifier, unique within one system
    pub id: Uuid,

    /// Hierarchical location
    pub location: ContentLocation,

    /// Optional URL slug
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

impl ContentReference {
    pub fn new(id: Uuid, location: ContentLocation) -> Self {
        Self {
            id,
            location,
            content_url: None,
        }
    }

    /// Set the content URL slug
    pub fn with_content_url<S: Into<String>>(mut self, content_url: S) -> Self {
        self.content_url = Some(content_url.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.location.name()
    }
}
