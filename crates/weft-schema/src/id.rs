use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};
use std::fmt;
use url::Url;

/// Errors surfaced by [`SchemaId::validate`].
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SchemaIdError {
    /// The value does not parse as a URL at all.
    #[error("invalid URL: {0}")]
    Parse(#[from] url::ParseError),

    /// Only http and https identifiers are accepted.
    #[error("unexpected scheme {0:?}, want http or https")]
    Scheme(SmolStr),

    /// The URL has no hostname.
    #[error("missing hostname")]
    MissingHost,

    /// The hostname has no dot, so it cannot be a fully-qualified domain.
    #[error("hostname {0:?} is not fully qualified")]
    HostNotQualified(SmolStr),

    /// The URL carries no path component.
    #[error("path is required")]
    MissingPath,
}

/// A schema identifier URI, as used for `$id`, `$anchor`, `$ref` and
/// `$dynamicRef` values.
///
/// The derivation methods are pure string transforms: they never touch the
/// network and never fail. Construction does not validate; call
/// [`validate`](SchemaId::validate) where a well-formed canonical identifier
/// is required.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct SchemaId(SmolStr);

impl SchemaId {
    /// The unset identifier.
    pub const EMPTY: SchemaId = SchemaId(SmolStr::new_static(""));

    /// Wrap a string as an identifier without validating it.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id.as_ref()))
    }

    /// Wrap a static string without allocating.
    pub const fn new_static(id: &'static str) -> Self {
        Self(SmolStr::new_static(id))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The identifier with any `#...` fragment and trailing slash removed.
    pub fn base(&self) -> SchemaId {
        let s = match self.0.find('#') {
            Some(i) => &self.0[..i],
            None => self.0.as_str(),
        };
        Self(SmolStr::new(s.trim_end_matches('/')))
    }

    /// Append a `#name` anchor fragment to the base.
    pub fn anchor(&self, name: &str) -> SchemaId {
        Self(format_smolstr!("{}#{}", self.base(), name))
    }

    /// Append a `#/$defs/name` pointer fragment to the base.
    pub fn def(&self, name: &str) -> SchemaId {
        Self(format_smolstr!("{}#/$defs/{}", self.base(), name))
    }

    /// Append a path segment to the base, normalizing to a single slash.
    pub fn add(&self, path: &str) -> SchemaId {
        let base = self.base();
        if path.starts_with('/') {
            Self(format_smolstr!("{}{}", base, path))
        } else {
            Self(format_smolstr!("{}/{}", base, path))
        }
    }

    /// Check that the identifier is a canonical absolute URI: http(s)
    /// scheme, fully-qualified hostname, non-empty path.
    pub fn validate(&self) -> Result<(), SchemaIdError> {
        let url = Url::parse(self.0.as_str())?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(SchemaIdError::Scheme(other.into())),
        }
        let host = url.host_str().unwrap_or("");
        if host.is_empty() {
            return Err(SchemaIdError::MissingHost);
        }
        if !host.contains('.') {
            return Err(SchemaIdError::HostNotQualified(host.into()));
        }
        if url.path().is_empty() {
            return Err(SchemaIdError::MissingPath);
        }
        Ok(())
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<SchemaId> for SmolStr {
    fn from(id: SchemaId) -> Self {
        id.0
    }
}

impl AsRef<str> for SchemaId {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_strips_fragment_and_trailing_slash() {
        let id = SchemaId::new("https://example.com/a/b#frag");
        assert_eq!(id.base().as_str(), "https://example.com/a/b");

        let id = SchemaId::new("https://example.com/a/b/");
        assert_eq!(id.base().as_str(), "https://example.com/a/b");

        let id = SchemaId::new("https://example.com/a/b");
        assert_eq!(id.base().as_str(), "https://example.com/a/b");
    }

    #[test]
    fn anchor_def_add_derive_from_base() {
        let id = SchemaId::new("https://example.com/a/b#frag");
        assert_eq!(id.anchor("c").as_str(), "https://example.com/a/b#c");
        assert_eq!(id.def("Foo").as_str(), "https://example.com/a/b#/$defs/Foo");
        assert_eq!(id.add("c").as_str(), "https://example.com/a/b/c");
        assert_eq!(id.add("/c").as_str(), "https://example.com/a/b/c");
    }

    #[test]
    fn validate_accepts_canonical_ids() {
        SchemaId::new("https://example.com/schemas/thing")
            .validate()
            .expect("valid id");
        SchemaId::new("http://sub.example.com/x")
            .validate()
            .expect("valid id");
    }

    #[test]
    fn validate_rejects_bad_ids() {
        assert!(matches!(
            SchemaId::new("ftp://example.com/x").validate(),
            Err(SchemaIdError::Scheme(_))
        ));
        assert!(matches!(
            SchemaId::new("https://localhost/x").validate(),
            Err(SchemaIdError::HostNotQualified(_))
        ));
        assert!(SchemaId::new("not a url").validate().is_err());
        assert!(SchemaId::new("").validate().is_err());
    }

    #[test]
    fn empty_constant() {
        assert!(SchemaId::EMPTY.is_empty());
        assert_eq!(SchemaId::EMPTY.as_str(), "");
    }
}
