//! Qualified names.
//!
//! A name carries its lexical prefix next to the namespace URI it is bound to,
//! because namespace conflicts are detected on the prefix -> URI mapping.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;

use crate::{StoreError, StoreResult};

/// XML NameStartChar without the colon.
const NAME_START: &str = r"A-Z_a-z\x{C0}-\x{D6}\x{D8}-\x{F6}\x{F8}-\x{2FF}\x{370}-\x{37D}\x{37F}-\x{1FFF}\x{200C}-\x{200D}\x{2070}-\x{218F}\x{2C00}-\x{2FEF}\x{3001}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFFD}\x{10000}-\x{EFFFF}";

/// Characters a name may continue with, besides NAME_START.
const NAME_REST: &str = r"\-.0-9\x{B7}\x{300}-\x{36F}\x{203F}-\x{2040}";

fn ncname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!("^[{NAME_START}][{NAME_START}{NAME_REST}]*$");
        Regex::new(&pattern).expect("NCName pattern is valid")
    })
}

/// Returns true if the string is a valid NCName.
pub fn is_ncname(s: &str) -> bool {
    ncname_pattern().is_match(s)
}

/// A qualified name with optional prefix and namespace URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub uri: Option<String>,
}

impl QName {
    /// Create an unprefixed name in no namespace.
    pub fn new(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
            uri: None,
        }
    }

    /// Create a prefixed name bound to a namespace URI.
    pub fn prefixed(
        prefix: impl Into<String>,
        local: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            local: local.into(),
            uri: Some(uri.into()),
        }
    }

    /// Bind the name to a namespace URI.
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Parse a lexical `prefix:local` or `local` name. The URI stays unbound.
    pub fn parse(lexical: &str) -> StoreResult<Self> {
        let (prefix, local) = match lexical.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, lexical),
        };
        if !is_ncname(local) || prefix.is_some_and(|p| !is_ncname(p)) {
            return Err(StoreError::invalid_name(lexical));
        }
        Ok(Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            uri: None,
        })
    }

    /// The lexical form `prefix:local`.
    pub fn lexical(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.local),
            None => self.local.clone(),
        }
    }

    /// Expanded-name equality (URI and local name, prefix ignored).
    pub fn same_name(&self, other: &QName) -> bool {
        self.local == other.local && self.uri == other.uri
    }

    /// Returns true if the name carries a prefix that is not `xml`.
    pub fn binds_prefix(&self) -> bool {
        self.prefix.as_deref().is_some_and(|p| p != "xml")
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

impl From<&str> for QName {
    fn from(local: &str) -> Self {
        QName::new(local)
    }
}
