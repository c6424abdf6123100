//! Configuration for committing updates

/// Options controlling check and apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Merge adjacent text nodes created by the applied edits
    pub merge_texts: bool,
    /// Export modified stores to their backing location after flush
    pub write_back: bool,
    /// Reject conflicting namespace prefix bindings
    pub check_namespaces: bool,
    /// Upper bound on put targets per snapshot
    pub max_put_targets: Option<usize>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            merge_texts: true,
            write_back: false,
            check_namespaces: true,
            max_put_targets: None,
        }
    }
}

impl UpdateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merge_texts(mut self, merge: bool) -> Self {
        self.merge_texts = merge;
        self
    }

    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    pub fn with_check_namespaces(mut self, check: bool) -> Self {
        self.check_namespaces = check;
        self
    }

    pub fn with_max_put_targets(mut self, max: usize) -> Self {
        self.max_put_targets = Some(max);
        self
    }

    /// Only the mandatory checks and edits, no text merging.
    pub fn minimal() -> Self {
        Self {
            merge_texts: false,
            write_back: false,
            check_namespaces: false,
            max_put_targets: None,
        }
    }
}
