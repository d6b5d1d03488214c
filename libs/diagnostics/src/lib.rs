//! Utilities for collecting diagnostics.
//!
//! Consumers define their own issue types implementing [`Diagnostic`] and
//! accumulate them in an [`IssueSet`]; nothing here aborts or panics, issues
//! are data.

#![warn(missing_docs)]

use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};

/// A diagnostic issue that should be reported to users.
pub trait Diagnostic: Debug + Display {
    /// Returns an optional help message indicating what users can do to
    /// resolve the issue.
    fn help(&self) -> Option<Box<dyn Display>> {
        None
    }

    /// Returns the severity of this issue.
    ///
    /// The default implementation returns [`Severity::default`].
    fn severity(&self) -> Severity {
        Default::default()
    }
}

/// An enumeration of possible severity levels.
#[derive(
    Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub enum Severity {
    /// An informational message.
    Info,
    /// A warning.
    #[default]
    Warning,
    /// An error. Often, but not always, fatal.
    Error,
}

impl Severity {
    /// Logs a message at a `tracing` level corresponding to this severity.
    pub fn log(&self, msg: &str) {
        match self {
            Severity::Info => tracing::info!("{}", msg),
            Severity::Warning => tracing::warn!("{}", msg),
            Severity::Error => tracing::error!("{}", msg),
        }
    }
}

/// An ordered collection of issues.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSet<T> {
    issues: Vec<T>,
    num_errors: usize,
    num_warnings: usize,
}

impl<T> IssueSet<T> {
    /// Creates a new, empty issue set.
    #[inline]
    pub fn new() -> Self {
        Self {
            issues: Vec::new(),
            num_errors: 0,
            num_warnings: 0,
        }
    }

    /// Returns an iterator over all issues in the set, in insertion order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.issues.iter()
    }

    /// The number of issues in this issue set.
    #[inline]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Returns `true` if this issue set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// The number of issues with [`Severity::Error`].
    #[inline]
    pub fn num_errors(&self) -> usize {
        self.num_errors
    }

    /// The number of issues with [`Severity::Warning`].
    #[inline]
    pub fn num_warnings(&self) -> usize {
        self.num_warnings
    }

    /// Whether this set contains any issue with [`Severity::Error`].
    #[inline]
    pub fn has_error(&self) -> bool {
        self.num_errors > 0
    }
}

impl<T: Diagnostic> IssueSet<T> {
    /// Adds the given issue to the issue set.
    pub fn add(&mut self, issue: T) {
        match issue.severity() {
            Severity::Error => self.num_errors += 1,
            Severity::Warning => self.num_warnings += 1,
            Severity::Info => (),
        }
        self.issues.push(issue);
    }

    /// The most severe severity present in the set, if any issues exist.
    pub fn worst_severity(&self) -> Option<Severity> {
        self.issues.iter().map(|i| i.severity()).max()
    }

    /// Logs all issues via `tracing` at levels matching their severities.
    pub fn log_all(&self) {
        for issue in &self.issues {
            issue.severity().log(&issue.to_string());
        }
    }
}

impl<T: Diagnostic> Extend<T> for IssueSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for issue in iter {
            self.add(issue);
        }
    }
}

impl<T: Diagnostic> FromIterator<T> for IssueSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<T> IntoIterator for IssueSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;
    fn into_iter(self) -> Self::IntoIter {
        self.issues.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a IssueSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.issues.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestIssue {
        msg: &'static str,
        severity: Severity,
    }

    impl Display for TestIssue {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.msg)
        }
    }

    impl Diagnostic for TestIssue {
        fn severity(&self) -> Severity {
            self.severity
        }
    }

    #[test]
    fn issue_set_counts() {
        let mut set = IssueSet::new();
        assert!(set.is_empty());
        set.add(TestIssue {
            msg: "informational",
            severity: Severity::Info,
        });
        set.add(TestIssue {
            msg: "watch out",
            severity: Severity::Warning,
        });
        set.add(TestIssue {
            msg: "broken",
            severity: Severity::Error,
        });
        assert_eq!(set.len(), 3);
        assert_eq!(set.num_errors(), 1);
        assert_eq!(set.num_warnings(), 1);
        assert!(set.has_error());
        assert_eq!(set.worst_severity(), Some(Severity::Error));
    }

    #[test]
    fn issue_set_from_iterator() {
        let set: IssueSet<TestIssue> = vec![
            TestIssue {
                msg: "a",
                severity: Severity::Warning,
            },
            TestIssue {
                msg: "b",
                severity: Severity::Warning,
            },
        ]
        .into_iter()
        .collect();
        assert_eq!(set.num_warnings(), 2);
        assert!(!set.has_error());
    }
}
