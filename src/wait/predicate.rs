//! Predicates over screen content

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::Result;
use crate::screen::ScreenSnapshot;

type TestFn = dyn Fn(&ScreenSnapshot) -> bool + Send + Sync;

/// A pure test over a [`ScreenSnapshot`]
///
/// Waiters may evaluate a predicate many times on the same or successive
/// snapshots, so it must not have side effects.
#[derive(Clone)]
pub struct ScreenPredicate {
    description: String,
    test: Arc<TestFn>,
}

impl ScreenPredicate {
    /// Wrap an arbitrary closure
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&ScreenSnapshot) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    /// Some line contains `needle`
    pub fn contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        let description = format!("screen contains {:?}", needle);
        Self::new(description, move |snapshot| snapshot.contains(&needle))
    }

    /// Some line matches `pattern`
    pub fn regex(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)?;
        let description = format!("screen matches /{}/", pattern);
        Ok(Self::new(description, move |snapshot| {
            snapshot.lines().any(|line| re.is_match(line))
        }))
    }

    /// Some line equals `text`, ignoring trailing whitespace
    pub fn line_equals(text: impl Into<String>) -> Self {
        let text = text.into();
        let description = format!("a line equals {:?}", text);
        Self::new(description, move |snapshot| {
            snapshot.lines().any(|line| line.trim_end() == text)
        })
    }

    /// The last non-blank line ends with `suffix` (typically a prompt)
    pub fn last_line_ends_with(suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        let description = format!("last line ends with {:?}", suffix);
        Self::new(description, move |snapshot| {
            snapshot
                .non_empty_lines()
                .last()
                .is_some_and(|(_, line)| line.trim_end().ends_with(suffix.as_str()))
        })
    }

    /// Holds when `self` does not
    pub fn negate(self) -> Self {
        let description = format!("not ({})", self.description);
        let inner = self.test;
        Self {
            description,
            test: Arc::new(move |snapshot| !inner(snapshot)),
        }
    }

    pub fn evaluate(&self, snapshot: &ScreenSnapshot) -> bool {
        (self.test)(snapshot)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for ScreenPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenPredicate")
            .field("description", &self.description)
            .finish()
    }
}

impl fmt::Display for ScreenPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
