use std::collections::HashSet;

use serde::Deserialize;

use crate::errors::{BindError, Result};

/// Knobs for a [`crate::Binder`]. Loadable from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BindOptions {
    /// Fall back to declared field names for pre-decoded mappings even when a
    /// field carries a tag.
    pub name_fallback: bool,
    /// Fold case of non-ASCII keys with full Unicode lowercasing.
    pub unicode_case_fold: bool,
    /// Extra chrono layouts tried after the built-in ones.
    pub time_layouts: Vec<String>,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            name_fallback: true,
            unicode_case_fold: false,
            time_layouts: Vec::new(),
        }
    }
}

impl BindOptions {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| BindError::UnsupportedSource(format!("invalid options: {e}")))
    }

    pub fn policy(&self) -> MatchPolicy {
        MatchPolicy {
            name_fallback: self.name_fallback,
            unicode_case_fold: self.unicode_case_fold,
        }
    }
}

/// Which matching rules are in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    pub name_fallback: bool,
    pub unicode_case_fold: bool,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        BindOptions::default().policy()
    }
}

impl MatchPolicy {
    /// Policy for values decoded from raw text: tags are authoritative.
    pub fn strict(self) -> Self {
        Self {
            name_fallback: false,
            ..self
        }
    }
}

/// Per-call state threaded through the recursive descent.
#[derive(Debug, Default)]
pub struct Context {
    pub(crate) policy: MatchPolicy,
    pub(crate) time_layouts: Vec<String>,
    visiting: HashSet<(usize, usize)>,
}

impl Context {
    pub fn new(options: &BindOptions) -> Self {
        Self {
            policy: options.policy(),
            time_layouts: options.time_layouts.clone(),
            visiting: HashSet::new(),
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Runs `f` with `policy` in effect, restoring the previous one afterwards.
    pub(crate) fn with_policy<T>(
        &mut self,
        policy: MatchPolicy,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.policy, policy);
        let out = f(self);
        self.policy = saved;
        out
    }

    /// Marks a (source, destination) pair as in progress. Returns false when
    /// the pair is already being bound further up the stack.
    pub(crate) fn enter(&mut self, source: usize, dest: usize) -> bool {
        self.visiting.insert((source, dest))
    }

    pub(crate) fn leave(&mut self, source: usize, dest: usize) {
        self.visiting.remove(&(source, dest));
    }
}
