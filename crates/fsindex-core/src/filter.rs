use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

/// The filter predicate external to the engine (spec §6): `is_filtered`
/// must be pure and cheap. Built once from CLI-supplied include/exclude
/// globs; matching is purely against the glob sets, no I/O.
///
/// A path is filtered when it matches any `exclude` pattern and does not
/// match any `include` pattern (an empty include set means "everything not
/// excluded is included").
#[derive(Clone)]
pub struct FilterConfig {
    include: GlobSet,
    exclude: GlobSet,
    has_include: bool,
}

impl FilterConfig {
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> anyhow::Result<Self> {
        let mut include = GlobSetBuilder::new();
        for pat in include_patterns {
            include.add(Glob::new(pat)?);
        }
        let mut exclude = GlobSetBuilder::new();
        for pat in exclude_patterns {
            exclude.add(Glob::new(pat)?);
        }

        Ok(FilterConfig {
            include: include.build()?,
            exclude: exclude.build()?,
            has_include: !include_patterns.is_empty(),
        })
    }

    /// No include/exclude patterns at all; nothing is ever filtered.
    pub fn empty() -> Self {
        FilterConfig {
            include: GlobSet::empty(),
            exclude: GlobSet::empty(),
            has_include: false,
        }
    }

    pub fn is_filtered(&self, path: &Path) -> bool {
        if self.exclude.is_match(path) {
            return true;
        }
        if self.has_include {
            return !self.include.is_match(path);
        }
        false
    }
}
