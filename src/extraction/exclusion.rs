use regex::{RegexSet, RegexSetBuilder};

use crate::config::ExclusionConfig;
use crate::error::SyncError;

/// Built-in patterns, matched case-insensitively against a node id or its
/// own text. Id patterns require a separator or the string edge around the
/// keyword so `nav-1` matches while `canvas` does not.
pub const DEFAULT_EXCLUSION_PATTERNS: &[&str] = &[
    // navigation
    r"(^|[-_.:/])nav(igation)?([-_.:/]|\d|$)",
    // tables of contents
    r"(^|[-_.:/])toc([-_.:/]|\d|$)",
    r"^\s*(table of )?contents\s*$",
    // running headers and footers
    r"(^|[-_.:/])(running-?|page-?)?(header|footer)s?([-_.:/]|\d|$)",
    // page numbers
    r"(^|[-_.:/])page-?(num|number|no)([-_.:/]|\d|$)",
    r"^\s*(page\s+)?\d+(\s*(of|/)\s*\d+)?\s*$",
    // metadata
    r"(^|[-_.:/])meta(data)?([-_.:/]|\d|$)",
    r"^\s*(copyright\s+(\x{a9}|\(c\)|\d{4})|\x{a9}\s*\d{4}|isbn(-1[03])?:?\s*[\dx-]{10,})",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// Explicit "do not read aloud" flag on the node.
    Flagged,
    /// Id or text matched an exclusion pattern.
    Pattern,
}

impl ExclusionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::Flagged => "flagged",
            ExclusionReason::Pattern => "pattern",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    patterns: RegexSet,
}

impl ExclusionPolicy {
    pub fn from_config(config: &ExclusionConfig) -> Result<Self, SyncError> {
        let defaults: &[&str] = if config.use_default_patterns {
            DEFAULT_EXCLUSION_PATTERNS
        } else {
            &[]
        };
        let patterns = defaults
            .iter()
            .copied()
            .chain(config.patterns.iter().map(String::as_str));
        let patterns = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(SyncError::pattern)?;
        Ok(Self { patterns })
    }

    /// Policy that only honours the per-node flag.
    pub fn flag_only() -> Self {
        Self {
            patterns: RegexSet::empty(),
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Exclusion reason for a node, if any. `text` is `None` for nodes whose
    /// text must not be pattern-checked, such as words of running prose.
    pub fn verdict(
        &self,
        id: Option<&str>,
        text: Option<&str>,
        no_read_aloud: bool,
    ) -> Option<ExclusionReason> {
        if no_read_aloud {
            return Some(ExclusionReason::Flagged);
        }
        let id_matches = id.is_some_and(|id| self.patterns.is_match(id));
        let text_matches = text
            .filter(|text| !text.trim().is_empty())
            .is_some_and(|text| self.patterns.is_match(text));
        if id_matches || text_matches {
            return Some(ExclusionReason::Pattern);
        }
        None
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::flag_only()
    }
}
