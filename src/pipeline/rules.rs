//! Keyword rules engine for candidate evaluation.
//!
//! Rules are checked in priority order and the first one that fires decides:
//! - name exclusion → Reject
//! - school match → Approve
//! - shared interest or biography match → Approve
//!
//! If nothing fires the candidate is rejected with "nothing matched".
//! Matching is case-insensitive substring search.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::pipeline::types::{Candidate, Decision};

/// Reason given when no rule fires.
pub const NOTHING_MATCHED: &str = "nothing matched";

/// Keyword lists loaded from the filter file.
///
/// Every list is optional in the file; an absent list never matches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRules {
    #[serde(rename = "ExcludeName", default)]
    pub exclude_names: Vec<String>,
    #[serde(rename = "Schools", default)]
    pub schools: Vec<String>,
    #[serde(rename = "CommonInterests", default)]
    pub interests: Vec<String>,
}

impl FilterRules {
    /// Read, parse and validate a JSON filter file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::FilterRead {
            path: path.to_path_buf(),
            source,
        })?;
        let rules: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigError::FilterParse {
                path: path.to_path_buf(),
                source,
            })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject blank keys: an empty substring would match every candidate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let lists: [(&'static str, &[String]); 3] = [
            ("ExcludeName", &self.exclude_names),
            ("Schools", &self.schools),
            ("CommonInterests", &self.interests),
        ];
        for (list, keys) in lists {
            if let Some(index) = keys.iter().position(|k| k.trim().is_empty()) {
                return Err(ConfigError::BlankFilterKey { list, index });
            }
        }
        Ok(())
    }
}

/// Category of a keyword rule. Also fixes the reason prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    NameExclusion,
    School,
    Interest,
}

impl RuleKind {
    fn reason_prefix(self) -> &'static str {
        match self {
            Self::NameExclusion => "name exclusion",
            Self::School => "school matched",
            Self::Interest => "interest matched",
        }
    }

    fn approves(self) -> bool {
        !matches!(self, Self::NameExclusion)
    }
}

/// Which candidate field a rule scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleField {
    Name,
    Schools,
    Interests,
    Bio,
}

impl RuleField {
    fn values(self, candidate: &Candidate) -> &[String] {
        match self {
            Self::Name => std::slice::from_ref(&candidate.name),
            Self::Schools => &candidate.schools,
            Self::Interests => &candidate.interests,
            Self::Bio => std::slice::from_ref(&candidate.bio),
        }
    }
}

/// A keyword with its lowercase form precomputed.
#[derive(Debug, Clone)]
struct Key {
    original: String,
    folded: String,
}

/// One category of keys, the fields it scans and the verdict it produces.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    kind: RuleKind,
    /// Scanned in this order; the first matching value wins.
    fields: &'static [RuleField],
    keys: Vec<Key>,
}

impl KeywordRule {
    pub fn new(kind: RuleKind, fields: &'static [RuleField], keys: &[String]) -> Self {
        let keys = keys
            .iter()
            .map(|k| Key {
                original: k.clone(),
                folded: k.to_lowercase(),
            })
            .collect();
        Self { kind, fields, keys }
    }

    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    /// Return the first key contained in any scanned value.
    ///
    /// Values are the outer loop and keys the inner one, so an earlier
    /// school beats an earlier key.
    fn first_match(&self, candidate: &Candidate) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }
        self.fields
            .iter()
            .flat_map(|field| field.values(candidate))
            .find_map(|value| {
                let value = value.to_lowercase();
                self.keys
                    .iter()
                    .find(|key| value.contains(&key.folded))
                    .map(|key| key.original.as_str())
            })
    }

    fn decide(&self, candidate: &Candidate) -> Option<Decision> {
        let key = self.first_match(candidate)?;
        let reason = format!("{}: {}", self.kind.reason_prefix(), key);
        Some(if self.kind.approves() {
            Decision::approve(reason)
        } else {
            Decision::reject(reason)
        })
    }
}

/// Ordered keyword rules. Read-only once built, safe to share across tasks.
#[derive(Debug, Clone)]
pub struct RulesEngine {
    rules: Vec<KeywordRule>,
}

impl RulesEngine {
    /// Build the standard priority list from filter keys.
    pub fn from_rules(filter: &FilterRules) -> Self {
        let rules = vec![
            KeywordRule::new(
                RuleKind::NameExclusion,
                &[RuleField::Name],
                &filter.exclude_names,
            ),
            KeywordRule::new(RuleKind::School, &[RuleField::Schools], &filter.schools),
            KeywordRule::new(
                RuleKind::Interest,
                &[RuleField::Interests, RuleField::Bio],
                &filter.interests,
            ),
        ];
        Self { rules }
    }

    /// Create an empty engine that rejects everything.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones.
    pub fn push_rule(&mut self, rule: KeywordRule) {
        self.rules.push(rule);
    }

    /// Evaluate a candidate. Pure: same input, same decision.
    pub fn evaluate(&self, candidate: &Candidate) -> Decision {
        for rule in &self.rules {
            if let Some(decision) = rule.decide(candidate) {
                debug!(
                    id = %candidate.id,
                    rule = ?rule.kind(),
                    reason = %decision.reason(),
                    "Candidate matched rule"
                );
                return decision;
            }
        }
        Decision::reject(NOTHING_MATCHED)
    }
}

/// Evaluate a candidate against filter keys with the standard priority list.
pub fn evaluate(candidate: &Candidate, filter: &FilterRules) -> Decision {
    RulesEngine::from_rules(filter).evaluate(candidate)
}
