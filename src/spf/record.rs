//! SPF record scanning: term spans, include/redirect edges and direct cost.

use serde::Serialize;

use super::catalog::{explain, FALLBACK_EXPLANATION};
use super::mechanism::{Mechanism, MechanismKind};

/// One whitespace-delimited term of a record, with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MechanismSpan {
    /// Byte offset of the term in the record.
    pub start: usize,
    /// Byte offset one past the end of the term.
    pub end: usize,
    pub text: String,
    /// `None` for terms that are not a recognised mechanism.
    pub mechanism: Option<Mechanism>,
    pub explanation: &'static str,
}

impl MechanismSpan {
    fn new(start: usize, text: &str) -> Self {
        let mechanism = Mechanism::parse(text);
        let explanation = mechanism
            .as_ref()
            .map(|m| explain(m.catalog_key()))
            .unwrap_or(FALLBACK_EXPLANATION);
        Self {
            start,
            end: start + text.len(),
            text: text.to_string(),
            mechanism,
            explanation,
        }
    }

    pub fn is_known(&self) -> bool {
        self.mechanism.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Include,
    Redirect,
}

/// Reference from one record to another domain's SPF policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncludeEdge {
    pub kind: EdgeKind,
    pub domain: String,
}

impl IncludeEdge {
    pub fn include(domain: impl Into<String>) -> Self {
        Self {
            kind: EdgeKind::Include,
            domain: domain.into(),
        }
    }

    pub fn redirect(domain: impl Into<String>) -> Self {
        Self {
            kind: EdgeKind::Redirect,
            domain: domain.into(),
        }
    }
}

/// A scanned SPF record. Scanning never fails: anything unrecognised becomes
/// an unknown span.
#[derive(Debug, Clone)]
pub struct SpfRecord {
    pub raw: String,
    pub spans: Vec<MechanismSpan>,
}

impl SpfRecord {
    pub fn parse(txt: &str) -> Self {
        let spans = split_terms(txt)
            .into_iter()
            .enumerate()
            .filter(|(i, (_, term))| !(*i == 0 && term.eq_ignore_ascii_case("v=spf1")))
            .map(|(_, (start, term))| MechanismSpan::new(start, term))
            .collect();
        Self {
            raw: txt.to_string(),
            spans,
        }
    }

    /// Recognised mechanisms in order of appearance.
    pub fn mechanisms(&self) -> impl Iterator<Item = &Mechanism> {
        self.spans.iter().filter_map(|s| s.mechanism.as_ref())
    }

    /// Include edges in order of appearance, then redirect edges in order of
    /// appearance.
    pub fn edges(&self) -> Vec<IncludeEdge> {
        let targets = |kind: MechanismKind| {
            self.mechanisms()
                .filter(move |m| m.kind == kind)
                .filter_map(|m| m.argument.clone())
        };
        targets(MechanismKind::Include)
            .map(IncludeEdge::include)
            .chain(targets(MechanismKind::Redirect).map(IncludeEdge::redirect))
            .collect()
    }

    /// Include targets in order of appearance, duplicates kept.
    pub fn include_targets(&self) -> impl Iterator<Item = &str> {
        self.mechanisms().filter_map(Mechanism::include_target)
    }

    /// Lookups charged by this record's own terms, ignoring what the targets
    /// of its includes cost.
    pub fn direct_lookup_cost(&self) -> usize {
        self.mechanisms().map(Mechanism::lookup_cost).sum()
    }
}

/// Split on ASCII whitespace keeping the byte offset of each term.
fn split_terms(record: &str) -> Vec<(usize, &str)> {
    let mut terms = Vec::new();
    let mut start = None;
    for (i, c) in record.char_indices() {
        if c.is_ascii_whitespace() {
            if let Some(s) = start.take() {
                terms.push((s, &record[s..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        terms.push((s, &record[s..]));
    }
    terms
}

/// Include and redirect references of a record, includes first.
pub fn extract_edges(record: &str) -> Vec<IncludeEdge> {
    SpfRecord::parse(record).edges()
}

/// Every term of a record with its catalog explanation, for display.
pub fn classify_mechanisms(record: &str) -> Vec<MechanismSpan> {
    SpfRecord::parse(record).spans
}

/// Check if a TXT string is an SPF record (case-insensitive v=spf1 prefix).
pub fn is_spf_record(txt: &str) -> bool {
    let txt = txt.trim_start();
    match txt.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("v=spf1") => {
            txt.len() == 6 || txt.as_bytes()[6].is_ascii_whitespace()
        }
        _ => false,
    }
}
