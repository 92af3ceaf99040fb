//! DNS-lookup cost of an SPF record and everything it includes.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::common::dns::DnsResolver;
use crate::common::domain::normalize;

use super::lookup::resolve_spf;
use super::record::SpfRecord;

/// Include nesting deeper than this is not evaluated.
pub const MAX_INCLUDE_DEPTH: usize = 10;

/// Domains already claimed by one counting traversal.
#[derive(Debug, Clone, Default)]
pub struct VisitedSet {
    domains: HashSet<String>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A set that already holds the domain being checked, so that an include
    /// chain leading back to it is not counted a second time.
    pub fn with_root(domain: &str) -> Self {
        let mut set = Self::new();
        set.claim(domain);
        set
    }

    /// Returns `true` if `domain` was not visited before.
    pub fn claim(&mut self, domain: &str) -> bool {
        self.domains.insert(normalize(domain))
    }
}

/// A nested include whose record could not be fetched. It contributes
/// nothing to the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedInclude {
    pub domain: String,
    pub reason: String,
}

/// Outcome of a counting traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LookupTally {
    pub total: usize,
    /// Includes that were resolved and counted, in visiting order.
    pub resolved: Vec<String>,
    pub unresolved: Vec<UnresolvedInclude>,
    /// Set when an include sat deeper than [`MAX_INCLUDE_DEPTH`].
    pub depth_limited: bool,
}

struct Frame {
    targets: Vec<String>,
    next: usize,
    depth: usize,
}

impl Frame {
    fn new(record: &SpfRecord, depth: usize) -> Self {
        Self {
            targets: record.include_targets().map(str::to_string).collect(),
            next: 0,
            depth,
        }
    }
}

/// DNS lookups charged for `record` plus the records it includes.
///
/// Sub-resolution failures are swallowed and count as zero.
pub async fn count_lookups<R: DnsResolver>(
    resolver: &R,
    record: &str,
    visited: &mut VisitedSet,
    depth: usize,
) -> usize {
    tally_lookups(resolver, record, visited, depth).await.total
}

/// Like [`count_lookups`], also reporting what the traversal touched.
///
/// Each record costs one lookup per `include`, `redirect`, `a`, `mx`, `ptr`
/// and `exists` term. Include targets are then followed depth-first in order
/// of appearance, each domain at most once per `visited` set. Redirect
/// targets are charged but not followed. Resolution is sequential, one
/// request in flight at a time.
pub async fn tally_lookups<R: DnsResolver>(
    resolver: &R,
    record: &str,
    visited: &mut VisitedSet,
    depth: usize,
) -> LookupTally {
    let mut tally = LookupTally::default();
    if depth > MAX_INCLUDE_DEPTH {
        tally.depth_limited = true;
        return tally;
    }

    let root = SpfRecord::parse(record);
    tally.total += root.direct_lookup_cost();
    let mut stack = vec![Frame::new(&root, depth)];

    loop {
        let (domain, child_depth) = match stack.last_mut() {
            None => break,
            Some(frame) => match frame.targets.get(frame.next) {
                None => {
                    stack.pop();
                    continue;
                }
                Some(domain) => {
                    frame.next += 1;
                    (domain.clone(), frame.depth + 1)
                }
            },
        };

        if !visited.claim(&domain) {
            debug!(domain = %domain, "include already counted");
            continue;
        }
        if child_depth > MAX_INCLUDE_DEPTH {
            debug!(domain = %domain, depth = child_depth, "include nesting too deep");
            tally.depth_limited = true;
            continue;
        }

        let records = match resolve_spf(resolver, &domain).await {
            Ok(records) => records,
            Err(e) => {
                warn!(domain = %domain, error = %e, "nested SPF lookup failed");
                tally.unresolved.push(UnresolvedInclude {
                    domain,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let Some(first) = records.first() else {
            debug!(domain = %domain, "included domain has no SPF record");
            tally.unresolved.push(UnresolvedInclude {
                domain,
                reason: "no SPF record".into(),
            });
            continue;
        };

        let nested = SpfRecord::parse(first);
        let cost = nested.direct_lookup_cost();
        debug!(domain = %domain, depth = child_depth, cost, "counting included record");
        tally.total += cost;
        tally.resolved.push(domain);
        stack.push(Frame::new(&nested, child_depth));
    }

    tally
}
