//! SPF record inspection: mechanism classification, include graph and
//! DNS-lookup budget (RFC 7208).

pub mod catalog;
mod check;
mod count;
mod lookup;
mod mechanism;
mod record;

pub use catalog::{explain, FALLBACK_EXPLANATION};
pub use check::{
    BudgetStatus, CheckError, CheckPhase, CheckerConfig, SpfChecker, SpfReport, RFC_LOOKUP_LIMIT,
};
pub use count::{
    count_lookups, tally_lookups, LookupTally, UnresolvedInclude, VisitedSet, MAX_INCLUDE_DEPTH,
};
pub use lookup::{fetch_first_or_message, resolve_spf};
pub use mechanism::{Mechanism, MechanismKind, Qualifier};
pub use record::{
    classify_mechanisms, extract_edges, is_spf_record, EdgeKind, IncludeEdge, MechanismSpan,
    SpfRecord,
};
