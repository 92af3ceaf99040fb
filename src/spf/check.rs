//! End-to-end SPF check of one domain.
//!
//! A check moves through `Idle -> Validating -> Resolving`, then ends in
//! `NotFound`, `Failed`, or `CountingLookups -> Ready`.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::common::dns::{DnsError, DnsResolver, DohResolver};
use crate::common::domain::{validate_domain, DomainError};

use super::count::{tally_lookups, UnresolvedInclude, VisitedSet};
use super::lookup::{fetch_first_or_message, resolve_spf};
use super::record::{IncludeEdge, MechanismSpan, SpfRecord};

/// RFC 7208 Section 4.6.4 limit on DNS-querying terms.
pub const RFC_LOOKUP_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPhase {
    Idle,
    Validating,
    Resolving,
    NotFound,
    CountingLookups,
    Ready,
    Failed,
}

impl CheckPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, CheckPhase::NotFound | CheckPhase::Ready | CheckPhase::Failed)
    }
}

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("invalid domain: {0}")]
    InvalidDomain(#[from] DomainError),
    #[error("could not resolve {domain}: {source}")]
    Resolution { domain: String, source: DnsError },
    #[error("no SPF record found for {domain}")]
    NoSpfRecord { domain: String },
}

impl CheckError {
    /// Terminal phase this failure leaves the check in.
    pub fn phase(&self) -> CheckPhase {
        match self {
            CheckError::NoSpfRecord { .. } => CheckPhase::NotFound,
            CheckError::InvalidDomain(_) | CheckError::Resolution { .. } => CheckPhase::Failed,
        }
    }

    /// Longer explanation to show next to the error message.
    pub fn detail(&self) -> &'static str {
        match self {
            CheckError::InvalidDomain(_) => {
                "Enter a bare domain name such as example.com, without protocol, path or email local part."
            }
            CheckError::Resolution { source, .. } => match source {
                DnsError::Query { rcode: 3 } => "The domain does not exist in DNS.",
                DnsError::Query { .. } => "The DNS server reported a failure while looking up this domain.",
                DnsError::Http { .. } | DnsError::Transport(_) => {
                    "The DNS resolver could not be reached or returned an error. Try again later."
                }
            },
            CheckError::NoSpfRecord { .. } => {
                "The domain publishes no TXT record starting with v=spf1, so receivers cannot tell which servers may send its mail."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    Within,
    Exceeded,
}

/// Everything a front end needs to render one checked domain.
#[derive(Debug, Clone, Serialize)]
pub struct SpfReport {
    pub domain: String,
    /// All SPF records published by the domain, in server order.
    pub records: Vec<String>,
    /// The record that was evaluated (the first one).
    pub record: String,
    /// RFC 7208 treats more than one SPF record as a permanent error.
    pub multiple_records: bool,
    pub lookup_count: usize,
    pub lookup_limit: usize,
    pub budget_status: BudgetStatus,
    pub edges: Vec<IncludeEdge>,
    pub mechanisms: Vec<MechanismSpan>,
    pub unresolved_includes: Vec<UnresolvedInclude>,
    pub depth_limited: bool,
}

impl SpfReport {
    pub fn exceeds_limit(&self) -> bool {
        self.budget_status == BudgetStatus::Exceeded
    }
}

/// Settings for building a checker backed by DNS-over-HTTPS.
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    pub resolver_url: String,
    pub timeout: Duration,
    pub lookup_limit: usize,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            resolver_url: DohResolver::DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(5),
            lookup_limit: RFC_LOOKUP_LIMIT,
        }
    }
}

pub struct SpfChecker<R: DnsResolver> {
    resolver: R,
    lookup_limit: usize,
}

impl SpfChecker<DohResolver> {
    pub fn from_config(config: &CheckerConfig) -> Result<Self, DnsError> {
        let resolver = DohResolver::new(config.resolver_url.clone(), config.timeout)?;
        Ok(Self::new(resolver).lookup_limit(config.lookup_limit))
    }
}

impl<R: DnsResolver> SpfChecker<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            lookup_limit: RFC_LOOKUP_LIMIT,
        }
    }

    /// Lookup count above which a report is marked as over budget.
    pub fn lookup_limit(mut self, limit: usize) -> Self {
        self.lookup_limit = limit;
        self
    }

    /// Validate `domain`, fetch its SPF record and evaluate it.
    pub async fn check(&self, domain: &str) -> Result<SpfReport, CheckError> {
        enter(domain, CheckPhase::Idle);
        enter(domain, CheckPhase::Validating);
        let domain = validate_domain(domain).inspect_err(|e| {
            debug!(error = %e, "domain rejected");
            enter(domain, CheckPhase::Failed);
        })?;

        enter(&domain, CheckPhase::Resolving);
        let records = resolve_spf(&self.resolver, &domain).await.map_err(|source| {
            enter(&domain, CheckPhase::Failed);
            CheckError::Resolution {
                domain: domain.clone(),
                source,
            }
        })?;
        let Some(first) = records.first().cloned() else {
            enter(&domain, CheckPhase::NotFound);
            return Err(CheckError::NoSpfRecord { domain });
        };

        enter(&domain, CheckPhase::CountingLookups);
        let mut visited = VisitedSet::with_root(&domain);
        let tally = tally_lookups(&self.resolver, &first, &mut visited, 0).await;
        let parsed = SpfRecord::parse(&first);

        let budget_status = if tally.total > self.lookup_limit {
            BudgetStatus::Exceeded
        } else {
            BudgetStatus::Within
        };
        info!(
            domain = %domain,
            lookups = tally.total,
            limit = self.lookup_limit,
            "SPF check complete"
        );
        enter(&domain, CheckPhase::Ready);

        Ok(SpfReport {
            multiple_records: records.len() > 1,
            edges: parsed.edges(),
            mechanisms: parsed.spans,
            record: first,
            records,
            lookup_count: tally.total,
            lookup_limit: self.lookup_limit,
            budget_status,
            unresolved_includes: tally.unresolved,
            depth_limited: tally.depth_limited,
            domain,
        })
    }

    /// First SPF record of an included domain, or a displayable message.
    pub async fn fetch_first_or_message(&self, domain: &str) -> String {
        fetch_first_or_message(&self.resolver, domain).await
    }
}

fn enter(domain: &str, phase: CheckPhase) {
    if phase.is_terminal() {
        debug!(domain, ?phase, "SPF check finished");
    } else {
        debug!(domain, ?phase, "SPF check phase");
    }
}
