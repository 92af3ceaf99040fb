//! SPF record inspector.
//!
//! Fetches a domain's SPF policy, annotates every term, follows `include:`
//! chains and estimates the RFC 7208 DNS-lookup cost. DNS access goes through
//! the `DnsResolver` trait; DNS-over-HTTPS and system-resolver backends are
//! provided.

pub mod common;
pub mod spf;

pub use common::dns::{DnsError, DnsResolver, DohResolver, HickoryResolver, MockResolver};
pub use common::domain::{validate_domain, DomainError};
pub use spf::{CheckError, CheckerConfig, SpfChecker, SpfReport};
