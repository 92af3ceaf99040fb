use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::{ProtoError, ProtoErrorKind};
use hickory_resolver::{ResolveError, TokioResolver};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// DNS record type code for TXT.
const TXT_TYPE: u16 = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("resolver returned HTTP status {status}")]
    Http { status: u16 },
    #[error("DNS query failed: {}", rcode_name(.rcode))]
    Query { rcode: u32 },
}

impl DnsError {
    pub fn nxdomain() -> Self {
        DnsError::Query { rcode: 3 }
    }

    pub fn servfail() -> Self {
        DnsError::Query { rcode: 2 }
    }
}

fn rcode_name(rcode: &u32) -> String {
    match *rcode {
        1 => "FORMERR".into(),
        2 => "SERVFAIL".into(),
        3 => "NXDOMAIN (domain does not exist)".into(),
        4 => "NOTIMP".into(),
        5 => "REFUSED".into(),
        other => format!("rcode {other}"),
    }
}

/// TXT lookup abstraction. Implementations return the unwrapped text of every
/// TXT answer in server order; a name without TXT answers yields `Ok(vec![])`.
pub trait DnsResolver: Clone + Send + Sync + 'static {
    fn query_txt(&self, domain: &str) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
}

/// DNS-over-HTTPS resolver speaking the JSON API (`application/dns-json`).
#[derive(Clone)]
pub struct DohResolver {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

impl DohResolver {
    pub const DEFAULT_ENDPOINT: &'static str = "https://cloudflare-dns.com/dns-query";

    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DnsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DnsError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

impl DnsResolver for DohResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        debug!(domain, endpoint = %self.endpoint, "DoH TXT query");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", domain), ("type", "TXT")])
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .await
            .map_err(|e| DnsError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DnsError::Http {
                status: status.as_u16(),
            });
        }

        let body: DohResponse = response
            .json()
            .await
            .map_err(|e| DnsError::Transport(e.to_string()))?;

        if body.status != 0 {
            return Err(DnsError::Query { rcode: body.status });
        }

        let records: Vec<String> = body
            .answer
            .iter()
            .filter(|a| a.record_type == TXT_TYPE)
            .map(|a| unquote_txt(&a.data))
            .collect();
        debug!(domain, count = records.len(), "DoH TXT answers");
        Ok(records)
    }
}

/// Unwrap the presentation form of TXT rdata returned by DoH providers.
///
/// `"v=spf1 a" " -all"` becomes `v=spf1 a -all`. Backslash escapes inside
/// quotes are resolved. Unquoted data is returned trimmed and unchanged.
pub fn unquote_txt(data: &str) -> String {
    let data = data.trim();
    if !data.starts_with('"') {
        return data.to_string();
    }

    let mut out = String::with_capacity(data.len());
    let mut in_quotes = false;
    let mut chars = data.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' if in_quotes => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            c if in_quotes => out.push(c),
            // whitespace between character-strings
            _ => {}
        }
    }
    out
}

/// System DNS resolver backed by hickory
#[derive(Clone)]
pub struct HickoryResolver {
    resolver: TokioResolver,
}

impl HickoryResolver {
    pub fn new() -> Self {
        Self::with_config(ResolverConfig::default(), ResolverOpts::default())
    }

    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Self {
        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();
        Self { resolver }
    }

    /// Map a hickory failure onto the crate's taxonomy. An empty answer for
    /// an existing name is not an error.
    fn classify_error(e: &ResolveError) -> Result<Vec<String>, DnsError> {
        if e.is_nx_domain() {
            return Err(DnsError::nxdomain());
        }
        let response_code = match e.proto().map(ProtoError::kind) {
            Some(ProtoErrorKind::NoRecordsFound { response_code, .. }) => *response_code,
            _ => return Err(DnsError::Transport(e.to_string())),
        };
        match response_code {
            ResponseCode::NoError => Ok(Vec::new()),
            ResponseCode::ServFail => Err(DnsError::servfail()),
            code => Err(DnsError::Query {
                rcode: u16::from(code).into(),
            }),
        }
    }
}

impl Default for HickoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsResolver for HickoryResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        debug!(domain, "system TXT query");
        match self.resolver.txt_lookup(domain).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|part| String::from_utf8_lossy(part))
                        .collect::<String>()
                })
                .collect()),
            Err(e) => Self::classify_error(&e),
        }
    }
}

/// Mock DNS resolver for testing
#[derive(Clone, Default)]
pub struct MockResolver {
    txt_records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    errors: Arc<Mutex<HashMap<String, DnsError>>>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_txt(&self, domain: &str, records: Vec<String>) {
        if let Ok(mut map) = self.txt_records.lock() {
            map.insert(domain.to_lowercase(), records);
        }
    }

    /// Convenience for the common single-record case.
    pub fn add_spf(&self, domain: &str, record: &str) {
        self.add_txt(domain, vec![record.to_string()]);
    }

    pub fn add_txt_err(&self, domain: &str, err: DnsError) {
        if let Ok(mut map) = self.errors.lock() {
            map.insert(domain.to_lowercase(), err);
        }
    }

    pub fn set_nxdomain(&self, domain: &str) {
        self.add_txt_err(domain, DnsError::nxdomain());
    }

    /// Domains queried so far, in query order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl DnsResolver for MockResolver {
    async fn query_txt(&self, domain: &str) -> Result<Vec<String>, DnsError> {
        let domain_lower = domain.to_lowercase();
        if let Ok(mut q) = self.queries.lock() {
            q.push(domain_lower.clone());
        }
        if let Some(err) = self.errors.lock().ok().and_then(|m| m.get(&domain_lower).cloned()) {
            return Err(err);
        }
        Ok(self
            .txt_records
            .lock()
            .ok()
            .and_then(|m| m.get(&domain_lower).cloned())
            .unwrap_or_default())
    }
}
