use tracing::debug;

use crate::common::dns::{DnsError, DnsResolver};

use super::record::is_spf_record;

/// Query DNS TXT records for a domain and keep those that are SPF records,
/// in server order.
///
/// - No TXT answers, or none matching `v=spf1` → `Ok(vec![])`
/// - Transport, HTTP or DNS status failures → the resolver's `DnsError`
pub async fn resolve_spf<R: DnsResolver>(resolver: &R, domain: &str) -> Result<Vec<String>, DnsError> {
    let txt_records = resolver.query_txt(domain).await?;
    let spf_records: Vec<String> = txt_records
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| is_spf_record(s))
        .collect();
    debug!(domain, count = spf_records.len(), "SPF records resolved");
    Ok(spf_records)
}

/// First SPF record of `domain`, or a message describing why there is none.
/// Used for interactive drill-down into included domains.
pub async fn fetch_first_or_message<R: DnsResolver>(resolver: &R, domain: &str) -> String {
    match resolve_spf(resolver, domain).await {
        Ok(records) => records
            .into_iter()
            .next()
            .unwrap_or_else(|| format!("No SPF record found for {domain}")),
        Err(e) => format!("Error fetching SPF record for {domain}: {e}"),
    }
}
