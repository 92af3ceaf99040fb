//! Human-readable explanations for SPF mechanisms.

/// Returned for any token the catalog does not know.
pub const FALLBACK_EXPLANATION: &str = "SPF mechanism";

const CATALOG: &[(&str, &str)] = &[
    (
        "include:",
        "Include: authorizes the senders listed in another domain's SPF record (1 DNS lookup)",
    ),
    (
        "redirect=",
        "Redirect: uses another domain's SPF record when no mechanism here matches (1 DNS lookup)",
    ),
    (
        "ip4:",
        "IPv4: authorizes an IPv4 address or CIDR range (no DNS lookup)",
    ),
    (
        "ip6:",
        "IPv6: authorizes an IPv6 address or CIDR range (no DNS lookup)",
    ),
    (
        "a",
        "A: authorizes the addresses in the domain's A/AAAA records (1 DNS lookup)",
    ),
    (
        "mx",
        "MX: authorizes the domain's mail exchangers (1 DNS lookup)",
    ),
    (
        "ptr",
        "PTR: authorizes hosts whose reverse DNS matches the domain; slow and discouraged by RFC 7208 (1 DNS lookup)",
    ),
    (
        "exists",
        "Exists: matches when the given name has an A record (1 DNS lookup)",
    ),
    (
        "-all",
        "Fail: mail from any other sender should be rejected",
    ),
    (
        "~all",
        "Soft fail: mail from any other sender should be accepted but marked",
    ),
    (
        "?all",
        "Neutral: no assertion is made about other senders",
    ),
    (
        "+all",
        "Pass: any sender is allowed, which makes the record ineffective",
    ),
];

/// Explanation for a catalog token such as `include:` or `~all`.
///
/// Matching ignores ASCII case. Unknown tokens get [`FALLBACK_EXPLANATION`].
pub fn explain(token: &str) -> &'static str {
    CATALOG
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(token))
        .map(|(_, text)| *text)
        .unwrap_or(FALLBACK_EXPLANATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spf::mechanism::Mechanism;

    #[test]
    fn known_tokens_have_specific_text() {
        for (token, _) in CATALOG {
            assert_ne!(explain(token), FALLBACK_EXPLANATION, "{token}");
        }
        assert!(explain("include:").starts_with("Include"));
        assert!(explain("~all").starts_with("Soft fail"));
    }

    #[test]
    fn unknown_token_falls_back() {
        assert_eq!(explain("foo:bar"), FALLBACK_EXPLANATION);
        assert_eq!(explain(""), FALLBACK_EXPLANATION);
        assert_eq!(explain("include"), FALLBACK_EXPLANATION);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(explain("MX"), explain("mx"));
        assert_eq!(explain("-ALL"), explain("-all"));
    }

    #[test]
    fn every_mechanism_key_is_catalogued() {
        for term in [
            "include:a.com",
            "redirect=a.com",
            "ip4:1.2.3.4",
            "ip6:::1",
            "a",
            "mx",
            "ptr",
            "exists:a.com",
            "-all",
            "~all",
            "?all",
            "all",
        ] {
            let mechanism = Mechanism::parse(term).unwrap();
            assert_ne!(explain(mechanism.catalog_key()), FALLBACK_EXPLANATION, "{term}");
        }
    }
}
