//! SPF mechanism and qualifier types (RFC 7208 Section 5).
//!
//! Terms are classified whole, one whitespace-delimited term at a time, with a
//! fixed precedence: `include:`, `redirect=`, `ip4:`/`ip6:`, `all`, then
//! `a`/`mx`/`ptr`/`exists`.

use std::fmt;

use serde::Serialize;

/// Qualifier prefix on a directive. Defaults to Pass if omitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Qualifier {
    Pass,     // +
    Fail,     // -
    SoftFail, // ~
    Neutral,  // ?
}

impl Qualifier {
    /// Parse a single-char qualifier prefix. Returns (Qualifier, remaining str).
    /// If no qualifier prefix, defaults to Pass.
    pub fn parse_prefix(s: &str) -> (Qualifier, &str) {
        match s.as_bytes().first() {
            Some(b'+') => (Qualifier::Pass, &s[1..]),
            Some(b'-') => (Qualifier::Fail, &s[1..]),
            Some(b'~') => (Qualifier::SoftFail, &s[1..]),
            Some(b'?') => (Qualifier::Neutral, &s[1..]),
            _ => (Qualifier::Pass, s),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Qualifier::Pass => '+',
            Qualifier::Fail => '-',
            Qualifier::SoftFail => '~',
            Qualifier::Neutral => '?',
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// What a term does. Only `all` keeps its qualifier; other mechanisms are
/// displayed and counted the same regardless of prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MechanismKind {
    Include,
    Redirect,
    Ip4,
    Ip6,
    A,
    Mx,
    Ptr,
    Exists,
    All(Qualifier),
}

/// A classified SPF term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mechanism {
    pub kind: MechanismKind,
    /// Domain for include/redirect/exists, network for ip4/ip6, optional
    /// domain-spec and/or CIDR suffix for a/mx/ptr.
    pub argument: Option<String>,
}

impl Mechanism {
    pub fn new(kind: MechanismKind, argument: Option<&str>) -> Self {
        Self {
            kind,
            argument: argument.map(str::to_string),
        }
    }

    /// Classify one whitespace-free term. Returns `None` for anything that is
    /// not a recognised mechanism: unknown names, modifiers other than
    /// `redirect=`, and mechanisms missing a required argument.
    pub fn parse(term: &str) -> Option<Self> {
        let lower_term = term.to_ascii_lowercase();
        let (qualifier, body) = Qualifier::parse_prefix(term);
        let lower = body.to_ascii_lowercase();

        if let Some(domain) = required_argument(&lower, body, "include:") {
            return Some(Self::new(MechanismKind::Include, Some(domain)));
        }
        // modifiers never carry a qualifier
        if let Some(domain) = required_argument(&lower_term, term, "redirect=") {
            return Some(Self::new(MechanismKind::Redirect, Some(domain)));
        }
        if let Some(network) = required_argument(&lower, body, "ip4:") {
            return Some(Self::new(MechanismKind::Ip4, Some(network)));
        }
        if let Some(network) = required_argument(&lower, body, "ip6:") {
            return Some(Self::new(MechanismKind::Ip6, Some(network)));
        }
        if lower == "all" {
            return Some(Self::new(MechanismKind::All(qualifier), None));
        }
        for (name, kind) in [
            ("a", MechanismKind::A),
            ("mx", MechanismKind::Mx),
            ("ptr", MechanismKind::Ptr),
        ] {
            if let Some(argument) = optional_argument(&lower, body, name) {
                return Some(Self::new(kind, argument));
            }
        }
        if let Some(domain) = required_argument(&lower, body, "exists:") {
            return Some(Self::new(MechanismKind::Exists, Some(domain)));
        }
        None
    }

    /// DNS lookups RFC 7208 charges for evaluating this term itself.
    pub fn lookup_cost(&self) -> usize {
        match self.kind {
            MechanismKind::Include
            | MechanismKind::Redirect
            | MechanismKind::A
            | MechanismKind::Mx
            | MechanismKind::Ptr
            | MechanismKind::Exists => 1,
            MechanismKind::Ip4 | MechanismKind::Ip6 | MechanismKind::All(_) => 0,
        }
    }

    /// Key of this mechanism in the explanation catalog.
    pub fn catalog_key(&self) -> &'static str {
        match self.kind {
            MechanismKind::Include => "include:",
            MechanismKind::Redirect => "redirect=",
            MechanismKind::Ip4 => "ip4:",
            MechanismKind::Ip6 => "ip6:",
            MechanismKind::A => "a",
            MechanismKind::Mx => "mx",
            MechanismKind::Ptr => "ptr",
            MechanismKind::Exists => "exists",
            MechanismKind::All(Qualifier::Pass) => "+all",
            MechanismKind::All(Qualifier::Fail) => "-all",
            MechanismKind::All(Qualifier::SoftFail) => "~all",
            MechanismKind::All(Qualifier::Neutral) => "?all",
        }
    }

    /// Target domain of an `include:` mechanism.
    pub fn include_target(&self) -> Option<&str> {
        match self.kind {
            MechanismKind::Include => self.argument.as_deref(),
            _ => None,
        }
    }
}

/// `prefix` followed by a non-empty argument.
fn required_argument<'a>(lower: &str, original: &'a str, prefix: &str) -> Option<&'a str> {
    if lower.starts_with(prefix) && original.len() > prefix.len() {
        Some(&original[prefix.len()..])
    } else {
        None
    }
}

/// `name` alone, `name:<arg>` or `name/<cidr>`. The outer option reports a
/// match, the inner one the argument.
fn optional_argument<'a>(lower: &str, original: &'a str, name: &str) -> Option<Option<&'a str>> {
    if lower == name {
        return Some(None);
    }
    let rest = lower.strip_prefix(name)?;
    if let Some(arg) = rest.strip_prefix(':') {
        if arg.is_empty() {
            return None;
        }
        return Some(Some(&original[name.len() + 1..]));
    }
    if rest.starts_with('/') && rest.len() > 1 {
        return Some(Some(&original[name.len()..]));
    }
    None
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arg = self.argument.as_deref().unwrap_or("");
        match self.kind {
            MechanismKind::Include => write!(f, "include:{arg}"),
            MechanismKind::Redirect => write!(f, "redirect={arg}"),
            MechanismKind::Ip4 => write!(f, "ip4:{arg}"),
            MechanismKind::Ip6 => write!(f, "ip6:{arg}"),
            MechanismKind::Exists => write!(f, "exists:{arg}"),
            MechanismKind::All(q) => write!(f, "{q}all"),
            MechanismKind::A | MechanismKind::Mx | MechanismKind::Ptr => {
                let name = match self.kind {
                    MechanismKind::A => "a",
                    MechanismKind::Mx => "mx",
                    _ => "ptr",
                };
                match self.argument.as_deref() {
                    None => write!(f, "{name}"),
                    Some(cidr) if cidr.starts_with('/') => write!(f, "{name}{cidr}"),
                    Some(domain) => write!(f, "{name}:{domain}"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(term: &str) -> Mechanism {
        Mechanism::parse(term).unwrap_or_else(|| panic!("{term} should classify"))
    }

    // ---- Qualifier ----

    #[test]
    fn qualifier_parse_explicit() {
        assert_eq!(Qualifier::parse_prefix("+all"), (Qualifier::Pass, "all"));
        assert_eq!(Qualifier::parse_prefix("-all"), (Qualifier::Fail, "all"));
        assert_eq!(Qualifier::parse_prefix("~all"), (Qualifier::SoftFail, "all"));
        assert_eq!(Qualifier::parse_prefix("?all"), (Qualifier::Neutral, "all"));
    }

    #[test]
    fn qualifier_parse_default() {
        assert_eq!(Qualifier::parse_prefix("all"), (Qualifier::Pass, "all"));
        assert_eq!(
            Qualifier::parse_prefix("include:x"),
            (Qualifier::Pass, "include:x")
        );
    }

    // ---- all ----

    #[test]
    fn parse_all_qualifiers() {
        assert_eq!(parse("-all").kind, MechanismKind::All(Qualifier::Fail));
        assert_eq!(parse("~all").kind, MechanismKind::All(Qualifier::SoftFail));
        assert_eq!(parse("?all").kind, MechanismKind::All(Qualifier::Neutral));
        assert_eq!(parse("+all").kind, MechanismKind::All(Qualifier::Pass));
    }

    #[test]
    fn bare_all_is_pass() {
        let m = parse("all");
        assert_eq!(m.kind, MechanismKind::All(Qualifier::Pass));
        assert_eq!(m.catalog_key(), "+all");
    }

    #[test]
    fn all_with_argument_is_unknown() {
        assert!(Mechanism::parse("all:foo").is_none());
        assert!(Mechanism::parse("-allx").is_none());
    }

    // ---- include / redirect ----

    #[test]
    fn parse_include() {
        assert_eq!(
            parse("include:_spf.google.com"),
            Mechanism::new(MechanismKind::Include, Some("_spf.google.com"))
        );
    }

    #[test]
    fn parse_include_with_qualifier() {
        let m = parse("~include:example.com");
        assert_eq!(m.include_target(), Some("example.com"));
    }

    #[test]
    fn include_requires_domain() {
        assert!(Mechanism::parse("include:").is_none());
        assert!(Mechanism::parse("include").is_none());
    }

    #[test]
    fn parse_redirect() {
        let m = parse("redirect=_spf.example.com");
        assert_eq!(m.kind, MechanismKind::Redirect);
        assert_eq!(m.argument.as_deref(), Some("_spf.example.com"));
        assert_eq!(m.include_target(), None);
    }

    #[test]
    fn redirect_rejects_qualifier_and_empty_target() {
        assert!(Mechanism::parse("-redirect=example.com").is_none());
        assert!(Mechanism::parse("redirect=").is_none());
    }

    // ---- ip4 / ip6 ----

    #[test]
    fn parse_ip_networks() {
        assert_eq!(
            parse("ip4:192.0.2.0/24"),
            Mechanism::new(MechanismKind::Ip4, Some("192.0.2.0/24"))
        );
        assert_eq!(
            parse("ip6:2001:db8::/32"),
            Mechanism::new(MechanismKind::Ip6, Some("2001:db8::/32"))
        );
    }

    // ---- a / mx / ptr / exists ----

    #[test]
    fn parse_a_forms() {
        assert_eq!(parse("a"), Mechanism::new(MechanismKind::A, None));
        assert_eq!(
            parse("a:mail.example.com"),
            Mechanism::new(MechanismKind::A, Some("mail.example.com"))
        );
        assert_eq!(parse("a/24"), Mechanism::new(MechanismKind::A, Some("/24")));
        assert_eq!(parse("-a//64").argument.as_deref(), Some("//64"));
    }

    #[test]
    fn parse_mx_and_ptr() {
        assert_eq!(parse("mx").kind, MechanismKind::Mx);
        assert_eq!(parse("mx:example.com/28").argument.as_deref(), Some("example.com/28"));
        assert_eq!(parse("ptr").kind, MechanismKind::Ptr);
        assert_eq!(parse("?ptr:example.com").argument.as_deref(), Some("example.com"));
    }

    #[test]
    fn word_boundaries_respected() {
        assert!(Mechanism::parse("ab").is_none());
        assert!(Mechanism::parse("mxx").is_none());
        assert!(Mechanism::parse("ptrs:example.com").is_none());
        assert!(Mechanism::parse("a:").is_none());
    }

    #[test]
    fn parse_exists() {
        assert_eq!(
            parse("exists:%{ir}.sbl.example.com"),
            Mechanism::new(MechanismKind::Exists, Some("%{ir}.sbl.example.com"))
        );
        assert!(Mechanism::parse("exists").is_none());
        assert!(Mechanism::parse("exists:").is_none());
    }

    // ---- unknown ----

    #[test]
    fn unknown_terms() {
        assert!(Mechanism::parse("foo:bar").is_none());
        assert!(Mechanism::parse("exp=explain.example.com").is_none());
        assert!(Mechanism::parse("v=spf1").is_none());
        assert!(Mechanism::parse("").is_none());
    }

    // ---- case insensitivity ----

    #[test]
    fn mechanism_name_case_insensitive() {
        assert_eq!(parse("-ALL").kind, MechanismKind::All(Qualifier::Fail));
        assert_eq!(parse("INCLUDE:Example.COM").argument.as_deref(), Some("Example.COM"));
        assert_eq!(parse("IP4:1.2.3.4").kind, MechanismKind::Ip4);
        assert_eq!(parse("MX").kind, MechanismKind::Mx);
    }

    // ---- cost ----

    #[test]
    fn lookup_cost_per_kind() {
        for term in ["include:a.com", "redirect=a.com", "a", "mx", "ptr", "exists:a.com"] {
            assert_eq!(parse(term).lookup_cost(), 1, "{term}");
        }
        for term in ["ip4:1.2.3.4", "ip6:::1", "-all", "all"] {
            assert_eq!(parse(term).lookup_cost(), 0, "{term}");
        }
    }

    // ---- Display ----

    #[test]
    fn display_forms() {
        assert_eq!(parse("~all").to_string(), "~all");
        assert_eq!(parse("all").to_string(), "+all");
        assert_eq!(parse("+include:x.com").to_string(), "include:x.com");
        assert_eq!(parse("a/24").to_string(), "a/24");
        assert_eq!(parse("mx:example.com").to_string(), "mx:example.com");
        assert_eq!(parse("redirect=b.com").to_string(), "redirect=b.com");
    }
}
