use thiserror::Error;

const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Reasons a domain name is rejected before any DNS traffic is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("domain is empty")]
    Empty,
    #[error("domain is longer than 253 characters")]
    TooLong,
    #[error("domain must contain at least one dot")]
    MissingDot,
    #[error("empty label in {0:?}")]
    EmptyLabel(String),
    #[error("label {0:?} is longer than 63 characters")]
    LabelTooLong(String),
    #[error("label {0:?} contains characters other than letters, digits and hyphens")]
    InvalidCharacter(String),
    #[error("label {0:?} starts or ends with a hyphen")]
    HyphenAtEdge(String),
    #[error("top-level label {0:?} must be alphabetic and at least two characters")]
    InvalidTld(String),
}

/// Normalize a domain: lowercase + strip trailing dot.
pub fn normalize(domain: &str) -> String {
    let d = domain.trim().to_ascii_lowercase();
    d.strip_suffix('.').unwrap_or(&d).to_string()
}

/// Normalize `domain` and check it is a plausible host name to query.
///
/// Labels are 1-63 characters of `[a-z0-9-]` without a leading or trailing
/// hyphen, at least two labels are required, and the last label must be
/// alphabetic with a length of at least two.
pub fn validate_domain(domain: &str) -> Result<String, DomainError> {
    let normalized = normalize(domain);
    if normalized.is_empty() {
        return Err(DomainError::Empty);
    }
    if normalized.len() > MAX_DOMAIN_LEN {
        return Err(DomainError::TooLong);
    }
    if !normalized.contains('.') {
        return Err(DomainError::MissingDot);
    }

    let labels: Vec<&str> = normalized.split('.').collect();
    for label in &labels {
        if label.is_empty() {
            return Err(DomainError::EmptyLabel(normalized.clone()));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DomainError::LabelTooLong(label.to_string()));
        }
        if !label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(DomainError::InvalidCharacter(label.to_string()));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(DomainError::HyphenAtEdge(label.to_string()));
        }
    }

    // at least one dot, so labels is non-empty
    let tld = labels[labels.len() - 1];
    if tld.len() < 2 || !tld.bytes().all(|b| b.is_ascii_lowercase()) {
        return Err(DomainError::InvalidTld(tld.to_string()));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- Normalize tests ---

    #[test]
    fn normalize_lowercase() {
        assert_eq!(normalize("EXAMPLE.COM"), "example.com");
    }

    #[test]
    fn normalize_strip_trailing_dot() {
        assert_eq!(normalize("example.com."), "example.com");
    }

    #[test]
    fn normalize_combined() {
        assert_eq!(normalize(" Mail.EXAMPLE.COM. "), "mail.example.com");
    }

    // --- validate_domain tests ---

    #[test]
    fn validate_accepts_common_domains() {
        assert_eq!(validate_domain("example.com").unwrap(), "example.com");
        assert_eq!(validate_domain("Mail.Example.CO.UK.").unwrap(), "mail.example.co.uk");
        assert_eq!(validate_domain("my-host1.example.io").unwrap(), "my-host1.example.io");
    }

    #[test]
    fn validate_rejects_empty() {
        assert_eq!(validate_domain("  "), Err(DomainError::Empty));
    }

    #[test]
    fn validate_requires_dot() {
        assert_eq!(validate_domain("localhost"), Err(DomainError::MissingDot));
    }

    #[test]
    fn validate_rejects_empty_label() {
        assert!(matches!(validate_domain("a..com"), Err(DomainError::EmptyLabel(_))));
        assert!(matches!(validate_domain(".example.com"), Err(DomainError::EmptyLabel(_))));
    }

    #[test]
    fn validate_rejects_long_label() {
        let label = "a".repeat(64);
        assert!(matches!(
            validate_domain(&format!("{label}.com")),
            Err(DomainError::LabelTooLong(_))
        ));
        let label = "a".repeat(63);
        assert!(validate_domain(&format!("{label}.com")).is_ok());
    }

    #[test]
    fn validate_rejects_long_domain() {
        let label = "a".repeat(60);
        let domain = format!("{label}.{label}.{label}.{label}.{label}.com");
        assert_eq!(validate_domain(&domain), Err(DomainError::TooLong));
    }

    #[test]
    fn validate_rejects_bad_characters() {
        assert!(matches!(validate_domain("ex_ample.com"), Err(DomainError::InvalidCharacter(_))));
        assert!(matches!(validate_domain("exa mple.com"), Err(DomainError::InvalidCharacter(_))));
        assert!(matches!(validate_domain("user@example.com"), Err(DomainError::InvalidCharacter(_))));
    }

    #[test]
    fn validate_rejects_hyphen_edges() {
        assert!(matches!(validate_domain("-example.com"), Err(DomainError::HyphenAtEdge(_))));
        assert!(matches!(validate_domain("example-.com"), Err(DomainError::HyphenAtEdge(_))));
    }

    #[test]
    fn validate_rejects_bad_tld() {
        assert!(matches!(validate_domain("example.c"), Err(DomainError::InvalidTld(_))));
        assert!(matches!(validate_domain("example.c0m"), Err(DomainError::InvalidTld(_))));
        assert!(matches!(validate_domain("192.168.1.1"), Err(DomainError::InvalidTld(_))));
    }
}
