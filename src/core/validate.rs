//! Input shape checks shared by sign-in and the public forms.

use regex::Regex;
use std::sync::OnceLock;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

/// `local@domain.tld` with no whitespace.
pub fn is_email(text: &str) -> bool {
    email_pattern().is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_email("admin@studio.test"));
        assert!(is_email("first.last+tag@mail.example.com"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in ["", "not-an-email", "@studio.test", "admin@studio", "ad min@studio.test", "a@@b.c"] {
            assert!(!is_email(bad), "{bad:?} should be rejected");
        }
    }
}
