//! Input format checks applied before an analysis starts.

use std::sync::OnceLock;

use regex::Regex;

const MAX_DOMAIN_LEN: usize = 253;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$").expect("static regex")
    })
}

fn domain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:[a-z0-9-]{1,63}\.)+[a-z]{2,}$").expect("static regex"))
}

pub fn is_valid_email(value: &str) -> bool {
    value.len() <= MAX_DOMAIN_LEN + 64 && email_re().is_match(value)
}

pub fn is_valid_domain(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= MAX_DOMAIN_LEN
        && !value.starts_with('-')
        && domain_re().is_match(value)
}
