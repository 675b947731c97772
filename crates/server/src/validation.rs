//! Argument checks for payment API tools. Every check runs before a request is built.

use regex::Regex;
use serde_json::Number;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-']+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)+$")
        .expect("email pattern compiles")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid argument '{field}': {message}")]
pub struct InvalidArgument {
    pub field: &'static str,
    pub message: String,
}

impl InvalidArgument {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub type Checked = std::result::Result<(), InvalidArgument>;

pub fn max_chars(field: &'static str, value: &str, max: usize) -> Checked {
    let n = value.chars().count();
    if n > max {
        return Err(InvalidArgument::new(
            field,
            format!("must be at most {max} characters (got {n})"),
        ));
    }
    Ok(())
}

pub fn exact_chars(field: &'static str, value: &str, len: usize) -> Checked {
    if value.chars().count() != len {
        return Err(InvalidArgument::new(
            field,
            format!("must be exactly {len} characters"),
        ));
    }
    Ok(())
}

/// The number is checked as given; it is forwarded unchanged, so `2500` stays an integer.
pub fn positive(field: &'static str, value: &Number) -> Checked {
    if !value.as_f64().is_some_and(|v| v.is_finite() && v > 0.0) {
        return Err(InvalidArgument::new(field, "must be greater than 0"));
    }
    Ok(())
}

pub fn positive_int(field: &'static str, value: u64) -> Checked {
    if value == 0 {
        return Err(InvalidArgument::new(field, "must be a positive integer"));
    }
    Ok(())
}

pub fn url(field: &'static str, value: &str) -> Checked {
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| InvalidArgument::new(field, format!("must be a valid URL ({e})")))
}

pub fn email(field: &'static str, value: &str) -> Checked {
    if !EMAIL_RE.is_match(value) {
        return Err(InvalidArgument::new(field, "must be a valid email address"));
    }
    Ok(())
}

pub fn uuid(field: &'static str, value: &str) -> Checked {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| InvalidArgument::new(field, "must be a valid UUID"))
}

/// Run `check` only when the optional argument is present.
pub fn optional<T: ?Sized>(value: Option<&T>, check: impl FnOnce(&T) -> Checked) -> Checked {
    value.map_or(Ok(()), check)
}
