//! Bracketed range expansion used by the bulk-add endpoints.
//!
//! `10[0-2]` expands to `100`, `101`, `102`; `L[a-c]` to `La`, `Lb`, `Lc`;
//! comma lists (`[1,3,7-9]`) and several brackets (`[1-2]0[0-1]`) are
//! supported. Numeric ranges whose bounds share a width keep their zero
//! padding, so `[08-10]` yields `08`, `09`, `10`.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Upper bound on the number of values a single pattern may produce.
pub const MAX_EXPANSION: usize = 4096;

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[((?:[a-zA-Z0-9]+[,-])+[a-zA-Z0-9]+)\]").expect("range pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Range \"{0}\" is invalid")]
    InvalidRange(String),

    #[error("Pattern expands to more than {MAX_EXPANSION} values")]
    TooLarge,

    #[error("Pattern is empty")]
    Empty,
}

/// Expand every bracketed range in `pattern`. A pattern without brackets
/// expands to itself.
pub fn expand_pattern(pattern: &str) -> Result<Vec<String>, PatternError> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(PatternError::Empty);
    }

    let mut values = Vec::new();
    expand_into(pattern, "", &mut values)?;
    Ok(values)
}

fn expand_into(rest: &str, prefix: &str, out: &mut Vec<String>) -> Result<(), PatternError> {
    let Some(captures) = RANGE_PATTERN.captures(rest) else {
        // Any bracket left over here is one the range syntax did not accept.
        if rest.contains(['[', ']']) {
            return Err(PatternError::InvalidRange(rest.to_string()));
        }
        if out.len() >= MAX_EXPANSION {
            return Err(PatternError::TooLarge);
        }
        out.push(format!("{}{}", prefix, rest));
        return Ok(());
    };

    let (Some(whole), Some(range)) = (captures.get(0), captures.get(1)) else {
        return Err(PatternError::InvalidRange(rest.to_string()));
    };
    let lead = &rest[..whole.start()];
    let remnant = &rest[whole.end()..];

    for value in parse_range(range.as_str())? {
        let next_prefix = format!("{}{}{}", prefix, lead, value);
        expand_into(remnant, &next_prefix, out)?;
    }

    Ok(())
}

/// Parse the inside of one bracket, e.g. `1-3,7,a-c`.
pub fn parse_range(range: &str) -> Result<Vec<String>, PatternError> {
    let mut values = Vec::new();

    for part in range.split(',') {
        let bounds: Vec<&str> = part.split('-').collect();
        match bounds.as_slice() {
            [single] => values.push(single.to_string()),
            [begin, end] => values.extend(expand_bounds(part, begin, end)?),
            _ => return Err(PatternError::InvalidRange(part.to_string())),
        }

        if values.len() > MAX_EXPANSION {
            return Err(PatternError::TooLarge);
        }
    }

    Ok(values)
}

fn expand_bounds(part: &str, begin: &str, end: &str) -> Result<Vec<String>, PatternError> {
    let invalid = || PatternError::InvalidRange(part.to_string());
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());

    if all_digits(begin) && all_digits(end) {
        let first: u64 = begin.parse().map_err(|_| invalid())?;
        let last: u64 = end.parse().map_err(|_| invalid())?;
        if first > last || (last - first) as usize >= MAX_EXPANSION {
            return Err(invalid());
        }

        let width = if begin.len() == end.len() { begin.len() } else { 0 };
        return Ok((first..=last)
            .map(|n| format!("{:0width$}", n, width = width))
            .collect());
    }

    let mut begin_chars = begin.chars();
    let mut end_chars = end.chars();
    let (Some(first), None, Some(last), None) = (
        begin_chars.next(),
        begin_chars.next(),
        end_chars.next(),
        end_chars.next(),
    ) else {
        return Err(invalid());
    };

    let same_case = (first.is_ascii_lowercase() && last.is_ascii_lowercase())
        || (first.is_ascii_uppercase() && last.is_ascii_uppercase());
    if !same_case || first > last {
        return Err(invalid());
    }

    Ok((first..=last).map(|c| c.to_string()).collect())
}
