//! Pattern matching helpers for built-in rules.
//!
//! # Responsibility
//! - Compile and cache `match` rule patterns.
//! - Provide syntactic email and URL checks.
//!
//! # Invariants
//! - Invalid patterns never panic; they are reported as non-matches.
//! - Delimited patterns (`/.../flags`, `#...#`, `{...}`) and bare patterns
//!   compile to the same expression when they describe the same language.
//! - An unknown modifier fails the match instead of falling back to the raw
//!   text.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

static NON_BLANK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("valid non-blank regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
    )
    .expect("valid email regex")
});
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://[^\s/?#@]+(?:@[^\s/?#]+)?(?:[/?#]\S*)?$")
        .expect("valid url regex")
});

static PATTERN_CACHE: Lazy<RwLock<HashMap<String, Regex>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

const EMAIL_MAX_LEN: usize = 254;
const EMAIL_LOCAL_MAX_LEN: usize = 64;

/// Returns whether `value` contains at least one non-whitespace character.
pub fn is_non_blank(value: &str) -> bool {
    NON_BLANK_RE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    if value.len() > EMAIL_MAX_LEN {
        return false;
    }
    match value.split_once('@') {
        Some((local, _)) if local.len() <= EMAIL_LOCAL_MAX_LEN => EMAIL_RE.is_match(value),
        _ => false,
    }
}

pub fn is_valid_url(value: &str) -> bool {
    URL_RE.is_match(value)
}

/// Matches `value` against a `match` rule pattern.
///
/// Returns `false` (and logs a warning) when the pattern does not compile or
/// carries an unknown modifier.
pub fn matches_pattern(value: &str, pattern: &str) -> bool {
    match compiled(pattern) {
        Ok(regex) => regex.is_match(value),
        Err(err) => {
            warn!(
                "event=pattern_compile module=validation status=error error={}",
                err.replace('\n', " ")
            );
            false
        }
    }
}

fn compiled(pattern: &str) -> Result<Regex, String> {
    if let Some(regex) = PATTERN_CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(pattern)
    {
        return Ok(regex.clone());
    }

    let regex = Regex::new(&normalize_pattern(pattern)?).map_err(|err| err.to_string())?;
    PATTERN_CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(pattern.to_string(), regex.clone());
    Ok(regex)
}

/// Converts a delimited pattern (`/body/flags`, `#body#`, `{body}i`) into
/// regex crate syntax.
///
/// The delimiter is the first character when it is neither alphanumeric,
/// a backslash nor whitespace; bracket delimiters close with their pair.
/// Text without a closing delimiter, or with non-letters after it, is a
/// bare expression and is returned as-is.
fn normalize_pattern(pattern: &str) -> Result<String, String> {
    let Some(open) = pattern.chars().next() else {
        return Ok(String::new());
    };
    if open.is_alphanumeric() || open == '\\' || open.is_whitespace() {
        return Ok(pattern.to_string());
    }

    let close = closing_delimiter(open);
    let rest = &pattern[open.len_utf8()..];
    let Some(end) = find_closing(rest, open, close) else {
        return Ok(pattern.to_string());
    };
    let (body, flags) = (&rest[..end], &rest[end + close.len_utf8()..]);
    if !flags.chars().all(|flag| flag.is_ascii_alphabetic()) {
        return Ok(pattern.to_string());
    }

    let mut inline = String::new();
    let mut anchored = false;
    for flag in flags.chars() {
        match flag {
            'i' | 'm' | 's' | 'x' | 'U' => {
                if !inline.contains(flag) {
                    inline.push(flag);
                }
            }
            'A' => anchored = true,
            // `$` without `m` already matches only at the very end; the regex
            // crate is Unicode-aware and needs no study pass.
            'D' | 'S' | 'u' => {}
            other => return Err(format!("unknown modifier `{other}` in pattern `{pattern}`")),
        }
    }

    let body = if anchored {
        format!(r"\A(?:{body})")
    } else {
        body.to_string()
    };
    Ok(if inline.is_empty() {
        body
    } else {
        format!("(?{inline}){body}")
    })
}

fn closing_delimiter(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    }
}

/// Byte offset of the first unescaped `close` in `rest`, honouring nesting
/// for bracket pairs.
fn find_closing(rest: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (index, ch) in rest.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == close {
            if depth == 0 {
                return Some(index);
            }
            depth -= 1;
        } else if ch == open && open != close {
            depth += 1;
        }
    }
    None
}
