use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use lru::LruCache;
use regex::{Regex, RegexBuilder};
use crate::core::{DbError, Result};

const REGEX_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(200) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

lazy_static::lazy_static! {
    static ref REGEX_CACHE: Mutex<LruCache<String, Arc<Regex>>> =
        Mutex::new(LruCache::new(REGEX_CACHE_CAPACITY));
}

/// Evaluates `text LIKE pattern`. `%` matches any run, `_` one character and
/// `\` escapes the next character.
pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    if let Some(matched) = fast_path(text, pattern, case_sensitive) {
        return Ok(matched);
    }

    let regex = cached_regex(pattern, case_sensitive)?;
    Ok(regex.is_match(text))
}

fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&regex::escape(&escaped.to_string())),
                None => out.push_str("\\\\"),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    out
}

/// Plain, `prefix%`, `%suffix` and `%infix%` patterns without touching regex.
fn fast_path(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    if pattern.contains('_') || pattern.contains('\\') {
        return None;
    }

    let fold = |s: &str| if case_sensitive { s.to_string() } else { s.to_lowercase() };
    let wildcards = pattern.matches('%').count();

    if wildcards == 0 {
        return Some(if case_sensitive {
            text == pattern
        } else {
            fold(text) == fold(pattern)
        });
    }

    if wildcards == 1 {
        if let Some(prefix) = pattern.strip_suffix('%') {
            return Some(fold(text).starts_with(&fold(prefix)));
        }
        if let Some(suffix) = pattern.strip_prefix('%') {
            return Some(fold(text).ends_with(&fold(suffix)));
        }
        return None;
    }

    if wildcards == 2 && pattern.len() >= 2 && pattern.starts_with('%') && pattern.ends_with('%') {
        let infix = &pattern[1..pattern.len() - 1];
        return Some(fold(text).contains(&fold(infix)));
    }

    None
}

fn cached_regex(pattern: &str, case_sensitive: bool) -> Result<Arc<Regex>> {
    let key = format!("{}:{}", if case_sensitive { 's' } else { 'i' }, pattern);

    if let Some(regex) = REGEX_CACHE.lock()?.get(&key) {
        return Ok(Arc::clone(regex));
    }

    let compiled = RegexBuilder::new(&like_to_regex(pattern))
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| DbError::ExecutionError(format!("Invalid LIKE pattern: {}", e)))?;
    let compiled = Arc::new(compiled);

    REGEX_CACHE.lock()?.put(key, Arc::clone(&compiled));
    Ok(compiled)
}
