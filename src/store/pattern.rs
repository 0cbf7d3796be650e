//! Key pattern compilation.
//!
//! Two grammars, matching whole keys only:
//! - regex literal: `/.../`, where the content between the slashes is a
//!   conventional regular expression;
//! - glob: every regex metacharacter is escaped, then `*` becomes `.*`
//!   and `?` becomes `.`, anchored with `^...$`.

use crate::error::Result;
use regex::Regex;

/// Whether a key argument should be treated as a pattern.
pub fn is_pattern(key: &str) -> bool {
    key.contains('*') || key.contains('?') || is_regex_literal(key)
}

fn is_regex_literal(pattern: &str) -> bool {
    pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/')
}

/// Compile a pattern in either grammar.
pub fn compile(pattern: &str) -> Result<Regex> {
    if is_regex_literal(pattern) {
        return Ok(Regex::new(&pattern[1..pattern.len() - 1])?);
    }

    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            '.' | '+' | '^' | '$' | '{' | '}' | '(' | ')' | '|' | '[' | ']' | '\\' => {
                translated.push('\\');
                translated.push(ch);
            }
            _ => translated.push(ch),
        }
    }
    translated.push('$');

    Ok(Regex::new(&translated)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_star() {
        let re = compile("user:*").unwrap();
        assert!(re.is_match("user:1"));
        assert!(re.is_match("user:"));
        assert!(!re.is_match("session:user:1"));
    }

    #[test]
    fn test_glob_question_mark() {
        let re = compile("u:?").unwrap();
        assert!(re.is_match("u:1"));
        assert!(!re.is_match("u:12"));
    }

    #[test]
    fn test_glob_escapes_metacharacters() {
        let re = compile("a.b+c*").unwrap();
        assert!(re.is_match("a.b+cXYZ"));
        assert!(!re.is_match("aXb+c"));
    }

    #[test]
    fn test_regex_literal() {
        let re = compile("/^u:[0-9]+$/").unwrap();
        assert!(re.is_match("u:42"));
        assert!(!re.is_match("u:x"));
    }

    #[test]
    fn test_invalid_regex_literal_fails() {
        assert!(compile("/[unclosed/").is_err());
    }

    #[test]
    fn test_is_pattern() {
        assert!(is_pattern("u:*"));
        assert!(is_pattern("u:?"));
        assert!(is_pattern("/u/"));
        assert!(!is_pattern("plain-key"));
        assert!(!is_pattern("/"));
    }
}
