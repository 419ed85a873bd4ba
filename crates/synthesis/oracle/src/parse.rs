//! Tolerant parsing of oracle JSON.
//!
//! A strict parse is tried first. Failing that, the first JSON object or
//! array is cut out of the surrounding prose (markdown fences included) and
//! single quotes are swapped for double quotes. Anything still unparseable
//! yields `None`; the caller picks the fallback.

use crate::oracle::OracleResult;
use serde::de::DeserializeOwned;

/// How a value was recovered from oracle output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStatus {
    /// Parsed as-is.
    Validated,
    /// Parsed after extraction or quote repair.
    Repaired,
}

/// A parsed value and how it was obtained.
#[derive(Clone, Debug, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub status: ParseStatus,
}

/// Parse oracle text into `T`, repairing common formatting mistakes.
pub fn parse_oracle_json<T: DeserializeOwned>(raw: &str) -> Option<T> {
    parse_oracle_output(raw).map(|p| p.value)
}

pub fn parse_oracle_output<T: DeserializeOwned>(raw: &str) -> Option<Parsed<T>> {
    if let Ok(value) = serde_json::from_str::<T>(raw.trim()) {
        return Some(Parsed {
            value,
            status: ParseStatus::Validated,
        });
    }
    repair_and_parse(raw).map(|value| Parsed {
        value,
        status: ParseStatus::Repaired,
    })
}

/// Prefer the first structured call whose arguments deserialize, then the text.
pub fn parse_result<T: DeserializeOwned>(result: &OracleResult) -> Option<T> {
    result
        .calls
        .iter()
        .find_map(|call| serde_json::from_value::<T>(call.arguments.clone()).ok())
        .or_else(|| parse_oracle_json(&result.text))
}

fn repair_and_parse<T: DeserializeOwned>(raw: &str) -> Option<T> {
    let mut candidates = Vec::new();

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(extracted) = extract_first_balanced(raw, open, close) {
            candidates.push(extracted.replace('\'', "\""));
            candidates.push(extracted);
        }
    }
    candidates.push(raw.replace('\'', "\""));

    candidates
        .into_iter()
        .find_map(|candidate| serde_json::from_str::<T>(&candidate).ok())
}

fn extract_first_balanced(raw: &str, open: char, close: char) -> Option<String> {
    let start = raw.find(open)?;
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(raw[start..start + idx + ch.len_utf8()].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
