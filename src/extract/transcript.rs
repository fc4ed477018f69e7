//! Transcript parsing and cleanup

use crate::error::{Error, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Stored in place of a transcript that could not be fetched
pub const NO_TRANSCRIPT: &str = "No transcript available";

/// Caption annotations that carry no speech
pub const SPECIAL_STRINGS: [&str; 4] = ["[Music Ends]", "[Music]", "[Applause]", "[Laughter]"];

static TEXT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<text\b[^>]*>(.*?)</text>").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap()
});

/// Remove every special string and collapse whitespace
pub fn clean_transcript(text: &str) -> String {
    let mut cleaned = text.to_string();
    for special in SPECIAL_STRINGS {
        cleaned = cleaned.replace(special, " ");
    }
    WHITESPACE.replace_all(cleaned.trim(), " ").trim().to_string()
}

/// Join the caption lines of a timed-text XML document with spaces
///
/// A document without any `<text>` element is a decode error, since the
/// endpoint answers unknown videos with an empty 200.
pub fn parse_timed_text(xml: &str) -> Result<String> {
    let lines: Vec<String> = TEXT_ELEMENT
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| decode_entities(&decode_entities(m.as_str())))
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return Err(Error::decode("timed text contains no caption lines"));
    }
    Ok(lines.join(" "))
}

/// Decode XML character references; captions are often escaped twice
fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let entity = &caps[1];
            match entity {
                "amp" => "&".to_string(),
                "lt" => "<".to_string(),
                "gt" => ">".to_string(),
                "quot" => "\"".to_string(),
                "apos" => "'".to_string(),
                _ => {
                    let code = entity
                        .strip_prefix("#x")
                        .map(|hex| u32::from_str_radix(hex, 16))
                        .or_else(|| entity.strip_prefix('#').map(str::parse::<u32>))
                        .and_then(std::result::Result::ok)
                        .and_then(char::from_u32);
                    code.map_or_else(|| caps[0].to_string(), String::from)
                }
            }
        })
        .into_owned()
}
