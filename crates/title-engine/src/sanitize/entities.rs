//! HTML entity decoding.
//!
//! Decoding runs before the residual tag strip and the whitelist so that
//! double-encoded markup (`&amp;lt;script&amp;gt;`) cannot smuggle angle
//! brackets past later stages.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Named entities commonly seen in page titles and usernames.
const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("amp", "&"),
    ("lt", "<"),
    ("gt", ">"),
    ("quot", "\""),
    ("apos", "'"),
    ("nbsp", " "),
    ("copy", "\u{a9}"),
    ("reg", "\u{ae}"),
    ("trade", "\u{2122}"),
    ("hellip", "\u{2026}"),
    ("mdash", "\u{2014}"),
    ("ndash", "\u{2013}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("ldquo", "\u{201c}"),
    ("rdquo", "\u{201d}"),
];

static ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:([a-zA-Z]+)|#([0-9]{1,7})|#[xX]([0-9a-fA-F]{1,6}));")
        .expect("entity regex should compile - this is a bug")
});

fn lookup_named(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, replacement)| *replacement)
}

fn decode_code_point(value: u32) -> Option<char> {
    // Bounded to the valid Unicode scalar range; surrogates and
    // out-of-range references decode to nothing.
    char::from_u32(value)
}

/// Decode one pass of HTML entities.
///
/// Unknown named entities are left untouched; invalid numeric references
/// are removed.
pub(crate) fn decode_entities(input: &str) -> String {
    ENTITY_REGEX
        .replace_all(input, |caps: &Captures<'_>| {
            if let Some(name) = caps.get(1) {
                return lookup_named(name.as_str())
                    .map_or_else(|| caps[0].to_string(), str::to_string);
            }
            let parsed = if let Some(decimal) = caps.get(2) {
                decimal.as_str().parse::<u32>().ok()
            } else {
                caps.get(3).and_then(|hex| u32::from_str_radix(hex.as_str(), 16).ok())
            };
            parsed.and_then(decode_code_point).map_or_else(String::new, |c| c.to_string())
        })
        .into_owned()
}

/// True if `input` still contains something that looks like an entity.
pub(crate) fn contains_entities(input: &str) -> bool {
    ENTITY_REGEX.is_match(input)
}
