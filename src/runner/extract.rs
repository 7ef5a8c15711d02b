//! Output extractor: recovers the answer from the agent's event stream.
//!
//! With `--output-format json` the agent prints a sequence of event objects,
//! but the stream as a whole is not guaranteed to be valid JSON (events may be
//! interleaved with diagnostics or cut short). Instead of parsing, each tier
//! pattern-matches one event kind and the tiers are tried in order of
//! specificity:
//!
//! 1. `completion_result`: the agent's final answer, authoritative
//! 2. `plan_mode_respond`: the `response` field of a plan-mode reply
//! 3. `text`: the longest text message above [`MIN_TEXT_CHARS`]
//! 4. raw stdout, truncated to [`MAX_RAW_CHARS`]
//!
//! Every tier is a plain `fn(&str) -> Option<String>`; a tier that cannot
//! match (including a pattern that failed to compile) returns `None` and the
//! next tier runs. Extraction always produces some text.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Text events at or below this many characters are treated as status chatter.
pub const MIN_TEXT_CHARS: usize = 50;

/// Raw fallback is cut to this many characters.
pub const MAX_RAW_CHARS: usize = 2000;

/// Appended to raw output that was cut.
pub const TRUNCATION_MARKER: &str = "\n\n... (output truncated)";

/// A JSON string literal body, escapes included.
const STRING_LITERAL: &str = r#""((?:[^"\\]|\\.)*)""#;

/// Run of object content between two keys. String literals are consumed
/// whole, so braces inside them do not end the object.
const OBJECT_GAP: &str = r#"(?:[^{}"]|"(?:[^"\\]|\\.)*")*?"#;

/// One extraction tier.
pub type Tier = fn(&str) -> Option<String>;

/// The ordered tier chain used by [`OutputExtractor::default`].
pub const TIER_CHAIN: &[(&str, Tier)] = &[
    ("completion_result", completion_result),
    ("plan_response", plan_response),
    ("longest_text", longest_text),
];

/// Name reported when no structured tier matched.
pub const RAW_TIER: &str = "raw";

/// Extracted answer plus the tier that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    pub tier: &'static str,
}

/// Classify-and-extract strategy over an ordered set of tiers.
#[derive(Debug, Clone, Copy)]
pub struct OutputExtractor {
    tiers: &'static [(&'static str, Tier)],
}

impl Default for OutputExtractor {
    fn default() -> Self {
        Self { tiers: TIER_CHAIN }
    }
}

impl OutputExtractor {
    /// Use a custom tier chain, replacing [`TIER_CHAIN`]. This is the seam
    /// for dropping or reordering tiers. The raw fallback always runs last.
    pub const fn with_tiers(tiers: &'static [(&'static str, Tier)]) -> Self {
        Self { tiers }
    }

    /// Extract the best answer from raw agent stdout.
    pub fn extract(&self, stdout: &str) -> Extraction {
        for &(name, tier) in self.tiers {
            if let Some(text) = tier(stdout) {
                debug!(tier = name, chars = text.chars().count(), "extracted agent answer");
                return Extraction { text, tier: name };
            }
        }
        debug!(bytes = stdout.len(), "no structured event found, using raw output");
        Extraction {
            text: raw_fallback(stdout),
            tier: RAW_TIER,
        }
    }
}

/// Convenience wrapper over the default chain.
pub fn extract_answer(stdout: &str) -> String {
    OutputExtractor::default().extract(stdout).text
}

// ---------------------------------------------------------------------------
// Tiers
// ---------------------------------------------------------------------------

static COMPLETION: LazyLock<EventPattern> =
    LazyLock::new(|| EventPattern::new("completion_result", "text"));
static PLAN_TEXT: LazyLock<EventPattern> =
    LazyLock::new(|| EventPattern::new("plan_mode_respond", "text"));
static PLAN_RESPONSE: LazyLock<EventPattern> =
    LazyLock::new(|| EventPattern::new("plan_mode_respond", "response"));
static TEXT: LazyLock<EventPattern> = LazyLock::new(|| EventPattern::new("text", "text"));
static RESPONSE_FIELD: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(&format!(r#"(?s)"response"\s*:\s*{STRING_LITERAL}"#)).ok());

/// Tier 1: text of the first `completion_result` event.
pub fn completion_result(stdout: &str) -> Option<String> {
    COMPLETION.values(stdout).into_iter().next().map(unescape)
}

/// Tier 2: `response` of the first `plan_mode_respond` event.
///
/// The response usually arrives double-encoded, as a JSON document inside the
/// event's `text` string. That text is unescaped once, then the `response`
/// literal inside it is unescaped again. A `response` placed directly on the
/// event is accepted too.
pub fn plan_response(stdout: &str) -> Option<String> {
    if let Some(raw) = PLAN_RESPONSE.values(stdout).into_iter().next() {
        return Some(unescape(raw));
    }

    let re = RESPONSE_FIELD.as_ref()?;
    PLAN_TEXT.values(stdout).into_iter().find_map(|raw| {
        let inner = unescape(raw);
        re.captures(&inner)
            .and_then(|caps| caps.get(1))
            .map(|m| unescape(m.as_str()))
    })
}

/// Tier 3: the longest `text` event longer than [`MIN_TEXT_CHARS`].
///
/// On a tie the earliest event wins.
pub fn longest_text(stdout: &str) -> Option<String> {
    TEXT.values(stdout)
        .into_iter()
        .map(unescape)
        .map(|text| (text.chars().count(), text))
        .filter(|(len, _)| *len > MIN_TEXT_CHARS)
        .fold(None, |best: Option<(usize, String)>, candidate| match best {
            Some(b) if b.0 >= candidate.0 => Some(b),
            _ => Some(candidate),
        })
        .map(|(_, text)| text)
}

/// Tier 4: raw stdout, cut to [`MAX_RAW_CHARS`] characters.
pub fn raw_fallback(stdout: &str) -> String {
    match stdout.char_indices().nth(MAX_RAW_CHARS) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + TRUNCATION_MARKER.len());
            out.push_str(&stdout[..cut]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
        None => stdout.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// Pattern helpers
// ---------------------------------------------------------------------------

/// Matches `field` of events whose `say`/`ask` discriminator is `kind`, in
/// either key order, without crossing an object boundary.
struct EventPattern {
    kind_first: Option<Regex>,
    field_first: Option<Regex>,
}

impl EventPattern {
    fn new(kind: &str, field: &str) -> Self {
        let kind_key = format!(r#""(?:say|ask)"\s*:\s*"{kind}""#);
        let field_key = format!(r#""{field}"\s*:\s*{STRING_LITERAL}"#);
        Self {
            kind_first: Regex::new(&format!(r"(?s){kind_key}{OBJECT_GAP}{field_key}")).ok(),
            field_first: Regex::new(&format!(r"(?s){field_key}{OBJECT_GAP}{kind_key}")).ok(),
        }
    }

    /// Escaped field values in stream order.
    fn values<'a>(&self, haystack: &'a str) -> Vec<&'a str> {
        let mut found: Vec<(usize, &'a str)> = [&self.kind_first, &self.field_first]
            .into_iter()
            .flatten()
            .flat_map(|re| re.captures_iter(haystack))
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let value = caps.get(1)?;
                Some((whole.start(), value.as_str()))
            })
            .collect();
        found.sort_by_key(|&(start, _)| start);
        found.dedup_by_key(|&mut (start, _)| start);
        found.into_iter().map(|(_, value)| value).collect()
    }
}

/// Decode JSON string escapes in a single left-to-right pass.
///
/// Each escape is consumed exactly once, so `\\n` becomes a backslash followed
/// by `n` rather than a newline. Unknown or malformed escapes are kept as-is.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('/') => out.push('/'),
            Some('u') => {
                let hex: String = chars.clone().take(4).collect();
                let well_formed = hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit());
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if well_formed => {
                        out.push(decoded);
                        chars.nth(3);
                    }
                    _ => out.push_str("\\u"),
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
