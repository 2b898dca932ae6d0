//! Line parser: an ordered table of `(marker, extractor)` patterns.
//!
//! Client log lines look like
//!
//! ```text
//! 2025/11/14 21:22:11 44933602 cff945bb [INFO Client 312] : You have entered The Submerged Passage.
//! ```
//!
//! The bracketed header ends the prefix. System messages follow it with
//! `:`; chat messages start with a channel sigil or a player name instead,
//! so patterns flagged `system` ignore them. Lines without a header are
//! taken as a bare message.

use zonewatch_protocol::{AreaEvent, LevelUpEvent, LogEvent, ZoneEvent};

/// Where a pattern's marker must appear in the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Anywhere,
}

/// A single recognised line shape.
#[derive(Debug, Clone, Copy)]
pub struct Pattern {
    pub name: &'static str,
    pub marker: &'static str,
    pub anchor: Anchor,
    /// Only match system messages (header followed by `:`).
    pub system: bool,
    pub extract: fn(&Line<'_>) -> Result<LogEvent, String>,
}

/// A decoded line split into the parts extractors need.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub text: &'a str,
    pub timestamp: Option<&'a str>,
    /// Message with the header and leading `:` removed.
    pub body: &'a str,
    /// Byte offset of the matched marker within `body`.
    pub marker_at: usize,
}

impl Line<'_> {
    fn after_marker(&self, marker: &str) -> &str {
        &self.body[self.marker_at + marker.len()..]
    }
}

/// Result of parsing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Event(LogEvent),
    /// A marker matched but the line did not have the expected shape.
    Anomaly {
        pattern: &'static str,
        reason: String,
    },
    Ignored,
}

const ZONE_MARKER: &str = "You have entered ";
const AREA_MARKER: &str = "Generating level ";
const LEVEL_MARKER: &str = " is now level ";

/// Terminators accepted after a zone name.
const ZONE_TERMINATORS: &[char] = &['.', '!'];

/// Recognised patterns; the first whose marker matches decides the line.
pub const PATTERNS: &[Pattern] = &[
    Pattern {
        name: "zone_entered",
        marker: ZONE_MARKER,
        anchor: Anchor::Start,
        system: true,
        extract: extract_zone,
    },
    Pattern {
        name: "area_generated",
        marker: AREA_MARKER,
        anchor: Anchor::Start,
        system: false,
        extract: extract_area,
    },
    Pattern {
        name: "level_up",
        marker: LEVEL_MARKER,
        anchor: Anchor::Anywhere,
        system: true,
        extract: extract_level_up,
    },
];

/// Parses raw log lines into events.
#[derive(Debug, Clone)]
pub struct LineParser {
    patterns: Vec<Pattern>,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(PATTERNS.to_vec())
    }
}

impl LineParser {
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }

    /// Parses one line (without its terminator).
    ///
    /// Bytes are decoded lossily; invalid sequences become U+FFFD and NULs
    /// are dropped, so a bad byte never fails the read.
    pub fn parse(&self, raw: &[u8]) -> ParseOutcome {
        let decoded = String::from_utf8_lossy(raw);
        let cleaned;
        let text = if decoded.contains('\0') {
            cleaned = decoded.replace('\0', "");
            cleaned.as_str()
        } else {
            decoded.as_ref()
        };
        self.parse_str(text.trim_end_matches(['\r', '\n']))
    }

    pub fn parse_str(&self, text: &str) -> ParseOutcome {
        let (message, has_header) = split_message(text);
        let is_system = message.starts_with(':');
        let body = message.strip_prefix(':').unwrap_or(message).trim_start();

        for pattern in &self.patterns {
            if pattern.system && has_header && !is_system {
                continue;
            }
            let marker_at = match pattern.anchor {
                Anchor::Start => body.starts_with(pattern.marker).then_some(0),
                Anchor::Anywhere => body.find(pattern.marker),
            };
            let Some(marker_at) = marker_at else {
                continue;
            };

            let line = Line {
                text,
                timestamp: leading_timestamp(text),
                body,
                marker_at,
            };
            return match (pattern.extract)(&line) {
                Ok(event) => ParseOutcome::Event(event),
                Err(reason) => ParseOutcome::Anomaly {
                    pattern: pattern.name,
                    reason,
                },
            };
        }

        ParseOutcome::Ignored
    }
}

/// Splits off the `[...]` header. Returns the message and whether a header
/// was present.
fn split_message(text: &str) -> (&str, bool) {
    let header_end = text
        .find('[')
        .and_then(|open| text[open..].find(']').map(|close| open + close));
    match header_end {
        Some(end) => (text[end + 1..].trim_start(), true),
        None => (text.trim_start(), false),
    }
}

/// Returns the leading `YYYY/MM/DD HH:MM:SS` token, if present.
fn leading_timestamp(text: &str) -> Option<&str> {
    const SHAPE: &[u8] = b"dddd/dd/dd dd:dd:dd";
    let candidate = text.get(..SHAPE.len())?;
    let ok = candidate
        .bytes()
        .zip(SHAPE)
        .all(|(b, &s)| if s == b'd' { b.is_ascii_digit() } else { b == s });
    ok.then_some(candidate)
}

fn extract_zone(line: &Line<'_>) -> Result<LogEvent, String> {
    let rest = line.after_marker(ZONE_MARKER).trim_end();
    if !rest.ends_with(ZONE_TERMINATORS) {
        return Err("zone name is not terminated".into());
    }
    let name = rest.trim_end_matches(ZONE_TERMINATORS).trim();
    if name.is_empty() {
        return Err("empty zone name".into());
    }

    Ok(LogEvent::ZoneEntered(ZoneEvent {
        zone_name: name.to_string(),
        timestamp: line.timestamp.map(str::to_string),
        raw_line: line.text.to_string(),
    }))
}

fn extract_area(line: &Line<'_>) -> Result<LogEvent, String> {
    let rest = line.after_marker(AREA_MARKER);
    let (level, rest) = rest
        .split_once(' ')
        .ok_or_else(|| "missing area after level".to_string())?;
    let level: u32 = level
        .parse()
        .map_err(|_| format!("invalid area level {level:?}"))?;

    let rest = rest
        .strip_prefix("area \"")
        .ok_or_else(|| "missing quoted area id".to_string())?;
    let (area_id, rest) = rest
        .split_once('"')
        .ok_or_else(|| "unterminated area id".to_string())?;
    if area_id.is_empty() {
        return Err("empty area id".into());
    }

    let seed = match rest.trim().strip_prefix("with seed ") {
        Some(s) => Some(
            s.trim()
                .parse::<u64>()
                .map_err(|_| format!("invalid seed {s:?}"))?,
        ),
        None => None,
    };

    Ok(LogEvent::AreaGenerated(AreaEvent {
        level,
        area_id: area_id.to_string(),
        seed,
        timestamp: line.timestamp.map(str::to_string),
        raw_line: line.text.to_string(),
    }))
}

fn extract_level_up(line: &Line<'_>) -> Result<LogEvent, String> {
    let head = &line.body[..line.marker_at];
    let level = line.after_marker(LEVEL_MARKER).trim_end();
    let level: u32 = level
        .parse()
        .map_err(|_| format!("invalid character level {level:?}"))?;

    let (character, class) = head
        .strip_suffix(')')
        .and_then(|h| h.rsplit_once(" ("))
        .ok_or_else(|| "missing character class".to_string())?;
    if character.is_empty() || class.is_empty() {
        return Err("empty character or class".into());
    }

    Ok(LogEvent::LevelUp(LevelUpEvent {
        character: character.to_string(),
        class: class.to_string(),
        level,
        timestamp: line.timestamp.map(str::to_string),
        raw_line: line.text.to_string(),
    }))
}
