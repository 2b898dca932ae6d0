use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Layout of the leading timestamp on every client log line.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// The player entered a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneEvent {
    pub zone_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub raw_line: String,
}

impl ZoneEvent {
    /// Parses the log timestamp, if the line carried one.
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(self.timestamp.as_deref())
    }
}

/// The client generated an instance of an area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaEvent {
    pub level: u32,
    pub area_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub raw_line: String,
}

impl AreaEvent {
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(self.timestamp.as_deref())
    }
}

/// A character reached a new level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelUpEvent {
    pub character: String,
    pub class: String,
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub raw_line: String,
}

impl LevelUpEvent {
    pub fn parsed_timestamp(&self) -> Option<NaiveDateTime> {
        parse_timestamp(self.timestamp.as_deref())
    }
}

/// Any event recognised in the client log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LogEvent {
    ZoneEntered(ZoneEvent),
    AreaGenerated(AreaEvent),
    LevelUp(LevelUpEvent),
}

impl LogEvent {
    /// Returns the full log line the event was parsed from.
    pub fn raw_line(&self) -> &str {
        match self {
            LogEvent::ZoneEntered(e) => &e.raw_line,
            LogEvent::AreaGenerated(e) => &e.raw_line,
            LogEvent::LevelUp(e) => &e.raw_line,
        }
    }

    /// Returns the zone event, if this is one.
    pub fn as_zone(&self) -> Option<&ZoneEvent> {
        match self {
            LogEvent::ZoneEntered(e) => Some(e),
            _ => None,
        }
    }

    /// Short name of the event kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::ZoneEntered(_) => "zoneEntered",
            LogEvent::AreaGenerated(_) => "areaGenerated",
            LogEvent::LevelUp(_) => "levelUp",
        }
    }
}

fn parse_timestamp(ts: Option<&str>) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(ts?, TIMESTAMP_FORMAT).ok()
}
