fn main() {
    println!("Run `cargo test -p log-fixtures` to replay the recorded client log fixtures.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use zonewatch_game_log::{LineParser, ParseOutcome, StartAt, TailOptions, Tailer};
    use zonewatch_locator::FixedPath;
    use zonewatch_protocol::LogEvent;

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_fixture(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    const EXPECTED_ZONES: &[&str] = &[
        "The Twilight Strand",
        "Lioneye's Watch",
        "The Coast",
        "The Tidal Island",
        "The Mud Flats",
        "The Submerged Passage",
    ];

    fn options(start_at: StartAt) -> TailOptions {
        TailOptions {
            start_at,
            lost_backoff_initial: Duration::ZERO,
            lost_backoff_max: Duration::ZERO,
            use_notify: false,
            ..TailOptions::default()
        }
    }

    fn append(path: &Path, bytes: &[u8]) {
        let mut f = fs::OpenOptions::new().append(true).open(path).unwrap();
        f.write_all(bytes).unwrap();
    }

    fn drain(tailer: &mut Tailer<FixedPath>, out: &mut Vec<LogEvent>) {
        loop {
            let outcome = tailer.poll(&mut |e: LogEvent| out.push(e));
            if !outcome.wants_repoll() {
                break;
            }
        }
    }

    fn zone_names(events: &[LogEvent]) -> Vec<&str> {
        events
            .iter()
            .filter_map(LogEvent::as_zone)
            .map(|z| z.zone_name.as_str())
            .collect()
    }

    /// Events the parser alone produces for the fixture, line by line.
    fn parsed_events(text: &str) -> Vec<LogEvent> {
        let parser = LineParser::default();
        text.lines()
            .filter_map(|line| match parser.parse_str(line) {
                ParseOutcome::Event(e) => Some(e),
                ParseOutcome::Anomaly { pattern, reason } => {
                    panic!("unexpected anomaly ({pattern}: {reason}) in {line}")
                }
                ParseOutcome::Ignored => None,
            })
            .collect()
    }

    #[test]
    fn parser_recognises_fixture_events() {
        let events = parsed_events(&load_fixture("client_sample.txt"));
        assert_eq!(zone_names(&events), EXPECTED_ZONES);

        let areas: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                LogEvent::AreaGenerated(a) => Some(a.area_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(areas, ["1_1_1", "1_1_town", "1_1_2", "1_1_2a", "1_1_3"]);

        let levels: Vec<u32> = events
            .iter()
            .filter_map(|e| match e {
                LogEvent::LevelUp(l) => Some(l.level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, [2, 3]);
    }

    #[test]
    fn chat_quoting_the_marker_is_ignored() {
        let events = parsed_events(&load_fixture("client_sample.txt"));
        assert!(
            events
                .iter()
                .all(|e| !e.raw_line().contains("#Zizaran"))
        );
    }

    #[test]
    fn replay_matches_parser() {
        let text = load_fixture("client_sample.txt");
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Client.txt");
        fs::write(&path, &text).unwrap();

        let mut tailer = Tailer::new(FixedPath(path), options(StartAt::Beginning));
        assert!(tailer.bind_initial().unwrap());
        let mut events = Vec::new();
        drain(&mut tailer, &mut events);

        assert_eq!(events, parsed_events(&text));
        let stats = tailer.stats().snapshot();
        assert_eq!(stats.lines_read, text.lines().count() as u64);
        assert_eq!(stats.parse_anomalies, 0);
    }

    #[test]
    fn chunked_writes_match_single_write() {
        let text = load_fixture("client_sample.txt");
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Client.txt");
        fs::write(&path, "").unwrap();

        let mut tailer = Tailer::new(FixedPath(path.clone()), options(StartAt::End));
        assert!(tailer.bind_initial().unwrap());

        let mut events = Vec::new();
        for chunk in text.as_bytes().chunks(7) {
            append(&path, chunk);
            drain(&mut tailer, &mut events);
        }
        assert_eq!(events, parsed_events(&text));
    }

    #[test]
    fn crlf_log_parses_the_same() {
        let text = load_fixture("client_sample.txt");
        let crlf = text.replace('\n', "\r\n");
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Client.txt");
        fs::write(&path, &crlf).unwrap();

        let mut tailer = Tailer::new(FixedPath(path), options(StartAt::Beginning));
        assert!(tailer.bind_initial().unwrap());
        let mut events = Vec::new();
        drain(&mut tailer, &mut events);
        assert_eq!(zone_names(&events), EXPECTED_ZONES);
    }

    #[test]
    fn tail_at_end_only_sees_new_session() {
        let text = load_fixture("client_sample.txt");
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Client.txt");
        fs::write(&path, &text).unwrap();

        let mut tailer = Tailer::new(FixedPath(path.clone()), options(StartAt::End));
        assert!(tailer.bind_initial().unwrap());
        let mut events = Vec::new();
        drain(&mut tailer, &mut events);
        assert!(events.is_empty());

        append(&path, text.as_bytes());
        drain(&mut tailer, &mut events);
        assert_eq!(zone_names(&events), EXPECTED_ZONES);
    }

    #[test]
    fn new_session_after_truncation() {
        let text = load_fixture("client_sample.txt");
        let (first, second) = text.split_at(text.find("2025/11/14 21:25:52").unwrap());
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("Client.txt");
        fs::write(&path, &text).unwrap();

        let mut tailer = Tailer::new(FixedPath(path.clone()), options(StartAt::Beginning));
        assert!(tailer.bind_initial().unwrap());
        let mut events = Vec::new();
        drain(&mut tailer, &mut events);
        assert_eq!(events.len(), parsed_events(&text).len());

        // The client starts over with a fresh file at the same path.
        fs::write(&path, second).unwrap();
        let mut after = Vec::new();
        drain(&mut tailer, &mut after);
        assert_eq!(after, parsed_events(second));
        assert!(!first.is_empty());
        assert_eq!(tailer.stats().snapshot().rotations, 1);
    }

    #[test]
    fn events_serialize_as_tagged_json() {
        let events = parsed_events(&load_fixture("client_sample.txt"));
        let values: Vec<serde_json::Value> = events
            .iter()
            .map(|e| serde_json::to_value(e).unwrap())
            .collect();

        assert_eq!(values[0]["type"], "areaGenerated");
        assert_eq!(values[0]["areaId"], "1_1_1");
        assert_eq!(values[0]["seed"], 2701543536u64);
        assert_eq!(values[1]["type"], "zoneEntered");
        assert_eq!(values[1]["zoneName"], "The Twilight Strand");
        assert_eq!(values[1]["timestamp"], "2025/11/14 21:20:07");
        assert_eq!(values[2]["type"], "levelUp");
        assert_eq!(values[2]["character"], "AbyssWalker");
    }
}
