//! Best-effort conversation replay from transcript text.
//!
//! Recognises `[ts] USER:` / `[ts] AGENT:` transcript lines and plain
//! `User:` / `Assistant:` lines. Unprefixed lines continue the previous turn.
//! Tool calls are not reconstructed: only user and assistant text survives.

use std::sync::OnceLock;

use regex::Regex;

use crate::types::Turn;

/// Marker written to transcripts by `reset()`. Replay starts over after it.
pub const RESET_MARKER: &str = "=== CONVERSATION RESET ===";

#[derive(Clone, Copy, PartialEq)]
enum Speaker {
    User,
    Assistant,
}

fn turn_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\[[^\]]*\] (?P<ts>USER|AGENT): |(?P<plain>User|Assistant): )(?P<text>.*)$")
            .expect("valid turn regex")
    })
}

fn other_entry() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\[[^\]]*\] |TOOL: |===)").expect("valid entry regex"))
}

/// Rebuild user/assistant turns from transcript text.
pub fn parse_transcript(text: &str) -> Vec<Turn> {
    let mut turns: Vec<(Speaker, String)> = Vec::new();
    // False while inside a non-dialogue entry (tool I/O, headers).
    let mut folding = false;

    for line in text.lines() {
        if line.contains(RESET_MARKER) {
            turns.clear();
            folding = false;
            continue;
        }

        if let Some(caps) = turn_line().captures(line) {
            let tag = caps
                .name("ts")
                .or_else(|| caps.name("plain"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let speaker = match tag {
                "USER" | "User" => Speaker::User,
                _ => Speaker::Assistant,
            };
            let body = caps.name("text").map(|m| m.as_str()).unwrap_or_default();
            turns.push((speaker, body.to_string()));
            folding = true;
            continue;
        }

        if other_entry().is_match(line) {
            folding = false;
            continue;
        }

        if folding {
            if let Some((_, body)) = turns.last_mut() {
                body.push('\n');
                body.push_str(line);
            }
        }
    }

    turns
        .into_iter()
        .map(|(speaker, body)| {
            let body = body.trim_end().to_string();
            match speaker {
                Speaker::User => Turn::user(body),
                Speaker::Assistant => Turn::assistant(body),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamped_transcript() {
        let log = "\
=== AI Agent Conversation Log Started at 2024-05-01 10:00:00 ===
Provider: gemini, Model: gemini-2.0-flash-exp

[2024-05-01 10:00:05] USER: how much disk is free?
[2024-05-01 10:00:06] TOOL: run_bash
  Input: {\"command\":\"df -h\"}
  Result: {\"stdout\":\"...\"}
[2024-05-01 10:00:07] AGENT: You have 12G free.
The root volume is 80% full.
";
        let turns = parse_transcript(log);
        assert_eq!(
            turns,
            vec![
                Turn::user("how much disk is free?"),
                Turn::assistant("You have 12G free.\nThe root volume is 80% full."),
            ]
        );
    }

    #[test]
    fn test_parse_plain_prefixes() {
        let text = "User: hi\nAssistant: hello\nthere\nUser: bye";
        let turns = parse_transcript(text);
        assert_eq!(
            turns,
            vec![
                Turn::user("hi"),
                Turn::assistant("hello\nthere"),
                Turn::user("bye"),
            ]
        );
    }

    #[test]
    fn test_tool_lines_do_not_fold_into_turns() {
        let text = "[t] USER: go\nTOOL: read_file\n  Input: {}\n[t] AGENT: ok";
        let turns = parse_transcript(text);
        assert_eq!(turns, vec![Turn::user("go"), Turn::assistant("ok")]);
    }

    #[test]
    fn test_reset_marker_discards_earlier_turns() {
        let text = "[t] USER: a\n[t] AGENT: b\n\n[t] === CONVERSATION RESET ===\n[t] USER: c";
        assert_eq!(parse_transcript(text), vec![Turn::user("c")]);
    }

    #[test]
    fn test_leading_unprefixed_lines_are_dropped() {
        assert!(parse_transcript("just some text\nmore").is_empty());
    }
}
