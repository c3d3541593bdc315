//! Renders a test aggregate into the cell values that get written.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::test::Test;

/// Destination cells cap out around 50k characters; longer values are
/// truncated, never rejected.
pub const CELL_MAX_CHARS: usize = 50_000;

/// Divider drawn between profile traces in `test` mode.
const TRACE_DIVIDER: &str = "--------------------------------------------------";

/// The `InvalidMode` error kind: an unrecognised rendering mode string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("invalid mode: {0}")]
pub struct ModeError(pub String);

/// How an aggregate's items are laid out over cells.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    /// One cell per message: request then response, per item.
    Message,
    /// One cell per item: request and response joined by a blank line.
    Profile,
    /// A single cell holding every trace, divider lines in between.
    Test,
}

impl FromStr for Mode {
    type Err = ModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Mode::Message),
            "profile" => Ok(Mode::Profile),
            "test" => Ok(Mode::Test),
            other => Err(ModeError(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Message => "message",
            Mode::Profile => "profile",
            Mode::Test => "test",
        })
    }
}

/// The message-column values for `test`, in item order. `message` yields
/// `2 × items` values, `profile` one per item, and `test` exactly one value
/// even for an empty aggregate. Every value is truncated to
/// `min(max_chars, CELL_MAX_CHARS)` characters.
pub fn compose(test: &Test, mode: Mode, max_chars: usize) -> Vec<String> {
    let limit = max_chars.min(CELL_MAX_CHARS);
    match mode {
        Mode::Message => test
            .items()
            .iter()
            .flat_map(|it| [truncate(&it.request, limit), truncate(&it.response, limit)])
            .collect(),
        Mode::Profile => test
            .items()
            .iter()
            .map(|it| truncate(&profile_trace(&it.request, &it.response), limit))
            .collect(),
        Mode::Test => {
            let traces: Vec<String> = test
                .items()
                .iter()
                .map(|it| profile_trace(&it.request, &it.response))
                .collect();
            vec![truncate(
                &traces.join(&format!("\n{TRACE_DIVIDER}\n")),
                limit,
            )]
        }
    }
}

/// The result-column value: `OK` iff every item passed.
pub fn compose_result(test: &Test) -> &'static str {
    if test.is_successful() { "OK" } else { "NOK" }
}

/// The assertions-column value: per item its failed (and, on request,
/// passed) assertion lines. With more than one item each block is headed by
/// the item's profile tag and its lines indented one space to nest under
/// it.
pub fn compose_assertions(test: &Test, include_passed: bool) -> String {
    let nested = test.items().len() > 1;
    let mut blocks: Vec<String> = Vec::new();
    for item in test.items() {
        let mut lines: Vec<&str> = item.failed.iter().map(String::as_str).collect();
        if include_passed {
            lines.extend(item.passed.iter().map(String::as_str));
        }
        if lines.is_empty() {
            continue;
        }
        if nested {
            let mut block = item.profile.clone().unwrap_or_default();
            for line in lines {
                block.push_str("\n ");
                block.push_str(line);
            }
            blocks.push(block);
        } else {
            blocks.push(lines.join("\n"));
        }
    }
    blocks.join("\n")
}

fn profile_trace(request: &str, response: &str) -> String {
    format!("{request}\n\n{response}")
}

/// Cap a value at `max_chars` characters, dropping trailing content.
fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{Test, TestLocations};
    use tracepub_common::Item;

    fn aggregate(n: usize) -> Test {
        let mut t = Test::new(
            "T1",
            None,
            TestLocations {
                id: None,
                name: None,
                first_message: "S!D2".parse().unwrap(),
                result: None,
                asserts: None,
            },
            false,
        );
        for i in 0..n {
            t.append(Item {
                test_id: Some("T1".to_string()),
                profile: Some(format!("profile-{i}")),
                request: format!("request {i}"),
                response: format!("response {i}"),
                ..Item::default()
            });
        }
        t
    }

    #[test]
    fn mode_parses_known_strings_only() {
        assert_eq!("message".parse::<Mode>().unwrap(), Mode::Message);
        assert_eq!("profile".parse::<Mode>().unwrap(), Mode::Profile);
        assert_eq!("test".parse::<Mode>().unwrap(), Mode::Test);
        assert_eq!(
            "bogus".parse::<Mode>(),
            Err(ModeError("bogus".to_string()))
        );
    }

    #[test]
    fn message_mode_interleaves_request_and_response() {
        let values = compose(&aggregate(3), Mode::Message, CELL_MAX_CHARS);
        assert_eq!(values.len(), 6);
        assert_eq!(values[0], "request 0");
        assert_eq!(values[1], "response 0");
        assert_eq!(values[4], "request 2");
        assert_eq!(values[5], "response 2");
    }

    #[test]
    fn profile_mode_joins_pairs_with_a_blank_line() {
        let values = compose(&aggregate(2), Mode::Profile, CELL_MAX_CHARS);
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], "request 0\n\nresponse 0");
    }

    #[test]
    fn test_mode_is_always_one_value() {
        let values = compose(&aggregate(3), Mode::Test, CELL_MAX_CHARS);
        assert_eq!(values.len(), 1);
        // Divider between consecutive traces, none leading or trailing.
        assert_eq!(values[0].matches(TRACE_DIVIDER).count(), 2);
        assert!(values[0].starts_with("request 0"));
        assert!(values[0].ends_with("response 2"));

        let empty = compose(&aggregate(0), Mode::Test, CELL_MAX_CHARS);
        assert_eq!(empty, vec![String::new()]);
    }

    #[test]
    fn values_are_truncated_to_the_smaller_limit() {
        let mut t = aggregate(0);
        t.append(Item {
            request: "x".repeat(100),
            response: "désolé".repeat(10_000),
            ..Item::default()
        });
        let values = compose(&t, Mode::Message, 40);
        assert_eq!(values[0].chars().count(), 40);
        assert_eq!(values[1].chars().count(), 40);
        // A limit above the global cap still caps at the cap.
        let values = compose(&t, Mode::Message, usize::MAX);
        assert_eq!(values[1].chars().count(), CELL_MAX_CHARS);
    }

    #[test]
    fn result_reflects_item_success() {
        let mut t = aggregate(1);
        assert_eq!(compose_result(&t), "OK");
        t.append(Item {
            failed: vec!["broken".to_string()],
            ..Item::default()
        });
        assert_eq!(compose_result(&t), "NOK");
    }

    #[test]
    fn assertions_for_a_single_item_are_flat() {
        let mut t = aggregate(0);
        t.append(Item {
            passed: vec!["status 200".to_string()],
            failed: vec!["body empty".to_string()],
            ..Item::default()
        });
        assert_eq!(compose_assertions(&t, false), "body empty");
        assert_eq!(compose_assertions(&t, true), "body empty\nstatus 200");
    }

    #[test]
    fn assertions_for_several_items_nest_under_profile_tags() {
        let mut t = aggregate(0);
        for (profile, failed) in [("p-one", "too slow"), ("p-two", "wrong code")] {
            t.append(Item {
                profile: Some(profile.to_string()),
                failed: vec![failed.to_string()],
                ..Item::default()
            });
        }
        assert_eq!(
            compose_assertions(&t, false),
            "p-one\n too slow\np-two\n wrong code"
        );
    }

    #[test]
    fn items_without_assertions_are_omitted() {
        let mut t = aggregate(2);
        t.append(Item {
            profile: Some("p-three".to_string()),
            failed: vec!["boom".to_string()],
            ..Item::default()
        });
        assert_eq!(compose_assertions(&t, false), "p-three\n boom");
    }
}
