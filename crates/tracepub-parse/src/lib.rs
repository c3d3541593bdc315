//! Parser for the textual trace log produced by the API-testing tool.
//!
//! A trace is a sequence of items. Each item starts with a header block
//! (`Profile:`, `Test:`, and optional `Assert-OK:`/`Assert-KO:` lines)
//! closed by a line of `=` marks, followed by the request text closed by a
//! line of `-` marks, followed by the response text closed by a line of `*`
//! marks:
//!
//! ```text
//! Profile: +440000000000
//! Test: TL00-01 - Send a message
//! ==============================
//! POST /v1/messages HTTP/1.1
//! ...
//! ------------------------------
//! HTTP/1.1 200 OK
//! ...
//! ******************************
//! ```
//!
//! Items are produced lazily, one per pull, so arbitrarily long logs are
//! never held in memory as a whole.

use std::io::BufRead;

use thiserror::Error;
use tracepub_common::Item;

const MARK_SIZE: usize = 30;
const END_OF_HEADERS_MARK: &str = "==============================";
const END_OF_REQUEST_MARK: &str = "------------------------------";
const END_OF_RESPONSE_MARK: &str = "******************************";

const PROFILE_HEADER_KEY: &str = "Profile:";
const TEST_HEADER_KEY: &str = "Test:";
const ASSERT_OK_HEADER_KEY: &str = "Assert-OK:";
const ASSERT_KO_HEADER_KEY: &str = "Assert-KO:";

/// Separates the test identifier from its display name in a `Test:` header.
const TEST_SIGNATURE_SEP: &str = " - ";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unexpected end of input while reading the {0} section")]
    UnexpectedEof(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pull-based reader over a trace log. Yields one [`Item`] per complete
/// request/response pair; completion noise after the last item (blank
/// lines) ends the stream cleanly.
pub struct TraceReader<R: BufRead> {
    lines: std::io::Lines<R>,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(input: R) -> Self {
        TraceReader {
            lines: input.lines(),
        }
    }

    /// Parse the next item, or `Ok(None)` at end of input.
    pub fn next_item(&mut self) -> Result<Option<Item>, ParseError> {
        let Some(first) = self.skip_blank_lines()? else {
            return Ok(None);
        };
        let mut item = self.parse_headers(first)?;
        item.request = self.parse_section(END_OF_REQUEST_MARK, "request")?;
        item.response = self.parse_section(END_OF_RESPONSE_MARK, "response")?;
        Ok(Some(item))
    }

    /// Advance to the first non-blank line, returning it.
    fn skip_blank_lines(&mut self) -> Result<Option<String>, ParseError> {
        for line in self.lines.by_ref() {
            let line = line?;
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn read_line(&mut self, section: &'static str) -> Result<String, ParseError> {
        match self.lines.next() {
            Some(line) => Ok(line?),
            None => Err(ParseError::UnexpectedEof(section)),
        }
    }

    fn parse_headers(&mut self, first: String) -> Result<Item, ParseError> {
        let mut item = Item::default();
        let mut line = first;
        while !is_section_mark(&line, END_OF_HEADERS_MARK) {
            let trimmed = line.trim();
            if let Some(value) = header_value(trimmed, PROFILE_HEADER_KEY) {
                item.profile = value;
            } else if let Some(value) = header_value(trimmed, TEST_HEADER_KEY) {
                let (id, name) = split_test_signature(value.as_deref().unwrap_or(""));
                item.test_id = id;
                item.test_name = name;
            } else if let Some(Some(value)) = header_value(trimmed, ASSERT_OK_HEADER_KEY) {
                item.passed.push(value);
            } else if let Some(Some(value)) = header_value(trimmed, ASSERT_KO_HEADER_KEY) {
                item.failed.push(value);
            }
            line = self.read_line("headers")?;
        }
        Ok(item)
    }

    /// Accumulate raw lines until the section's end mark.
    fn parse_section(
        &mut self,
        end_mark: &str,
        section: &'static str,
    ) -> Result<String, ParseError> {
        let mut body = String::new();
        let mut line = self.read_line(section)?;
        while !is_section_mark(&line, end_mark) {
            if !body.is_empty() {
                body.push('\n');
            }
            body.push_str(&line);
            line = self.read_line(section)?;
        }
        Ok(body)
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<Item, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_item().transpose()
    }
}

/// A section ends on any line that starts with the full 30-character mark.
fn is_section_mark(line: &str, mark: &str) -> bool {
    debug_assert_eq!(mark.len(), MARK_SIZE);
    line.trim_start().starts_with(mark)
}

/// Value of a `Key: value` header line, `None` if the line is not that
/// header, `Some(None)` if the header is present but empty.
fn header_value(line: &str, key: &str) -> Option<Option<String>> {
    let rest = line.strip_prefix(key)?;
    let value = rest.trim();
    if value.is_empty() {
        Some(None)
    } else {
        Some(Some(value.to_string()))
    }
}

/// Split `TL00-01 - Send a message` into identifier and name. A signature
/// without the separator is both; an empty signature is neither.
fn split_test_signature(signature: &str) -> (Option<String>, Option<String>) {
    if signature.is_empty() {
        return (None, None);
    }
    match signature.split_once(TEST_SIGNATURE_SEP) {
        Some((id, name)) => (Some(id.trim().to_string()), Some(name.trim().to_string())),
        None => (
            Some(signature.to_string()),
            Some(signature.to_string()),
        ),
    }
}
