//! The parsed request/response trace record handed over by the parser.

/// One request/response exchange captured for a test, together with the
/// metadata the trace headers carried. Absent metadata is `None`, never an
/// empty string.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Item {
    pub test_id: Option<String>,
    pub test_name: Option<String>,
    pub profile: Option<String>,
    pub request: String,
    pub response: String,
    /// Assertion descriptions that passed, in order of appearance.
    pub passed: Vec<String>,
    /// Assertion descriptions that failed, in order of appearance.
    pub failed: Vec<String>,
}

impl Item {
    /// An item succeeded iff none of its assertions failed.
    pub fn is_successful(&self) -> bool {
        self.failed.is_empty()
    }
}
