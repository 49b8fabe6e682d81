//! Locate the operation that caused an A&AI bulk request to fail

use std::sync::LazyLock;

use regex::Regex;

/// Matches the two ways A&AI names a failing operation in an error response:
///
/// * `... Error with operation <N> ...` for validation errors of a single operation
/// * `... Operation <N> with action ...` for errors raised while processing an operation,
///   e.g., a node that could not be found
///
/// The match is anchored at the start of the text and `.` does not cross line breaks.
static FAILED_OPERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:.*Error with operation (?P<operation_index>\d+)|.*Operation (?P<operation_index_2>\d+) with action)",
    )
    .expect("failed operation pattern is valid")
});

/// Extract the zero-based index of the operation that A&AI blamed for rejecting a bulk
/// request from the `response_text` of the error
///
/// Returns `None` when there is no text, when neither phrasing is found, or when the index
/// does not fit in a `usize`.
pub fn failed_operation_index(response_text: Option<&str>) -> Option<usize> {
    let captures = FAILED_OPERATION.captures(response_text?)?;
    captures
        .name("operation_index")
        .or_else(|| captures.name("operation_index_2"))?
        .as_str()
        .parse()
        .ok()
}
