//! Output comparison
//!
//! The only normalization is optional trimming of leading and trailing
//! whitespace and optional case folding. Interior whitespace is significant.

/// Compare actual program output against the expected output
///
/// `None` is treated as the empty string. Comparison is ordinal, per
/// character; with `ignore_case` each character is upper-cased on its own, so
/// the lengths of both sides never change.
pub fn outputs_match(
    actual: Option<&str>,
    expected: Option<&str>,
    ignore_case: bool,
    ignore_whitespace: bool,
) -> bool {
    let mut actual = actual.unwrap_or_default();
    let mut expected = expected.unwrap_or_default();

    if ignore_whitespace {
        actual = actual.trim();
        expected = expected.trim();
    }

    if ignore_case {
        actual.chars().map(fold_case).eq(expected.chars().map(fold_case))
    } else {
        actual == expected
    }
}

/// Simple upper-case mapping; characters whose upper case is longer than one
/// character (`ß`, `ﬁ`) stay as they are
fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}
