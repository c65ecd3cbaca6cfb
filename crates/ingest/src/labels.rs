//! Decoding of the option codes used by the join form.
//!
//! The chat form posts compact codes (`dif-medium`, `siz-large`, `top-tree`)
//! instead of numbers. Unknown codes are rejected rather than guessed.
use crate::error::IngestError;

const DIFFICULTIES: &[(&str, u32)] = &[
    ("dif-any", 0),
    ("dif-easy", 1),
    ("dif-medium", 2),
    ("dif-hard", 3),
];

const MEETING_SIZES: &[(&str, u32)] = &[
    ("siz-any", 0),
    ("siz-small", 2),
    ("siz-medium", 3),
    ("siz-large", 4),
];

const TOPICS: &[(&str, &str)] = &[
    ("top-array", "array"),
    ("top-string", "string"),
    ("top-sorting", "sorting"),
    ("top-tree", "tree"),
    ("top-greedy", "greedy"),
    ("top-stack", "stack"),
    ("top-recursion", "recursion"),
    ("top-math", "math"),
    ("top-geometry", "geometry"),
    ("top-divide_and_conquer", "divide-and-conquer"),
    ("top-any", "any"),
];

pub(crate) fn decode_difficulty(code: &str) -> Result<u32, IngestError> {
    lookup(DIFFICULTIES, code)
}

pub(crate) fn decode_meeting_size(code: &str) -> Result<u32, IngestError> {
    lookup(MEETING_SIZES, code)
}

pub(crate) fn decode_topic(code: &str) -> Result<String, IngestError> {
    lookup(TOPICS, code).map(str::to_string)
}

fn lookup<T: Copy>(table: &[(&str, T)], code: &str) -> Result<T, IngestError> {
    let code = code.trim();
    table
        .iter()
        .find(|(label, _)| *label == code)
        .map(|(_, value)| *value)
        .ok_or_else(|| IngestError::UnknownOption(code.to_string()))
}
