use serde::{Deserialize, Serialize};

/// Source location attached to every term, mirroring the wire shape exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub filename: String,
    pub line: u32,
    pub start: u32,
    pub end: u32,
}

impl Location {
    pub fn dummy() -> Self {
        Location {
            filename: String::new(),
            line: 0,
            start: 0,
            end: 0,
        }
    }
}
