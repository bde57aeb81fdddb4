use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{KeyCode, VoterId},
    db::voter::Voter,
};

/// An API-friendly voter description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterDescription {
    pub id: VoterId,
    pub name: String,
    pub key_code: KeyCode,
    pub created_at: DateTime<Utc>,
}

impl From<Voter> for VoterDescription {
    fn from(voter: Voter) -> Self {
        Self {
            id: voter.id,
            name: voter.voter.name,
            key_code: voter.voter.key_code,
            created_at: voter.voter.created_at,
        }
    }
}

/// Outcome of a bulk import: how many lines became voters, how many were
/// skipped (malformed, bad key code, or duplicate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub imported: u32,
    pub skipped: u32,
}

/// Parse one `name,keyCode` line of an import source.
/// Returns `None` for anything that should be skipped.
pub fn parse_import_line(line: &str) -> Option<(String, KeyCode)> {
    let (name, raw_code) = line.split_once(',')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let key_code = KeyCode::try_from(raw_code.trim().to_string()).ok()?;
    Some((name.to_string(), key_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_lines() {
        let (name, code) = parse_import_line("Alice,AB12CD").unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(code.as_str(), "AB12CD");

        // Whitespace is trimmed and the code normalised.
        let (name, code) = parse_import_line("  Bob Smith , ef34gh ").unwrap();
        assert_eq!(name, "Bob Smith");
        assert_eq!(code.as_str(), "EF34GH");
    }

    #[test]
    fn skips_malformed_lines() {
        assert!(parse_import_line("BadLine").is_none()); // no separator
        assert!(parse_import_line(",AB12CD").is_none()); // no name
        assert!(parse_import_line("Alice,").is_none()); // no code
        assert!(parse_import_line("Alice,TOOLONG1").is_none());
        assert!(parse_import_line("Alice,AB-12D").is_none());
    }
}
