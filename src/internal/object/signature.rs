//! The `Signature` identifies an author or committer: a name, an email address, and the
//! moment in time the action was taken, exactly as Git embeds it in a commit or tag object.
//!
//! ```text
//! <name> <<email>> <unix-seconds> <+HHMM|-HHMM>
//! ```

use std::fmt::Display;
use std::str::FromStr;

use bincode::{Decode, Encode};
use bstr::ByteSlice;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::GitError;

/// Which role a [`Signature`] plays on a commit; a tag only ever has a `Tagger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Decode, Encode)]
pub enum SignatureType {
    Author,
    Committer,
    Tagger,
}

impl Display for SignatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SignatureType::Author => write!(f, "author"),
            SignatureType::Committer => write!(f, "committer"),
            SignatureType::Tagger => write!(f, "tagger"),
        }
    }
}

impl FromStr for SignatureType {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "author" => Ok(SignatureType::Author),
            "committer" => Ok(SignatureType::Committer),
            "tagger" => Ok(SignatureType::Tagger),
            _ => Err(GitError::InvalidSignatureType(s.to_owned())),
        }
    }
}

/// A Git author/committer/tagger line: name, email, and a UTC instant with the original
/// timezone offset preserved so it round-trips through [`to_data`](Self::to_data).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Decode, Encode)]
pub struct Signature {
    pub signature_type: SignatureType,
    pub name: String,
    pub email: String,
    pub timestamp: i64,
    /// Offset in minutes east of UTC, e.g. `+0800` is `480`.
    pub offset_minutes: i32,
}

impl Signature {
    pub fn new(signature_type: SignatureType, name: String, email: String) -> Self {
        let now = Utc::now();
        Signature {
            signature_type,
            name,
            email,
            timestamp: now.timestamp(),
            offset_minutes: 0,
        }
    }

    /// The instant this signature records, in UTC.
    pub fn when(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.timestamp, 0).single().unwrap_or_else(Utc::now)
    }

    /// The instant this signature records, in its original timezone.
    pub fn when_local(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.offset_minutes * 60)?;
        offset.timestamp_opt(self.timestamp, 0).single()
    }

    /// Parse one `"author Name <email> <ts> <+HHMM>"`-shaped line (the leading
    /// `author`/`committer`/`tagger` keyword is required).
    pub fn from_data(data: Vec<u8>) -> Result<Signature, GitError> {
        let text = data
            .to_str()
            .map_err(|e| GitError::InvalidCommit(e.to_string()))?;
        let mut parts = text.splitn(2, ' ');
        let kind = parts
            .next()
            .ok_or_else(|| GitError::InvalidCommit("empty signature line".to_owned()))?;
        let signature_type = SignatureType::from_str(kind)?;
        let rest = parts
            .next()
            .ok_or_else(|| GitError::InvalidCommit("missing signature body".to_owned()))?;

        let email_start = rest
            .find('<')
            .ok_or_else(|| GitError::InvalidCommit("missing '<' in signature".to_owned()))?;
        let email_end = rest
            .find('>')
            .ok_or_else(|| GitError::InvalidCommit("missing '>' in signature".to_owned()))?;
        let name = rest[..email_start].trim().to_owned();
        let email = rest[email_start + 1..email_end].to_owned();

        let tail = rest[email_end + 1..].trim();
        let mut tail_parts = tail.split_whitespace();
        let timestamp: i64 = tail_parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| GitError::InvalidCommit("missing timestamp in signature".to_owned()))?;
        let offset_minutes = tail_parts
            .next()
            .map(parse_offset)
            .transpose()?
            .unwrap_or(0);

        Ok(Signature {
            signature_type,
            name,
            email,
            timestamp,
            offset_minutes,
        })
    }

    pub fn to_data(&self) -> Result<Vec<u8>, GitError> {
        Ok(format!(
            "{} {} <{}> {} {}",
            self.signature_type,
            self.name,
            self.email,
            self.timestamp,
            format_offset(self.offset_minutes)
        )
        .into_bytes())
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

fn parse_offset(s: &str) -> Result<i32, GitError> {
    if s.len() != 5 || !(s.starts_with('+') || s.starts_with('-')) {
        return Err(GitError::InvalidCommit(format!("bad timezone offset: {s}")));
    }
    let sign = if s.starts_with('-') { -1 } else { 1 };
    let hours: i32 = s[1..3]
        .parse()
        .map_err(|_| GitError::InvalidCommit(format!("bad timezone offset: {s}")))?;
    let minutes: i32 = s[3..5]
        .parse()
        .map_err(|_| GitError::InvalidCommit(format!("bad timezone offset: {s}")))?;
    Ok(sign * (hours * 60 + minutes))
}

fn format_offset(total_minutes: i32) -> String {
    let sign = if total_minutes < 0 { '-' } else { '+' };
    let total_minutes = total_minutes.abs();
    format!("{}{:02}{:02}", sign, total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_author_line() {
        let line = b"author mega <admin@mega.org> 1700000000 +0800".to_vec();
        let sig = Signature::from_data(line).unwrap();
        assert_eq!(sig.signature_type, SignatureType::Author);
        assert_eq!(sig.name, "mega");
        assert_eq!(sig.email, "admin@mega.org");
        assert_eq!(sig.timestamp, 1700000000);
        assert_eq!(sig.offset_minutes, 480);
    }

    #[test]
    fn round_trips_through_to_data() {
        let line = b"committer Jane Doe <jane@example.com> 1690000000 -0500".to_vec();
        let sig = Signature::from_data(line.clone()).unwrap();
        assert_eq!(sig.to_data().unwrap(), line);
    }

    #[test]
    fn rejects_unknown_signature_type() {
        let line = b"reviewer Jane <jane@example.com> 1690000000 +0000".to_vec();
        assert!(Signature::from_data(line).is_err());
    }

    #[test]
    fn negative_offset_formats_with_minus_sign() {
        assert_eq!(format_offset(-330), "-0530");
        assert_eq!(format_offset(480), "+0800");
    }
}
