//! The `Author-Title` file naming convention.
//!
//! Documents without embedded metadata (PDFs) are expected to be named
//! `{author}-{title}.pdf`, with underscores standing in for spaces:
//! `Frank_Herbert-Dune.pdf`.

use std::str::FromStr;

use crate::consts::WHITESPACE_REGEX;
use crate::error::{Error, ErrorKind, Result};

const SEPARATOR: char = '-';

/// Author and title parsed from a document's base name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameMetadata {
    pub author: String,
    pub title: String,
}
impl FilenameMetadata {
    /// Parses a base name (file stem, no extension).
    ///
    /// Splits on the first `-`: the left side is the author, the right side
    /// the title. Both sides are [normalized](normalize). A missing separator
    /// or a side that's empty after normalization is
    /// [`MalformedFilename`](ErrorKind::MalformedFilename).
    ///
    /// # Examples
    ///
    /// ```
    /// use narrate_extract::FilenameMetadata;
    /// let parsed = FilenameMetadata::parse("Frank_Herbert-Dune").unwrap();
    /// assert_eq!(parsed.author, "Frank Herbert");
    /// assert_eq!(parsed.title, "Dune");
    ///
    /// assert!(FilenameMetadata::parse("Dune").is_err());
    /// ```
    pub fn parse(base: &str) -> Result<Self> {
        let malformed = || Error::from(ErrorKind::MalformedFilename(base.to_string()));
        let (author, title) = base.split_once(SEPARATOR).ok_or_else(malformed)?;
        let (author, title) = (normalize(author), normalize(title));
        if author.is_empty() || title.is_empty() {
            return Err(malformed());
        }
        Ok(Self { author, title })
    }
}
impl FromStr for FilenameMetadata {
    type Err = Error;
    fn from_str(base: &str) -> Result<Self> {
        Self::parse(base)
    }
}

/// Turns a file name fragment into display text: underscores become spaces,
/// runs of whitespace collapse into one, and the first letter of every word
/// is upper-cased. The rest of each word is left alone (`McDonald` stays
/// `McDonald`).
pub fn normalize(fragment: &str) -> String {
    let spaced = fragment.replace('_', " ");
    WHITESPACE_REGEX.split(spaced.trim()).filter(|word| !word.is_empty()).map(capitalize).collect::<Vec<_>>().join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
