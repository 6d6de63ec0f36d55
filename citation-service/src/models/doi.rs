//! Digital Object Identifier value type.
//!
//! A DOI is stored in normalised form: lower case, without a `doi:` or
//! `https://doi.org/` prefix. Two DOIs are equal exactly when their
//! normalised forms are equal, which is what the highlight update rule
//! compares against.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

static DOI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^10\.\d{4,9}/[-._;()/:a-z0-9]+$").expect("DOI pattern is a valid regex")
});

const DOI_PREFIXES: [&str; 2] = ["doi:", "https://doi.org/"];

/// Width of the `highlights.doi` column.
pub const MAX_DOI_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid DOI format")]
pub struct InvalidDoi;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Doi(String);

impl Doi {
    /// Normalise and validate a user supplied DOI.
    pub fn parse(input: &str) -> Result<Self, InvalidDoi> {
        let lowered = input.trim().to_lowercase();
        let bare = DOI_PREFIXES
            .iter()
            .find_map(|prefix| lowered.strip_prefix(prefix))
            .unwrap_or(&lowered);

        if bare.len() <= MAX_DOI_LENGTH && DOI_PATTERN.is_match(bare) {
            Ok(Self(bare.to_string()))
        } else {
            Err(InvalidDoi)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Doi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Doi {
    type Error = InvalidDoi;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Doi::parse(&value)
    }
}

impl From<Doi> for String {
    fn from(doi: Doi) -> Self {
        doi.0
    }
}
