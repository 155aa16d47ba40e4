// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Security version numbers.
//!
//! An SVN is a dot-separated sequence of non-negative integers, compared
//! component by component: `2.10.0` is newer than `2.9.9`, and `1.0` is
//! older than `1.0.1`. SVN gating prevents rollback to a superseded,
//! less-restrictive fragment.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid SVN {value:?}: {reason}")]
pub struct SvnParseError {
    pub value: String,
    pub reason: String,
}

/// A parsed security version number.
///
/// Ordering is componentwise-lexicographic; a version that is a strict
/// prefix of another orders below it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SvnVersion(Vec<u64>);

impl SvnVersion {
    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for SvnVersion {
    type Err = SvnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |reason: &str| SvnParseError {
            value: s.to_string(),
            reason: reason.to_string(),
        };

        if s.is_empty() {
            return Err(err("empty version string"));
        }

        let mut components = Vec::new();
        for part in s.split('.') {
            if part.is_empty() {
                return Err(err("empty version component"));
            }
            let n: u64 = part
                .parse()
                .map_err(|_| err("version component is not a non-negative integer"))?;
            components.push(n);
        }

        Ok(SvnVersion(components))
    }
}

impl fmt::Display for SvnVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
