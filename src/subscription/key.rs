use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::KEY_SEPARATOR;
use crate::constants::WILDCARD;

/// Identity of a value in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigKey {
    pub group: String,
    pub id: String,
}

impl ConfigKey {
    pub fn new(
        group: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
        }
    }

    /// True when either half carries the wildcard marker
    pub fn is_pattern(&self) -> bool {
        self.group.contains(WILDCARD) || self.id.contains(WILDCARD)
    }

    /// Checks whether a concrete key is selected by this (possibly wildcard) key
    pub fn matches(
        &self,
        other: &ConfigKey,
    ) -> bool {
        wildcard_match(&self.group, &other.group) && wildcard_match(&self.id, &other.id)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}{}{}", self.group, KEY_SEPARATOR, self.id)
    }
}

/// Glob-style match where `*` stands for any run of characters, including none.
pub fn wildcard_match(
    pattern: &str,
    text: &str,
) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == WILDCARD {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, consumed)) = backtrack {
            p = star + 1;
            t = consumed + 1;
            backtrack = Some((star, consumed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == WILDCARD)
}
