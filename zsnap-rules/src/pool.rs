//! Pool identifiers.
//!
//! Scrub and resilver state is tracked per pool, so filesystems are grouped
//! by the leading run of pool-name characters in their name. The default
//! set follows the historical ZFS component naming rules; deployments whose
//! pool names use other characters extend it from the configuration.

/// Characters allowed in a pool id besides ASCII letters.
pub const DEFAULT_POOL_PUNCTUATION: &str = "_:.-";

/// The set of characters that may appear in a pool id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PoolCharset {
    extra: String,
}

impl PoolCharset {
    /// Default set extended with every character in `extra`.
    pub fn with_extra(extra: &str) -> Self {
        Self {
            extra: extra.to_string(),
        }
    }

    pub fn allows(&self, c: char) -> bool {
        c.is_ascii_alphabetic() || DEFAULT_POOL_PUNCTUATION.contains(c) || self.extra.contains(c)
    }

    /// The maximal leading substring of `filesystem` made of allowed
    /// characters. Empty if the first character is not allowed.
    pub fn pool_id<'a>(&self, filesystem: &'a str) -> &'a str {
        let end = filesystem
            .char_indices()
            .find(|&(_, c)| !self.allows(c))
            .map_or(filesystem.len(), |(i, _)| i);
        &filesystem[..end]
    }
}
