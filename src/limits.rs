//! Decode-time bounds on attacker-controlled length prefixes, generalizing
//! the fixed `MAX_*_LENGTH` constants into a value callers can configure per
//! `Buffer`.
//!
//! A length prefix is read and validated against the relevant bound before
//! any allocation is made for it, so a corrupt or hostile length cannot by
//! itself force an oversized allocation ahead of the underflow check that
//! would otherwise catch it.

/// Upper bounds on the three shapes of length-prefixed data this codec
/// decodes: strings/byte strings, flat arrays (primitive arrays, Variant
/// arrays, and `ListOf` fields), and structures reached through a `ListOf`
/// of a struct type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_binary_length: usize,
    pub max_array_length: usize,
    pub max_struct_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_binary_length: 1024 * 1024 * 1024, // 1 GB
            max_array_length: 1024 * 1024,         // 1 million elements
            max_struct_length: 1024 * 1024,         // 1 million elements
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let limits = Limits::default();
        assert_eq!(limits.max_binary_length, 1 << 30);
        assert_eq!(limits.max_array_length, 1 << 20);
    }
}
