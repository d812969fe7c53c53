//! Partitioners: token derivation and native decorated-key order.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Position of a partition on the ring.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Token {
    /// Signed 64-bit hash token.
    Long(i64),
    /// Token equal to the raw key bytes.
    Bytes(Bytes),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long(t) => write!(f, "{t}"),
            Self::Bytes(b) => write_hex(f, b),
        }
    }
}

/// A partition key paired with its token.
///
/// The derived order (token, then key bytes) is the storage engine's
/// native partition order for every partitioner in this module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DecoratedKey {
    token: Token,
    key: Bytes,
}

impl DecoratedKey {
    /// Creates a decorated key. Prefer [`Partitioner::decorate`].
    #[must_use]
    pub fn new(token: Token, key: Bytes) -> Self {
        Self { token, key }
    }

    /// Returns the token.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn key(&self) -> &Bytes {
        &self.key
    }
}

impl fmt::Display for DecoratedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.token)?;
        write_hex(f, &self.key)
    }
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

/// Derives tokens from partition keys.
pub trait Partitioner: Send + Sync + fmt::Debug {
    /// Partitioner name, for logs and options.
    fn name(&self) -> &'static str;

    /// Computes the token of a raw key.
    fn token(&self, key: &[u8]) -> Token;

    /// Number of order-preserving token bytes written in front of the key
    /// in the indexable partition field.
    fn token_width(&self) -> usize;

    /// Pairs a raw key with its token.
    fn decorate(&self, key: Bytes) -> DecoratedKey {
        let token = self.token(&key);
        DecoratedKey::new(token, key)
    }

    /// Native comparator over decorated keys.
    fn compare(&self, a: &DecoratedKey, b: &DecoratedKey) -> Ordering {
        a.cmp(b)
    }
}

/// Hash partitioner: the token is the first 8 bytes of the key's SHA-256
/// digest read as a big-endian `i64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashPartitioner;

impl Partitioner for HashPartitioner {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn token(&self, key: &[u8]) -> Token {
        let digest = Sha256::digest(key);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        Token::Long(i64::from_be_bytes(head))
    }

    fn token_width(&self) -> usize {
        8
    }
}

/// Order-preserving partitioner: keys sort by their raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedPartitioner;

impl Partitioner for OrderedPartitioner {
    fn name(&self) -> &'static str {
        "ordered"
    }

    fn token(&self, key: &[u8]) -> Token {
        Token::Bytes(Bytes::copy_from_slice(key))
    }

    fn token_width(&self) -> usize {
        0
    }
}

/// Partitioner choice in index options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionerKind {
    /// [`HashPartitioner`].
    #[default]
    Hash,
    /// [`OrderedPartitioner`].
    Ordered,
}

impl PartitionerKind {
    /// Instantiates the partitioner.
    #[must_use]
    pub fn build(self) -> Arc<dyn Partitioner> {
        match self {
            Self::Hash => Arc::new(HashPartitioner),
            Self::Ordered => Arc::new(OrderedPartitioner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_token_is_deterministic() {
        let p = HashPartitioner;
        assert_eq!(p.token(b"k1"), p.token(b"k1"));
        assert_ne!(p.token(b"k1"), p.token(b"k2"));
    }

    #[test]
    fn ordered_token_is_key() {
        let p = OrderedPartitioner;
        let key = p.decorate(Bytes::from_static(b"abc"));
        assert_eq!(key.token(), &Token::Bytes(Bytes::from_static(b"abc")));
        assert!(p.compare(&p.decorate(Bytes::from_static(b"a")), &key) == Ordering::Less);
    }

    #[test]
    fn hash_order_is_token_first() {
        let a = DecoratedKey::new(Token::Long(-5), Bytes::from_static(b"zzz"));
        let b = DecoratedKey::new(Token::Long(3), Bytes::from_static(b"aaa"));
        assert_eq!(HashPartitioner.compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn display_is_hex() {
        let key = DecoratedKey::new(Token::Long(7), Bytes::from_static(&[0xab, 0x01]));
        assert_eq!(key.to_string(), "7:ab01");
    }

    #[test]
    fn kind_parses() {
        let kind: PartitionerKind = serde_json::from_str("\"ordered\"").unwrap();
        assert_eq!(kind.build().name(), "ordered");
        assert_eq!(PartitionerKind::default().build().name(), "hash");
    }
}
