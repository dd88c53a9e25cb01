// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed mesh identifiers.
//!
//! Every entity id is a short ASCII string (`dev-…`, `job-…`) held in a
//! fixed inline buffer, so ids stay `Copy` and never allocate on the
//! dispatch path. The entity kind rides along as a phantom tag: a
//! `DeviceId` cannot be handed to something expecting a `JobId`, even
//! though both are plain strings on the wire.
//!
//! Ids form a total order over their string form. The router's tiebreak
//! and the cost estimator's report ordering both sort by id, which is
//! what makes their output reproducible across runs.

use std::marker::PhantomData;

/// Inline id capacity in bytes, NUL padding included.
pub const ID_CAP: usize = 24;

/// Entity tag: supplies the prefix for one kind of id.
pub trait IdKind {
    /// Short type prefix, e.g. `"dev-"`.
    const PREFIX: &'static str;
}

/// A typed identifier: NUL-padded ASCII, at most [`ID_CAP`] bytes.
///
/// The phantom tag uses `fn() -> K` so the id is `Send`, `Sync`, and
/// `Copy` no matter what the marker type is.
pub struct Id<K> {
    buf: [u8; ID_CAP],
    tag: PhantomData<fn() -> K>,
}

impl<K> Id<K> {
    /// Build an id from an existing string (parsing, deserialization).
    /// Longer inputs are truncated at a character boundary.
    pub fn from_string(s: impl AsRef<str>) -> Self {
        let s = s.as_ref();
        debug_assert!(s.len() <= ID_CAP, "id exceeds {ID_CAP} bytes: {s:?}");
        debug_assert!(!s.bytes().any(|b| b == 0), "id contains NUL: {s:?}");
        let mut len = s.len().min(ID_CAP);
        while len > 0 && !s.is_char_boundary(len) {
            len -= 1;
        }
        let mut buf = [0u8; ID_CAP];
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { buf, tag: PhantomData }
    }

    pub fn as_str(&self) -> &str {
        let len = self.buf.iter().position(|b| *b == 0).unwrap_or(ID_CAP);
        match std::str::from_utf8(&self.buf[..len]) {
            Ok(s) => s,
            // Only constructed from &str, truncated on a char boundary.
            Err(_) => unreachable!("id constructed from non-UTF-8"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buf[0] == 0
    }
}

impl<K: IdKind> Id<K> {
    /// Mint a fresh random id: the kind's prefix plus enough nanoid
    /// characters to fill the buffer.
    pub fn generate() -> Self {
        let size = ID_CAP - K::PREFIX.len();
        Self::from_string(format!("{}{}", K::PREFIX, nanoid::nanoid!(size)))
    }
}

// Manual impls keep the phantom tag from dragging bounds onto `K`.

impl<K> Clone for Id<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Id<K> {}

impl<K> PartialEq for Id<K> {
    fn eq(&self, other: &Self) -> bool {
        self.buf == other.buf
    }
}

impl<K> Eq for Id<K> {}

impl<K> std::hash::Hash for Id<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Must match str::hash for Borrow<str> HashMap lookups.
        self.as_str().hash(state);
    }
}

impl<K> PartialOrd for Id<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Id<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl<K> std::borrow::Borrow<str> for Id<K> {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl<K> PartialEq<str> for Id<K> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl<K> PartialEq<&str> for Id<K> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl<K> std::fmt::Debug for Id<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl<K> std::fmt::Display for Id<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<K> From<&str> for Id<K> {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl<K> From<String> for Id<K> {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl<K> serde::Serialize for Id<K> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de, K> serde::Deserialize<'de> for Id<K> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.len() > ID_CAP || s.bytes().any(|b| b == 0) {
            return Err(serde::de::Error::custom(format!("invalid id: {s:?}")));
        }
        Ok(Self::from_string(s))
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
