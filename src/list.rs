//! Reorderable list engine.
//!
//! [`ReorderableList`] borrows a slice of caller-owned items that is already
//! sorted by key, e.g. a page of rows read from a database, and computes
//! keys for new positions in it.  The engine never adds, removes or sorts
//! items; it only rewrites keys in place when it has to make room.
//!
//! # Making room
//! When two neighbours are too close for a 6-digit key between them, the
//! engine runs a *cascade*: starting at the gap, it pushes the bordering item
//! away from the gap toward its own outer neighbour.  If that pair is flush
//! as well it tries the next pair outward, and so on to the end of the list.
//! Once a pair further out has room, the items between it and the gap are
//! walked back in the same pass, each moved halfway toward the one already
//! moved.  If that pass fails, or leaves the gap closed, the engine
//! *normalizes*, spreading all keys evenly over the keyspace.  An operation
//! runs at most one cascade pass and one normalization, so its cost is
//! linear in the length of the list.
//!
//! Every index the engine rewrites is recorded in [`ReorderableList::dirty`]
//! so the caller knows which rows to save.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::key::{Bucket, Key};

// ── Item contract ────────────────────────────────────────────────────────────

/// An item that carries a rank key and lets the engine replace it.
pub trait Reorderable {
    fn key(&self) -> Key;
    fn set_key(&mut self, key: Key);
}

impl Reorderable for Key {
    fn key(&self) -> Key {
        *self
    }

    fn set_key(&mut self, key: Key) {
        *self = key;
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListError {
    #[error("Insert position {position} is out of bounds for a list of {len} items")]
    OutOfBounds { position: usize, len: usize },

    #[error("No key fits at position {position}; the neighbours are out of order")]
    NoRoom { position: usize },
}

// ── Direction ────────────────────────────────────────────────────────────────

/// Which way a cascade walks from its starting index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the end of the list.
    Forward,
    /// Toward the start of the list.
    Backward,
}

impl Direction {
    /// The neighbour of `index` in this direction, if the list has one.
    #[inline]
    fn step(self, index: usize, len: usize) -> Option<usize> {
        match self {
            Direction::Forward  => (index + 1 < len).then_some(index + 1),
            Direction::Backward => index.checked_sub(1),
        }
    }
}

// ── ReorderableList ──────────────────────────────────────────────────────────

pub struct ReorderableList<'a, T> {
    items:  &'a mut [T],
    /// Bucket for keys handed out while the list is empty.
    bucket: Bucket,
    dirty:  BTreeSet<usize>,
}

impl<'a, T: Reorderable> ReorderableList<'a, T> {
    /// Wrap `items`, which must already be sorted by key.
    pub fn new(items: &'a mut [T]) -> Self {
        Self { items, bucket: Bucket::default(), dirty: BTreeSet::new() }
    }

    /// Seed bucket used by [`append`](Self::append) and
    /// [`prepend`](Self::prepend) on an empty list.
    pub fn with_bucket(mut self, bucket: Bucket) -> Self {
        self.bucket = bucket;
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[T] {
        &self.items[..]
    }

    pub fn keys(&self) -> Vec<Key> {
        self.items.iter().map(Reorderable::key).collect()
    }

    /// Indices of items whose keys were rewritten by this handle.
    pub fn dirty(&self) -> &BTreeSet<usize> {
        &self.dirty
    }

    // ── Placement ────────────────────────────────────────────────────────────

    /// Key for a new item placed at `position`, so that it sorts after the
    /// item currently at `position - 1` and before the one at `position`.
    ///
    /// The new item is not added; store the returned key with it.  Neighbours
    /// may be rewritten to make room (see [`dirty`](Self::dirty)).
    ///
    /// The items must be sorted.  If the two neighbours are out of order no
    /// amount of re-keying opens a gap between them, and the call fails with
    /// [`ListError::NoRoom`] after normalizing the list.
    pub fn insert(&mut self, position: usize) -> Result<Key, ListError> {
        let len = self.items.len();
        if position > len {
            return Err(ListError::OutOfBounds { position, len });
        }
        if position == 0 {
            return Ok(self.prepend());
        }
        if position == len {
            return Ok(self.append());
        }

        self.make_room(position, Direction::Forward, |items| {
            items[position - 1].key().between(&items[position].key())
        })
        .ok_or(ListError::NoRoom { position })
    }

    /// Key that sorts after the last item.  An empty list yields the bottom
    /// key of the seed bucket.
    pub fn append(&mut self) -> Key {
        let Some(last) = self.items.len().checked_sub(1) else {
            return Key::bottom(self.bucket);
        };

        self.make_room(last, Direction::Backward, |items| {
            let tail = items[last].key();
            tail.between(&Key::top(tail.bucket()))
        })
        .unwrap_or_else(|| {
            let bucket = self.items[last].key().bucket();
            tracing::warn!(items = self.items.len(), "no room after normalizing, appending top key");
            Key::top(bucket)
        })
    }

    /// Key that sorts before the first item.  An empty list yields the top
    /// key of the seed bucket.
    pub fn prepend(&mut self) -> Key {
        if self.items.is_empty() {
            return Key::top(self.bucket);
        }

        self.make_room(0, Direction::Forward, |items| {
            let head = items[0].key();
            Key::bottom(head.bucket()).between(&head)
        })
        .unwrap_or_else(|| {
            let bucket = self.items[0].key().bucket();
            tracing::warn!(items = self.items.len(), "no room after normalizing, prepending bottom key");
            Key::bottom(bucket)
        })
    }

    // ── Repair ───────────────────────────────────────────────────────────────

    /// Try `place`, then one cascade pass from `position`, then a full
    /// normalization, stopping at the first that yields a key.
    fn make_room<F>(&mut self, position: usize, direction: Direction, place: F) -> Option<Key>
    where
        F: Fn(&[T]) -> Option<Key>,
    {
        if let Some(key) = place(&*self.items) {
            return Some(key);
        }
        if self.try_rebalance_from(position, direction) {
            if let Some(key) = place(&*self.items) {
                return Some(key);
            }
            tracing::debug!(position, ?direction, "cascade left the gap closed");
        }
        self.normalize();
        place(&*self.items)
    }

    /// One cascade pass.  At each step the item at `i` is moved to the
    /// midpoint between itself and its neighbour in `direction`; the first
    /// step that finds room stops the walk outward, and every item passed on
    /// the way is then moved the same way, back toward `position`.  Returns
    /// `false` if the walk hit the end of the list or the walk back ran out
    /// of room.
    fn try_rebalance_from(&mut self, position: usize, direction: Direction) -> bool {
        let len = self.items.len();
        let mut passed = Vec::new();
        let mut i = position;

        while let Some(j) = direction.step(i, len) {
            let curr = self.items[i].key();
            let far  = self.items[j].key();

            if let Some(moved) = curr.between(&far) {
                self.shift(i, moved.with_bucket(curr.bucket()));
                return self.walk_back(&passed, i);
            }
            passed.push(i);
            i = j;
        }

        tracing::debug!(position, ?direction, "cascade reached list boundary");
        false
    }

    /// Move each index in `passed`, last first, toward the item moved just
    /// before it, starting from `outer`.
    fn walk_back(&mut self, passed: &[usize], mut outer: usize) -> bool {
        for &i in passed.iter().rev() {
            let curr = self.items[i].key();
            let Some(moved) = curr.between(&self.items[outer].key()) else {
                tracing::debug!(index = i, "cascade ran out of room walking back");
                return false;
            };
            self.shift(i, moved.with_bucket(curr.bucket()));
            outer = i;
        }
        true
    }

    fn shift(&mut self, index: usize, key: Key) {
        tracing::debug!(index, from = %self.items[index].key(), to = %key, "cascade moved item");
        self.write(index, key);
    }

    /// Re-key every item from its index alone, evenly spaced with headroom
    /// at both ends.  Buckets are kept; the result does not depend on the
    /// previous keys.
    pub fn normalize(&mut self) {
        let len = self.items.len();
        tracing::info!(items = len, "normalizing list");

        let slots = (len + 1) as f64;
        for i in 0..len {
            let bucket = self.items[i].key().bucket();
            let key = Key::at_fraction(bucket, (i + 1) as f64 / slots);
            self.write(i, key);
        }
    }

    /// `true` if every key is strictly greater than the one before it.
    pub fn is_sorted(&self) -> bool {
        self.items.windows(2).all(|w| w[0].key() < w[1].key())
    }

    fn write(&mut self, index: usize, key: Key) {
        self.items[index].set_key(key);
        self.dirty.insert(index);
    }
}
