//! Lexicographically sortable rank keys and a self-rebalancing reorderable
//! list.
//!
//! ```
//! use lexorank::{Key, ReorderableList};
//!
//! let mut rows = vec![Key::parse("1|a")?, Key::parse("1|b")?];
//! let mut list = ReorderableList::new(&mut rows);
//!
//! let key = list.insert(1)?;
//! assert_eq!(key.to_string(), "1|aU");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod alphabet;
pub mod key;
pub mod list;

pub use key::{Bucket, Key, KeyError, BOTTOM, MIDDLE, TOP};
pub use list::{Direction, ListError, Reorderable, ReorderableList};
