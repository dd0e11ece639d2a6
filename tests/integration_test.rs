use lexorank::{Bucket, Key, KeyError, ListError, Reorderable, ReorderableList, MIDDLE, TOP};
use serde::{Deserialize, Serialize};

/// A row as an application would load it: an id plus its stored rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    id:    u32,
    title: String,
    rank:  Key,
}

impl Reorderable for Task {
    fn key(&self) -> Key { self.rank }
    fn set_key(&mut self, key: Key) { self.rank = key; }
}

fn task(id: u32, rank: &str) -> Task {
    Task { id, title: format!("task {id}"), rank: Key::parse(rank).unwrap() }
}

#[test]
fn test_canonical_string_roundtrip() {
    for s in ["0|0", "1|aU", "2|zzzzzz", "1|", "0|:;<=>?"] {
        let key = Key::parse(s).unwrap();
        assert_eq!(key.to_string(), s);
        assert_eq!(key.as_str().parse::<Key>().unwrap(), key);
        assert_eq!(Key::try_from(s.as_bytes()).unwrap(), key);
    }
}

#[test]
fn test_json_roundtrip() {
    let json = serde_json::to_string(&MIDDLE).unwrap();
    assert_eq!(json, "\"0|UUUUUU\"");
    let back: Key = serde_json::from_str(&json).unwrap();
    assert_eq!(back, MIDDLE);
}

#[test]
fn test_json_rejects_invalid_key() {
    let err = serde_json::from_str::<Key>("\"9|aa\"").unwrap_err();
    assert!(err.to_string().contains("Invalid bucket"), "{err}");
    assert!(serde_json::from_str::<Key>("42").is_err());
}

#[test]
fn test_bucket_json() {
    assert_eq!(serde_json::to_string(&Bucket::TWO).unwrap(), "2");
    assert_eq!(serde_json::from_str::<Bucket>("1").unwrap(), Bucket::ONE);
    assert!(serde_json::from_str::<Bucket>("3").is_err());
}

#[test]
fn test_row_struct_json() {
    let row = task(7, "1|aU");
    let json = serde_json::to_string(&row).unwrap();
    assert!(json.contains("\"rank\":\"1|aU\""));
    let back: Task = serde_json::from_str(&json).unwrap();
    assert_eq!(back, row);
}

#[test]
fn test_parse_errors() {
    assert_eq!(Key::parse("1|abcdefg"), Err(KeyError::InvalidLength(9)));
    assert_eq!(Key::parse("1|ab{"), Err(KeyError::InvalidDigit(b'{')));
}

#[test]
fn test_insert_into_loaded_rows() {
    let mut rows = vec![
        task(0, "1|aaa"), task(1, "1|aab"), task(2, "1|aac"),
        task(3, "1|aad"), task(4, "1|aae"), task(5, "1|aaf"),
    ];

    let key = ReorderableList::new(&mut rows).insert(3).unwrap();
    assert_eq!(key.to_string(), "1|aacU");

    rows.insert(3, Task { id: 6, title: "new".into(), rank: key });
    assert!(ReorderableList::new(&mut rows).is_sorted());
}

#[test]
fn test_out_of_bounds() {
    let mut rows = vec![task(0, "1|a")];
    let err = ReorderableList::new(&mut rows).insert(2).unwrap_err();
    assert_eq!(err, ListError::OutOfBounds { position: 2, len: 1 });
}

#[test]
fn test_append_at_maximum_rewrites_row() {
    let mut rows = vec![task(0, "1|zzzzzz")];

    let mut list = ReorderableList::new(&mut rows);
    let key = list.append();
    let dirty: Vec<usize> = list.dirty().iter().copied().collect();

    assert_eq!(dirty, vec![0]);
    assert!(rows[0].rank < Key::top(Bucket::ONE));
    assert!(key > rows[0].rank);
}

#[test]
fn test_build_list_from_empty() {
    let mut rows: Vec<Task> = Vec::new();

    // Alternate front and back insertion, then keep splitting the middle.
    for id in 0..200u32 {
        let position = match id % 3 {
            0 => rows.len(),
            1 => 0,
            _ => rows.len() / 2,
        };
        let key = ReorderableList::new(&mut rows)
            .with_bucket(Bucket::ONE)
            .insert(position)
            .unwrap();
        rows.insert(position, Task { id, title: String::new(), rank: key });
        assert!(ReorderableList::new(&mut rows).is_sorted(), "after insert {id}");
    }
    assert_eq!(rows.len(), 200);
}

#[test]
fn test_repeated_insert_at_same_gap_stays_sorted() {
    let mut rows = vec![task(0, "0|a"), task(1, "0|b")];

    // Always insert right after the first row: the gap halves every time
    // and must eventually be rebalanced.
    for id in 2..500u32 {
        let key = ReorderableList::new(&mut rows).insert(1).unwrap();
        assert!(key > rows[0].rank && key < rows[1].rank);
        rows.insert(1, Task { id, title: String::new(), rank: key });
    }
    assert!(ReorderableList::new(&mut rows).is_sorted());
}

#[test]
fn test_repeated_append_stays_sorted() {
    let mut rows = vec![task(0, "2|0")];
    for id in 1..500u32 {
        let key = ReorderableList::new(&mut rows).append();
        rows.push(Task { id, title: String::new(), rank: key });
    }
    assert!(ReorderableList::new(&mut rows).is_sorted());
    assert!(rows.iter().all(|t| t.rank.bucket() == Bucket::TWO));
}

#[test]
fn test_repeated_prepend_stays_sorted() {
    let mut rows = vec![task(0, "0|UUUUUU")];
    for id in 1..500u32 {
        let key = ReorderableList::new(&mut rows).prepend();
        rows.insert(0, Task { id, title: String::new(), rank: key });
    }
    assert!(ReorderableList::new(&mut rows).is_sorted());
    assert!(rows[0].rank > Key::bottom(Bucket::ZERO));
}

#[test]
fn test_top_has_no_successor() {
    assert_eq!(TOP.between(&TOP), None);
    assert_eq!(TOP.after(1), None);
}

/// `"1|9"`, then `n` consecutive 6-digit ranks starting at `"1|900001"`,
/// then `"1|z"`.  Only the last pair has room.
fn saturated_run(n: u32) -> Vec<Task> {
    let mut rows = vec![task(0, "1|9")];
    let mut rank = Key::parse("1|900001").unwrap();
    for id in 1..=n {
        rows.push(Task { id, title: String::new(), rank });
        rank = rank.after(1).unwrap();
    }
    rows.push(task(n + 1, "1|z"));
    rows
}

#[test]
fn test_insert_into_long_saturated_run() {
    for n in [50, 200, 800] {
        let mut rows = saturated_run(n);
        let len = rows.len();

        let mut list = ReorderableList::new(&mut rows);
        let key = list.insert(1).unwrap();
        let dirty = list.dirty().len();

        assert!(dirty <= len, "{dirty} writes for {len} rows");
        assert!(key > rows[0].rank && key < rows[1].rank);
        rows.insert(1, Task { id: u32::MAX, title: String::new(), rank: key });
        assert!(ReorderableList::new(&mut rows).is_sorted(), "n = {n}");
    }
}

#[test]
fn test_repeated_insert_after_head_of_saturated_run() {
    let mut rows = saturated_run(300);

    for id in 0..2000u32 {
        let key = ReorderableList::new(&mut rows).insert(1).unwrap();
        assert!(key > rows[0].rank && key < rows[1].rank, "insert {id}");
        rows.insert(1, Task { id: 1000 + id, title: String::new(), rank: key });
    }
    assert!(ReorderableList::new(&mut rows).is_sorted());
    assert!(rows.iter().all(|t| t.rank.bucket() == Bucket::ONE));
}

#[test]
fn test_insert_rejects_unordered_rows() {
    let mut rows = vec![task(0, "1|a"), task(1, "0|z")];
    let mut list = ReorderableList::new(&mut rows);

    assert!(!list.is_sorted());
    assert_eq!(list.insert(1), Err(ListError::NoRoom { position: 1 }));
}
