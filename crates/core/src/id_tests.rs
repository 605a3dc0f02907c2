// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

crate::define_id! {
    pub struct TestId("tst-");
}

#[test]
fn new_has_prefix_and_fixed_length() {
    let id = TestId::new();
    assert!(id.as_str().starts_with("tst-"));
    assert_eq!(id.as_str().len(), ID_MAX_LEN);
}

#[test]
fn suffix_strips_prefix() {
    let id = TestId::from_string("tst-abc123");
    assert_eq!(id.suffix(), "abc123");
}

#[test]
fn short_truncates_suffix() {
    let id = TestId::from_string("tst-abcdefgh");
    assert_eq!(id.short(3), "abc");
}

#[test]
fn display_roundtrips_through_from_string() {
    let id = TestId::new();
    let reparsed = TestId::from_string(id.to_string());
    assert_eq!(id, reparsed);
}

#[test]
fn two_new_ids_differ() {
    assert_ne!(TestId::new(), TestId::new());
}

#[test]
fn idbuf_hash_matches_str_hash() {
    use std::collections::HashMap;
    let id = TestId::new();
    let mut map: HashMap<String, i32> = HashMap::new();
    map.insert(id.as_str().to_string(), 1);
    assert_eq!(map.get(id.as_str()), Some(&1));
}
