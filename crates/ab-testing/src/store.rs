//! Test registry storage.

use std::collections::HashMap;

use crate::types::ABTest;

/// Key-value registry of tests keyed by test_id.
///
/// The manager performs read-modify-write through this interface as a
/// single logical step; a transactional backend must make `get` + `upsert`
/// atomic per test_id to keep that contract under concurrent callers.
pub trait TestStore {
    fn get(&self, test_id: &str) -> Option<ABTest>;
    fn upsert(&mut self, test: ABTest);
    fn list(&self) -> Vec<ABTest>;
}

/// In-memory store backed by a HashMap. Single-caller use only.
#[derive(Debug, Default)]
pub struct InMemoryTestStore {
    tests: HashMap<String, ABTest>,
}

impl InMemoryTestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

impl TestStore for InMemoryTestStore {
    fn get(&self, test_id: &str) -> Option<ABTest> {
        self.tests.get(test_id).cloned()
    }

    fn upsert(&mut self, test: ABTest) {
        self.tests.insert(test.test_id.clone(), test);
    }

    fn list(&self) -> Vec<ABTest> {
        self.tests.values().cloned().collect()
    }
}
