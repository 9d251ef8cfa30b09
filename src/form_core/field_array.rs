use serde_json::Value as JsonValue;
use std::fmt;
use uuid::Uuid;

/// Identity of one dynamic entry. Independent of the entry's position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(Uuid);

impl EntryId {
    fn fresh() -> Self {
        EntryId(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // short form is enough for display keys
        let s = self.0.simple().to_string();
        write!(f, "{}", &s[..8])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArrayEntry {
    pub id: EntryId,
    pub index: usize,
    pub value: JsonValue,
}

/// Identity bookkeeping for one array path; values live in the value tree.
#[derive(Clone, Debug, Default)]
pub struct FieldArray {
    pub item_key: String,
    ids: Vec<EntryId>,
}

impl FieldArray {
    pub fn new(item_key: impl Into<String>) -> Self {
        Self {
            item_key: item_key.into(),
            ids: Vec::new(),
        }
    }

    pub fn ids(&self) -> &[EntryId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn append(&mut self) -> EntryId {
        let id = EntryId::fresh();
        self.ids.push(id);
        id
    }

    pub fn remove(&mut self, index: usize) -> Option<EntryId> {
        if index < self.ids.len() {
            Some(self.ids.remove(index))
        } else {
            None
        }
    }

    /// Fresh identities for `len` entries (after reset or resolved defaults).
    pub fn regenerate(&mut self, len: usize) {
        self.ids = (0..len).map(|_| EntryId::fresh()).collect();
    }

    /// Match `len` without touching surviving entries: new slots get fresh
    /// identities, trailing ones are dropped.
    pub fn resize(&mut self, len: usize) {
        self.ids.truncate(len);
        while self.ids.len() < len {
            self.ids.push(EntryId::fresh());
        }
    }

    pub fn position(&self, id: EntryId) -> Option<usize> {
        self.ids.iter().position(|x| *x == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_keeps_other_identities_in_order() {
        let mut fa = FieldArray::new("number");
        let a = fa.append();
        let b = fa.append();
        let c = fa.append();
        assert_eq!(fa.remove(1), Some(b));
        assert_eq!(fa.ids(), &[a, c]);
        assert_eq!(fa.position(c), Some(1));
        assert_eq!(fa.remove(9), None);
        assert_eq!(fa.ids(), &[a, c]);
    }

    #[test]
    fn resize_keeps_surviving_identities() {
        let mut fa = FieldArray::new("number");
        let a = fa.append();
        let b = fa.append();
        fa.resize(4);
        assert_eq!(&fa.ids()[..2], &[a, b]);
        assert_eq!(fa.len(), 4);
        assert!(!fa.ids()[2..].contains(&a));
        fa.resize(1);
        assert_eq!(fa.ids(), &[a]);
    }

    #[test]
    fn identities_are_never_reused() {
        let mut fa = FieldArray::new("number");
        let mut seen = std::collections::HashSet::new();
        for _ in 0..20 {
            let id = fa.append();
            assert!(seen.insert(id));
            fa.remove(0);
        }
        fa.regenerate(3);
        for id in fa.ids() {
            assert!(seen.insert(*id));
        }
        assert_eq!(fa.len(), 3);
    }
}
