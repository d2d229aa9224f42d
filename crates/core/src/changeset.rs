//! Change sets emitted by committed transactions
//!
//! Every committed write transaction produces one `ChangeSet`: the ordered
//! list of operations plus the commit version they were applied at. Change
//! sets are what registered extensions consume to maintain their derived
//! state incrementally.

use crate::key::ItemKey;
use crate::record::Record;

/// A single operation within a committed transaction
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A record was written (insert or update)
    Put {
        /// Key the record was written under
        key: ItemKey,
        /// The record as written
        record: Record,
    },
    /// A record was removed
    Remove {
        /// Key that was removed
        key: ItemKey,
    },
    /// All records in one collection were removed
    RemoveCollection {
        /// Collection that was cleared
        collection: String,
    },
    /// Every record in the database was removed
    RemoveAll,
}

impl Change {
    /// The key this change touches, when it touches exactly one
    pub fn key(&self) -> Option<&ItemKey> {
        match self {
            Change::Put { key, .. } | Change::Remove { key } => Some(key),
            Change::RemoveCollection { .. } | Change::RemoveAll => None,
        }
    }
}

/// The ordered operations of one committed transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    /// Commit version all operations were applied at
    pub version: u64,
    /// Operations in the order they were issued
    pub changes: Vec<Change>,
}

impl ChangeSet {
    /// Create a change set
    pub fn new(version: u64, changes: Vec<Change>) -> Self {
        ChangeSet { version, changes }
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether the transaction committed without writing anything
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_change_key() {
        let put = Change::Put {
            key: ItemKey::new("c", "k"),
            record: Record::value_only(Value::Int(1)),
        };
        assert_eq!(put.key(), Some(&ItemKey::new("c", "k")));

        let clear = Change::RemoveCollection {
            collection: "c".to_string(),
        };
        assert_eq!(clear.key(), None);
        assert_eq!(Change::RemoveAll.key(), None);
    }

    #[test]
    fn test_changeset_len() {
        let cs = ChangeSet::new(
            3,
            vec![Change::Remove {
                key: ItemKey::new("c", "k"),
            }],
        );
        assert_eq!(cs.version, 3);
        assert_eq!(cs.len(), 1);
        assert!(!cs.is_empty());
    }

    #[test]
    fn test_empty_changeset() {
        let cs = ChangeSet::new(1, vec![]);
        assert!(cs.is_empty());
    }
}
