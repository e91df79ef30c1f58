//! Seams between the order core and the records it orders

/// A record that can be placed in a sequence
pub trait SequenceRecord: Clone {
    /// Unique key the order registry stores for this record
    fn key(&self) -> &str;
}

/// Read-only access to the records behind order entries
pub trait RecordStore {
    type Record: SequenceRecord;

    /// Returns the record for `key`, if it exists
    fn get(&self, key: &str) -> Option<Self::Record>;

    /// Returns whether a record for `key` exists
    fn exists(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
