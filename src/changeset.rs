// Per-field change tracking. The tracker remembers, for every field that
// diverged from its persisted state, what kind of divergence it was and what
// the field held before the first change.

use std::collections::HashMap;

use crate::composite::Value;
use crate::identifier::QName;

/// How a tracked field diverged from its persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// The field did not exist before.
    Create,
    /// The field held a value and now holds another.
    Replace,
    /// The field held a value and was removed.
    Delete,
    /// A composite value was mutated in place.
    Modify,
}

/// One tracked divergence. `old_value` is the persisted state before the
/// first change, never an intermediate one.
#[derive(Debug, Clone)]
pub struct ChangeRecord {
    old_value: Option<Value>,
    action: Action,
}

impl ChangeRecord {
    pub fn old_value(&self) -> Option<&Value> {
        self.old_value.as_ref()
    }

    pub fn action(&self) -> Action {
        self.action
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    changes: HashMap<QName, ChangeRecord>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a divergence. The old value of the first record for a field
    /// is kept through later changes, while the action is updated to the
    /// net transition from that persisted state. Deleting a field that did
    /// not exist before this session cancels out and leaves the field
    /// untracked.
    pub fn record(&mut self, field: &QName, action: Action, old_value: Option<Value>) {
        let had_value = match self.changes.get(field) {
            None => {
                self.changes
                    .insert(field.clone(), ChangeRecord { old_value, action });
                return;
            }
            Some(existing) => existing.old_value.is_some(),
        };
        if action == Action::Delete && !had_value {
            self.changes.remove(field);
            return;
        }
        if let Some(existing) = self.changes.get_mut(field) {
            existing.action = match action {
                Action::Delete => Action::Delete,
                Action::Create | Action::Replace => {
                    if had_value {
                        Action::Replace
                    } else {
                        Action::Create
                    }
                }
                // an in-place mutation never widens an existing record
                Action::Modify => existing.action,
            };
        }
    }

    pub fn get(&self, field: &QName) -> Option<&ChangeRecord> {
        self.changes.get(field)
    }

    pub fn contains(&self, field: &QName) -> bool {
        self.changes.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QName, &ChangeRecord)> {
        self.changes.iter()
    }

    /// Removes and returns a single record, used when undoing one field.
    pub fn take(&mut self, field: &QName) -> Option<ChangeRecord> {
        self.changes.remove(field)
    }

    /// Drops all records, used after a successful write or a full undo.
    pub fn clear(&mut self) {
        self.changes.clear();
    }
}
