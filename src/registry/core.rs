use std::collections::HashMap;

use crate::error::{ControlError, Result};

/// Insertion-ordered mapping from identifier to a boxed backend or hook.
///
/// Registering an identifier that is already present replaces the entry
/// and moves it to the back of the dispatch order, so iteration follows
/// the order entries were last inserted-or-replaced. Lookup stays O(1)
/// through the map; the order vector exists purely for deterministic
/// dispatch.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: HashMap<String, Box<T>>,
    order: Vec<String>,
}

impl<T: ?Sized> Registry<T> {
    /// `kind` names the registry in [`ControlError::NotFound`] messages,
    /// e.g. `"graphics backend"` or `"pre-cycle hook"`.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn register(&mut self, id: impl Into<String>, item: Box<T>) {
        let id = id.into();
        if self.entries.insert(id.clone(), item).is_some() {
            self.order.retain(|existing| *existing != id);
        }
        self.order.push(id);
    }

    pub fn unregister(&mut self, id: &str) -> Result<Box<T>> {
        match self.entries.remove(id) {
            Some(item) => {
                self.order.retain(|existing| existing != id);
                Ok(item)
            }
            None => Err(ControlError::NotFound {
                kind: self.kind,
                id: id.to_string(),
            }),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dispatch over a snapshot of the current order. Entries removed by
    /// re-entrant mutation would simply be skipped, though the controller
    /// never mutates registries mid-dispatch.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&str, &mut T)) {
        let snapshot = self.order.clone();
        for id in &snapshot {
            if let Some(item) = self.entries.get_mut(id) {
                f(id, item);
            }
        }
    }

    /// Fallible dispatch; stops at the first error.
    pub fn try_for_each_mut(&mut self, mut f: impl FnMut(&str, &mut T) -> Result<()>) -> Result<()> {
        let snapshot = self.order.clone();
        for id in &snapshot {
            if let Some(item) = self.entries.get_mut(id) {
                f(id, item)?;
            }
        }
        Ok(())
    }
}
