//! Selection of timeline objects.

use crate::ids::ObjectId;

/// How a selection request combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    Replace,
    Add,
    Toggle,
}

/// Ordered set of selected objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    members: Vec<ObjectId>,
    mode: SelectionMode,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a selection request. Returns true if the members changed.
    pub fn apply(&mut self, objects: &[ObjectId], mode: SelectionMode) -> bool {
        self.mode = mode;
        let before = self.members.clone();
        match mode {
            SelectionMode::Replace => {
                self.members.clear();
                for id in objects {
                    if !self.members.contains(id) {
                        self.members.push(*id);
                    }
                }
            }
            SelectionMode::Add => {
                for id in objects {
                    if !self.members.contains(id) {
                        self.members.push(*id);
                    }
                }
            }
            SelectionMode::Toggle => {
                for id in objects {
                    if let Some(index) = self.members.iter().position(|m| m == id) {
                        self.members.remove(index);
                    } else {
                        self.members.push(*id);
                    }
                }
            }
        }
        self.members != before
    }

    pub fn remove(&mut self, id: ObjectId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != id);
        self.members.len() != before
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.members.is_empty();
        self.members.clear();
        changed
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.members.contains(&id)
    }

    pub fn members(&self) -> &[ObjectId] {
        &self.members
    }

    /// Mode of the most recent request.
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
