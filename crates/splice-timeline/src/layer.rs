//! Layers: priority bands holding timeline objects.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{LayerId, ObjectId};

/// A layer. Priority 0 is the top-most layer; priorities of a timeline's
/// layers are always exactly `0..n`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layer {
    pub(crate) id: LayerId,
    pub(crate) priority: u32,
    pub(crate) auto_transition: bool,
    pub(crate) objects: BTreeSet<ObjectId>,
}

impl Layer {
    pub(crate) fn new(priority: u32, auto_transition: bool) -> Self {
        Self {
            id: LayerId::new(),
            priority,
            auto_transition,
            objects: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    /// Whether overlapping clips on this layer get transitions at commit
    /// instead of being rejected.
    pub fn auto_transition(&self) -> bool {
        self.auto_transition
    }

    /// Objects on this layer, in id order.
    pub fn objects(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.objects.iter().copied()
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains(&object)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn emptied(&self) -> Self {
        Self {
            objects: BTreeSet::new(),
            ..self.clone()
        }
    }
}
