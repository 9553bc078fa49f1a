//! Transactional undo/redo history.
//!
//! A transaction collects the operations the timeline journals between
//! `begin` and the outermost `commit`. Nested begins fold into the
//! enclosing transaction, so a compound action that calls other actions
//! still undoes as a single step.

use splice_core::{Result, SpliceError};
use tracing::{debug, info, warn};

use crate::operation::Operation;
use crate::signal::{Signal, SubscriptionId};
use crate::timeline::Timeline;

/// Default number of transactions kept.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Notifications delivered to history listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionLogEvent {
    Begin(String),
    Commit(String),
    Rollback(String),
    Undo(String),
    Redo(String),
    Cleaned,
}

/// A named group of operations, undone and redone as one step.
#[derive(Debug, Clone)]
pub struct Transaction {
    name: String,
    operations: Vec<Operation>,
}

impl Transaction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    fn undo(&self, timeline: &mut Timeline) -> Result<()> {
        let inverses: Vec<Operation> = self
            .operations
            .iter()
            .rev()
            .map(Operation::inverse)
            .collect();
        replay(timeline, &inverses)
    }

    fn redo(&self, timeline: &mut Timeline) -> Result<()> {
        replay(timeline, &self.operations)
    }
}

/// Apply `ops` in order. If one fails, the ones already applied are
/// reverted so the timeline is left as it was.
fn replay(timeline: &mut Timeline, ops: &[Operation]) -> Result<()> {
    for (index, op) in ops.iter().enumerate() {
        let Err(e) = timeline.apply_unrecorded(op) else {
            continue;
        };
        warn!(error = %e, op = op.label(), "replay failed, restoring");
        for applied in ops[..index].iter().rev() {
            if let Err(restore) = timeline.apply_unrecorded(&applied.inverse()) {
                warn!(error = %restore, op = applied.label(), "restore failed");
                break;
            }
        }
        return Err(e);
    }
    Ok(())
}

#[derive(Debug)]
pub struct ActionLog {
    /// Committed transactions (most recent last).
    undo: Vec<Transaction>,
    /// Undone transactions (most recent last).
    redo: Vec<Transaction>,
    current: Option<Transaction>,
    nested_count: usize,
    max_depth: usize,
    /// Undo depth at the last checkpoint; `None` once it is unreachable.
    checkpoint: Option<usize>,
    listeners: Signal<ActionLogEvent>,
}

impl ActionLog {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            current: None,
            nested_count: 0,
            max_depth: max_depth.max(1),
            checkpoint: Some(0),
            listeners: Signal::new(),
        }
    }

    /// Open a transaction, or nest into the one already open.
    pub fn begin(&mut self, timeline: &mut Timeline, name: impl Into<String>) {
        if self.current.is_some() {
            self.nested_count += 1;
            return;
        }
        let name = name.into();
        timeline.start_recording();
        debug!(name = %name, "transaction started");
        self.listeners.emit(&ActionLogEvent::Begin(name.clone()));
        self.current = Some(Transaction {
            name,
            operations: Vec::new(),
        });
    }

    /// Close the innermost `begin`. The outermost commit pushes the
    /// transaction onto the undo stack; empty transactions are dropped.
    pub fn commit(&mut self, timeline: &mut Timeline) -> Result<()> {
        let Some(current) = self.current.as_mut() else {
            return Err(SpliceError::InvalidState("no open transaction".into()));
        };
        current.operations.extend(timeline.take_journal());
        if self.nested_count > 0 {
            self.nested_count -= 1;
            return Ok(());
        }

        current.operations.extend(timeline.stop_recording());
        let Some(transaction) = self.current.take() else {
            return Ok(());
        };
        if transaction.operations.is_empty() {
            debug!(name = %transaction.name, "empty transaction dropped");
            return Ok(());
        }

        self.redo.clear();
        if self.checkpoint.is_some_and(|c| c > self.undo.len()) {
            self.checkpoint = None;
        }
        let name = transaction.name.clone();
        info!(
            name = %name,
            operations = transaction.operations.len(),
            "transaction committed"
        );
        self.undo.push(transaction);
        while self.undo.len() > self.max_depth {
            self.undo.remove(0);
            self.checkpoint = match self.checkpoint {
                Some(0) | None => None,
                Some(c) => Some(c - 1),
            };
        }
        self.listeners.emit(&ActionLogEvent::Commit(name));
        Ok(())
    }

    /// Revert everything done since the outermost `begin` and discard the
    /// transaction, however deeply nested the caller is.
    pub fn rollback(&mut self, timeline: &mut Timeline) -> Result<()> {
        ensure_not_editing(timeline, "roll back")?;
        let Some(mut transaction) = self.current.take() else {
            return Err(SpliceError::InvalidState("no open transaction".into()));
        };
        self.nested_count = 0;
        transaction.operations.extend(timeline.stop_recording());
        transaction.undo(timeline)?;
        info!(
            name = %transaction.name,
            operations = transaction.operations.len(),
            "transaction rolled back"
        );
        self.listeners
            .emit(&ActionLogEvent::Rollback(transaction.name));
        Ok(())
    }

    /// Undo the most recent transaction. Returns `false` when there is
    /// nothing to undo.
    pub fn undo(&mut self, timeline: &mut Timeline) -> Result<bool> {
        self.ensure_idle(timeline, "undo")?;
        let Some(transaction) = self.undo.pop() else {
            return Ok(false);
        };
        if let Err(e) = transaction.undo(timeline) {
            self.undo.push(transaction);
            return Err(e);
        }
        info!(name = %transaction.name, "undo");
        let name = transaction.name.clone();
        self.redo.push(transaction);
        self.listeners.emit(&ActionLogEvent::Undo(name));
        Ok(true)
    }

    /// Redo the most recently undone transaction. Returns `false` when
    /// there is nothing to redo.
    pub fn redo(&mut self, timeline: &mut Timeline) -> Result<bool> {
        self.ensure_idle(timeline, "redo")?;
        let Some(transaction) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = transaction.redo(timeline) {
            self.redo.push(transaction);
            return Err(e);
        }
        info!(name = %transaction.name, "redo");
        let name = transaction.name.clone();
        self.undo.push(transaction);
        self.listeners.emit(&ActionLogEvent::Redo(name));
        Ok(true)
    }

    /// Mark the current history position as saved.
    pub fn checkpoint(&mut self) -> Result<()> {
        if self.in_transaction() {
            return Err(SpliceError::InvalidState(
                "cannot checkpoint inside a transaction".into(),
            ));
        }
        self.checkpoint = Some(self.undo.len());
        Ok(())
    }

    /// Whether the timeline differs from the last checkpoint.
    pub fn dirty(&self) -> bool {
        self.current.is_some() || self.checkpoint != Some(self.undo.len())
    }

    /// Forget all history. The current state becomes the checkpoint.
    pub fn clean(&mut self) -> Result<()> {
        if self.in_transaction() {
            return Err(SpliceError::InvalidState(
                "cannot clear history inside a transaction".into(),
            ));
        }
        self.undo.clear();
        self.redo.clear();
        self.checkpoint = Some(0);
        debug!("history cleared");
        self.listeners.emit(&ActionLogEvent::Cleaned);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Name of the transaction `undo` would revert.
    pub fn undo_name(&self) -> Option<&str> {
        self.undo.last().map(Transaction::name)
    }

    pub fn redo_name(&self) -> Option<&str> {
        self.redo.last().map(Transaction::name)
    }

    pub fn undo_count(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn in_transaction(&self) -> bool {
        self.current.is_some()
    }

    /// Depth of `begin` calls still waiting for their `commit`.
    pub fn depth(&self) -> usize {
        match self.current {
            Some(_) => self.nested_count + 1,
            None => 0,
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&ActionLogEvent) + 'static) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn ensure_idle(&self, timeline: &Timeline, action: &str) -> Result<()> {
        if self.in_transaction() {
            return Err(SpliceError::InvalidState(format!(
                "cannot {} inside a transaction",
                action
            )));
        }
        ensure_not_editing(timeline, action)
    }
}

fn ensure_not_editing(timeline: &Timeline, action: &str) -> Result<()> {
    if timeline.is_editing() {
        return Err(SpliceError::InvalidState(format!(
            "cannot {} while an edit is in progress",
            action
        )));
    }
    Ok(())
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}
