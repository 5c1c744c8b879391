//! Action Log
//!
//! The log groups enacted actions into transactions and keeps them on undo
//! and redo stacks.
//!
//! # Transactions
//!
//! [`ActionLog::begin`] returns a [`Transaction`] guard. Only one
//! transaction is open per log at a time: calling `begin` while one is open
//! returns a nested guard onto the same transaction, so every edit made
//! during one logical operation lands in a single undo step. The
//! transaction commits when its outermost guard is dropped.
//!
//! A transaction that recorded nothing leaves no trace in the history.
//! Committing a non-empty transaction clears the redo stack.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::record::Action;
use crate::config::HistoryConfig;
use crate::error::{PlugError, Result};

/// Unique identifier for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(u64);

impl TxId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A committed transaction: one undo step.
#[derive(Debug)]
struct Step {
    label: String,
    actions: Vec<Box<dyn Action>>,
}

impl Step {
    fn label(&self) -> &str {
        &self.label
    }

    fn len(&self) -> usize {
        self.actions.len()
    }

    fn undo(&self) {
        for action in self.actions.iter().rev() {
            action.backward();
        }
    }

    fn redo(&self) {
        for action in &self.actions {
            action.forward();
        }
    }
}

struct OpenTransaction {
    id: TxId,
    label: String,
    depth: usize,
    actions: Vec<Box<dyn Action>>,
}

#[derive(Default)]
struct LogState {
    open: Option<OpenTransaction>,
    undo: VecDeque<Step>,
    redo: Vec<Step>,
}

/// Undo/redo history shared by every plug edited through it.
///
/// Cloning the handle shares the same history.
#[derive(Clone)]
pub struct ActionLog {
    state: Arc<Mutex<LogState>>,
    config: HistoryConfig,
}

impl ActionLog {
    /// Create an empty log with the default configuration.
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(LogState::default())),
            config,
        }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Open a transaction, or join the one already open.
    pub fn begin(&self, label: &str) -> Transaction<'_> {
        let mut state = self.state.lock();
        let id = match state.open.as_mut() {
            Some(open) => {
                open.depth += 1;
                trace!(label = open.label.as_str(), depth = open.depth, "joined transaction");
                open.id
            }
            None => {
                let id = TxId::new();
                state.open = Some(OpenTransaction {
                    id,
                    label: label.to_owned(),
                    depth: 1,
                    actions: Vec::new(),
                });
                debug!(label, "opened transaction");
                id
            }
        };
        Transaction { log: self, id }
    }

    /// Run `action`'s forward leg and record it in `txn`.
    pub fn enact(&self, txn: &Transaction<'_>, action: Box<dyn Action>) -> Result<()> {
        self.check_open(txn.id)?;

        // The forward leg may notify the graph; run it without the lock.
        action.forward();

        if !self.config.record_history {
            return Ok(());
        }
        let mut state = self.state.lock();
        match state.open.as_mut() {
            Some(open) if open.id == txn.id => {
                trace!(label = open.label.as_str(), ?action, "recorded action");
                open.actions.push(action);
                Ok(())
            }
            _ => Err(PlugError::UnknownTransaction { id: txn.id.raw() }),
        }
    }

    fn check_open(&self, id: TxId) -> Result<()> {
        match &self.state.lock().open {
            Some(open) if open.id == id => Ok(()),
            _ => Err(PlugError::UnknownTransaction { id: id.raw() }),
        }
    }

    /// Called when a guard is dropped.
    fn close(&self, id: TxId) {
        let mut state = self.state.lock();
        match state.open.as_mut() {
            Some(open) if open.id == id => {
                open.depth -= 1;
                if open.depth > 0 {
                    return;
                }
            }
            _ => return,
        }
        let Some(open) = state.open.take() else {
            return;
        };

        if open.actions.is_empty() {
            trace!(label = open.label.as_str(), "discarded empty transaction");
            return;
        }

        debug!(
            label = open.label.as_str(),
            actions = open.actions.len(),
            "committed transaction"
        );
        state.redo.clear();
        state.undo.push_back(Step {
            label: open.label,
            actions: open.actions,
        });

        let max = self.config.max_undo_steps;
        if max > 0 {
            while state.undo.len() > max {
                state.undo.pop_front();
            }
        }
    }

    fn refuse_if_open(state: &LogState) -> Result<()> {
        match &state.open {
            Some(open) => Err(PlugError::TransactionOpen {
                label: open.label.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Revert the most recent step. Returns `false` if there was none.
    pub fn undo(&self) -> Result<bool> {
        let step = {
            let mut state = self.state.lock();
            Self::refuse_if_open(&state)?;
            match state.undo.pop_back() {
                Some(step) => step,
                None => return Ok(false),
            }
        };

        debug!(label = step.label(), actions = step.len(), "undo");
        step.undo();

        self.state.lock().redo.push(step);
        Ok(true)
    }

    /// Re-apply the most recently undone step. Returns `false` if there was
    /// none.
    pub fn redo(&self) -> Result<bool> {
        let step = {
            let mut state = self.state.lock();
            Self::refuse_if_open(&state)?;
            match state.redo.pop() {
                Some(step) => step,
                None => return Ok(false),
            }
        };

        debug!(label = step.label(), actions = step.len(), "redo");
        step.redo();

        self.state.lock().undo.push_back(step);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.state.lock().undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.state.lock().redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.state.lock().undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.state.lock().redo.len()
    }

    /// Label of the step `undo` would revert.
    pub fn undo_label(&self) -> Option<String> {
        self.state.lock().undo.back().map(|step| step.label.clone())
    }

    /// Label of the step `redo` would re-apply.
    pub fn redo_label(&self) -> Option<String> {
        self.state.lock().redo.last().map(|step| step.label.clone())
    }

    pub fn in_transaction(&self) -> bool {
        self.state.lock().open.is_some()
    }

    /// Number of actions recorded so far in the open transaction.
    pub fn open_len(&self) -> usize {
        self.state
            .lock()
            .open
            .as_ref()
            .map_or(0, |open| open.actions.len())
    }

    /// Drop all committed history. An open transaction is left alone.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.undo.clear();
        state.redo.clear();
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ActionLog")
            .field("undo_depth", &state.undo.len())
            .field("redo_depth", &state.redo.len())
            .field("open", &state.open.as_ref().map(|open| open.label.as_str()))
            .finish()
    }
}

/// Guard for the open transaction of an [`ActionLog`].
///
/// Dropping the outermost guard commits the transaction.
#[must_use = "dropping the guard commits the transaction immediately"]
pub struct Transaction<'a> {
    log: &'a ActionLog,
    id: TxId,
}

impl<'a> Transaction<'a> {
    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn log(&self) -> &'a ActionLog {
        self.log
    }

    /// Shorthand for [`ActionLog::enact`].
    pub fn enact(&self, action: Box<dyn Action>) -> Result<()> {
        self.log.enact(self, action)
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        self.log.close(self.id);
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").field("id", &self.id).finish()
    }
}
