//! Undo/Redo
//!
//! Client edits are recorded as [`Action`]s: reversible edits stored by
//! value. The [`ActionLog`] executes each action's forward leg as it is
//! enacted and groups actions into transactions, one undo step each.
//!
//! # Flow
//!
//! ```rust,ignore
//! let txn = log.begin("set radius");
//! radius.set_value(2.5, &txn)?;   // forward leg runs now
//! drop(txn);                      // commits one undo step
//!
//! log.undo()?;                    // backward legs, newest first
//! log.redo()?;                    // forward legs, oldest first
//! ```
//!
//! The log is an explicit handle rather than a process-wide singleton, so
//! independent graphs (and tests) can keep independent histories.

mod log;
mod record;

pub use log::{ActionLog, Transaction, TxId};
pub use record::{Action, ValueChange};
