//! Plug Core
//!
//! This crate provides typed, undo-aware value plugs for dataflow graphs.
//! It implements:
//!
//! - Typed plugs with exact-type connection checks
//! - Undoable writes grouped into transactions
//! - Lazy, dirty-flag driven recomputation
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `plug`: the plug base layer and [`TypedPlug`]
//! - `graph`: nodes, connections and dirty propagation
//! - `action`: the undo/redo action log
//! - `compute`: the compute engine interface and a reference engine
//! - `config`: history settings
//!
//! # Example
//!
//! ```rust,ignore
//! use plug_core::{ActionLog, Direction, NodeEngine, PlugFlags, PlugGraph};
//!
//! let graph = PlugGraph::new();
//! let log = ActionLog::new();
//! let engine = NodeEngine::new();
//!
//! let source = graph.add_node("source")?;
//! let out = graph.add_plug(source, "out", Direction::Output, 0, PlugFlags::DEFAULT)?;
//! let sink = graph.add_node("sink")?;
//! let input = graph.add_plug(sink, "in", Direction::Input, 0, PlugFlags::DEFAULT)?;
//! graph.connect(&input, &out)?;
//!
//! out.set_value(5, &log.begin("set source"))?;
//! assert_eq!(input.get_value(&engine)?, 5);   // pulled lazily
//!
//! log.undo()?;
//! assert_eq!(input.get_value(&engine)?, 0);
//! ```

pub mod action;
pub mod compute;
pub mod config;
pub mod error;
pub mod graph;
pub mod plug;

pub use action::{Action, ActionLog, Transaction, ValueChange};
pub use compute::{ComputeEngine, NodeEngine};
pub use config::HistoryConfig;
pub use error::{ConnectionRule, PlugError, Result};
pub use graph::{NodeId, PlugGraph, PlugId};
pub use plug::{
    BoolPlug, Direction, M33fPlug, M44fPlug, PlugFlags, PlugValue, StringPlug, TypeTag,
    TypedPlug, ValuePlug,
};
