//! Node Engine
//!
//! The reference [`ComputeEngine`]. Dirty plugs are refreshed as follows:
//!
//! - An input with an upstream connection pulls the upstream value, which
//!   may in turn recompute the upstream plug.
//! - An input without a connection republishes its cached value; nothing
//!   upstream can have changed it.
//! - An output runs the compute function registered for it and publishes
//!   the result. Compute functions read their node's inputs with
//!   [`TypedPlug::get_value`], passing the engine along, so recomputation
//!   recurses up the graph only as far as dirty plugs reach.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use super::ComputeEngine;
use crate::error::{PlugError, Result};
use crate::graph::PlugId;
use crate::plug::{Direction, PlugValue, TypedPlug, ValuePlug};

type ComputeFn = Arc<dyn Fn(&NodeEngine) -> Result<()> + Send + Sync>;

/// Runs registered compute functions for dirty output plugs.
pub struct NodeEngine {
    computes: RwLock<IndexMap<PlugId, ComputeFn>>,

    /// Number of refreshes performed.
    refreshes: AtomicUsize,
}

impl NodeEngine {
    pub fn new() -> Self {
        Self {
            computes: RwLock::new(IndexMap::new()),
            refreshes: AtomicUsize::new(0),
        }
    }

    /// Register the function computing `output`'s value.
    ///
    /// Replaces any previously registered function. The engine keeps only a
    /// weak reference to the plug.
    pub fn register_compute<V, F>(&self, output: &TypedPlug<V>, compute: F) -> Result<()>
    where
        V: PlugValue,
        F: Fn(&NodeEngine) -> Result<V> + Send + Sync + 'static,
    {
        if output.direction() != Direction::Output {
            return Err(PlugError::WrongDirection {
                plug: output.full_name().to_owned(),
                expected: Direction::Output,
            });
        }

        let target = output.downgrade();
        let compute: ComputeFn = Arc::new(move |engine: &NodeEngine| {
            let value = compute(engine)?;
            let plug = target.upgrade().ok_or(PlugError::UnknownPlug(target.id()))?;
            plug.set_value_internal(value);
            Ok(())
        });

        self.computes.write().insert(output.id(), compute);
        Ok(())
    }

    /// Forget the compute function for `output`.
    pub fn unregister_compute(&self, output: PlugId) -> bool {
        self.computes.write().shift_remove(&output).is_some()
    }

    pub fn has_compute(&self, output: PlugId) -> bool {
        self.computes.read().contains_key(&output)
    }

    /// Number of refreshes performed so far, successful or not.
    pub fn compute_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    fn refresh(&self, plug: &dyn ValuePlug) -> Result<()> {
        match plug.direction() {
            Direction::Input => plug.refresh_from_input(self),
            Direction::Output => {
                // Clone out so the lock is released before recursing.
                let compute = self.computes.read().get(&plug.id()).cloned();
                match compute {
                    Some(compute) => compute(self),
                    None => Err(PlugError::NoCompute {
                        plug: plug.full_name().to_owned(),
                    }),
                }
            }
        }
    }
}

impl ComputeEngine for NodeEngine {
    fn compute_if_dirty(&self, plug: &dyn ValuePlug) -> Result<()> {
        if !plug.is_dirty() {
            return Ok(());
        }

        self.refreshes.fetch_add(1, Ordering::Relaxed);
        debug!(plug = plug.full_name(), "recomputing");

        let result = self.refresh(plug);
        if let Err(err) = &result {
            warn!(plug = plug.full_name(), %err, "recompute failed");
        }
        result
    }
}

impl Default for NodeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeEngine")
            .field("computes", &self.computes.read().len())
            .field("compute_count", &self.compute_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionLog;
    use crate::graph::PlugGraph;
    use crate::plug::PlugFlags;
    use std::sync::atomic::AtomicBool;

    /// `x.out -> add.a`, `y.out -> add.b`, `add.sum = a + b`.
    struct Adder {
        _graph: PlugGraph,
        log: ActionLog,
        engine: NodeEngine,
        x: TypedPlug<i32>,
        y: TypedPlug<i32>,
        a: TypedPlug<i32>,
        sum: TypedPlug<i32>,
    }

    fn adder() -> Adder {
        let graph = PlugGraph::new();
        let x_node = graph.add_node("x").unwrap();
        let y_node = graph.add_node("y").unwrap();
        let add = graph.add_node("add").unwrap();

        let x = graph.add_plug(x_node, "out", Direction::Output, 1, PlugFlags::DEFAULT).unwrap();
        let y = graph.add_plug(y_node, "out", Direction::Output, 2, PlugFlags::DEFAULT).unwrap();
        let a = graph.add_plug(add, "a", Direction::Input, 0, PlugFlags::DEFAULT).unwrap();
        let b = graph.add_plug(add, "b", Direction::Input, 0, PlugFlags::DEFAULT).unwrap();
        let sum = graph.add_plug(add, "sum", Direction::Output, 0, PlugFlags::DEFAULT).unwrap();

        graph.declare_affects(&a, &sum).unwrap();
        graph.declare_affects(&b, &sum).unwrap();
        graph.connect(&a, &x).unwrap();
        graph.connect(&b, &y).unwrap();

        let engine = NodeEngine::new();
        let (ia, ib) = (a.clone(), b.clone());
        engine
            .register_compute(&sum, move |engine| {
                Ok(ia.get_value(engine)? + ib.get_value(engine)?)
            })
            .unwrap();

        Adder {
            _graph: graph,
            log: ActionLog::new(),
            engine,
            x,
            y,
            a,
            sum,
        }
    }

    #[test]
    fn output_recomputes_on_first_read() {
        let fx = adder();
        assert!(fx.sum.is_dirty());

        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 3);
        assert!(!fx.sum.is_dirty());
        assert!(!fx.a.is_dirty());
        // sum, a and b.
        assert_eq!(fx.engine.compute_count(), 3);
    }

    #[test]
    fn clean_reads_do_not_recompute() {
        let fx = adder();
        fx.sum.get_value(&fx.engine).unwrap();
        let before = fx.engine.compute_count();

        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 3);
        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 3);
        assert_eq!(fx.engine.compute_count(), before);
    }

    #[test]
    fn upstream_edit_recomputes_only_the_affected_branch() {
        let fx = adder();
        fx.sum.get_value(&fx.engine).unwrap();
        let before = fx.engine.compute_count();

        fx.x.set_value(10, &fx.log.begin("edit x")).unwrap();
        assert!(fx.a.is_dirty());
        assert!(fx.sum.is_dirty());

        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 12);
        // sum and a; b stayed clean.
        assert_eq!(fx.engine.compute_count(), before + 2);

        fx.y.set_value(5, &fx.log.begin("edit y")).unwrap();
        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 15);
    }

    #[test]
    fn undo_dirties_dependents_again() {
        let fx = adder();
        fx.x.set_value(10, &fx.log.begin("edit x")).unwrap();
        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 12);

        fx.log.undo().unwrap();
        assert!(fx.sum.is_dirty());
        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 3);

        fx.log.redo().unwrap();
        assert_eq!(fx.sum.get_value(&fx.engine).unwrap(), 12);
    }

    #[test]
    fn failed_compute_leaves_the_plug_dirty() {
        let graph = PlugGraph::new();
        let node = graph.add_node("n").unwrap();
        let out = graph
            .add_plug(node, "out", Direction::Output, 0_u32, PlugFlags::DEFAULT)
            .unwrap();
        out.mark_dirty();

        let fail = Arc::new(AtomicBool::new(true));
        let engine = NodeEngine::new();
        let should_fail = Arc::clone(&fail);
        engine
            .register_compute(&out, move |_| {
                if should_fail.load(Ordering::SeqCst) {
                    Err(PlugError::compute_failed("n.out", "source unavailable"))
                } else {
                    Ok(42)
                }
            })
            .unwrap();

        let err = out.get_value(&engine).unwrap_err();
        assert_eq!(err, PlugError::compute_failed("n.out", "source unavailable"));
        assert!(out.is_dirty());
        assert_eq!(out.cached_value(), 0);

        // A later read retries.
        fail.store(false, Ordering::SeqCst);
        assert_eq!(out.get_value(&engine).unwrap(), 42);
        assert!(!out.is_dirty());
    }

    #[test]
    fn dirty_output_without_compute_is_an_error() {
        let graph = PlugGraph::new();
        let node = graph.add_node("n").unwrap();
        let out = graph
            .add_plug(node, "out", Direction::Output, 0_i32, PlugFlags::DEFAULT)
            .unwrap();
        out.mark_dirty();

        let engine = NodeEngine::new();
        assert_eq!(
            out.get_value(&engine),
            Err(PlugError::NoCompute { plug: "n.out".into() })
        );
        assert!(out.is_dirty());
    }

    #[test]
    fn unconnected_input_keeps_its_value() {
        let graph = PlugGraph::new();
        let node = graph.add_node("n").unwrap();
        let input = graph
            .add_plug(node, "in", Direction::Input, 9_i32, PlugFlags::DEFAULT)
            .unwrap();
        input.mark_dirty();

        let engine = NodeEngine::new();
        assert_eq!(input.get_value(&engine).unwrap(), 9);
        assert!(!input.is_dirty());
    }

    #[test]
    fn computes_only_register_on_outputs() {
        let fx = adder();
        assert!(matches!(
            fx.engine.register_compute(&fx.a, |_| Ok(0)),
            Err(PlugError::WrongDirection { expected: Direction::Output, .. })
        ));
        assert!(fx.engine.has_compute(fx.sum.id()));
        assert!(fx.engine.unregister_compute(fx.sum.id()));
        assert!(!fx.engine.has_compute(fx.sum.id()));
    }
}
