//! Generational cycle collector.
//!
//! Reference counting frees acyclic data on its own; cells caught in a
//! reference cycle never drop to zero. The collector owns every cell through
//! its generational tracked sets and periodically runs a tracing pass over
//! one generation: it counts how many references to each reachable cell come
//! from inside the traversed subgraph, and any cell whose whole strong count
//! is accounted for that way has no outside holder and is part of dead data.
//! Dead cells are uninitialized first (severing the cycle's internal edges)
//! and then parked in a reuse pool.
//!
//! Young cells are collected often, survivors are promoted, and old cells
//! are visited rarely. Collection is strictly non-reentrant; a request made
//! while a pass is running is a no-op.

use std::cell::Cell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;

use crate::variable::{VarRef, Variable};
use crate::{gc_log, gc_log_enabled};

pub const GENERATION_COUNT: usize = 3;

/// Age cohort of a tracked cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Generation {
    Youngest,
    Middle,
    Oldest,
}

impl Generation {
    pub fn index(self) -> usize {
        self as usize
    }
}

fn cell_key(var: &VarRef) -> usize {
    Rc::as_ptr(var) as usize
}

fn slot_key(slot: &VarRef) -> usize {
    slot as *const VarRef as usize
}

/// Address-keyed set of strong cell handles. Used both keyed by cell address
/// (tracked sets, working sets) and keyed by owning-slot address (the staged
/// edge set, where one entry is one reference).
#[derive(Default)]
struct VariableSet {
    map: HashMap<usize, VarRef>,
}

impl VariableSet {
    fn len(&self) -> usize {
        self.map.len()
    }

    /// Inserts keyed by cell address. Returns false if already present.
    fn insert(&mut self, var: &VarRef) -> bool {
        self.insert_at(cell_key(var), var)
    }

    fn insert_at(&mut self, key: usize, var: &VarRef) -> bool {
        match self.map.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(var.clone());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn remove(&mut self, var: &VarRef) -> bool {
        self.map.remove(&cell_key(var)).is_some()
    }

    fn take_any(&mut self) -> Option<VarRef> {
        let key = *self.map.keys().next()?;
        self.map.remove(&key)
    }

    fn merge(&mut self, other: &VariableSet) {
        for var in other.map.values() {
            self.insert(var);
        }
    }
}

struct GenerationState {
    tracked: VariableSet,
    count: usize,
    threshold: usize,
}

/// Owns every variable cell of one interpreter instance.
pub struct GarbageCollector {
    recur: Cell<u32>,
    pool: Vec<VarRef>,
    gens: [GenerationState; GENERATION_COUNT],
}

/// Re-entry guard for collection passes. Entering fails while another pass
/// is on the stack.
struct Sentry<'a> {
    recur: &'a Cell<u32>,
}

impl<'a> Sentry<'a> {
    fn enter(recur: &'a Cell<u32>) -> Option<Self> {
        if recur.get() != 0 {
            return None;
        }
        recur.set(recur.get() + 1);
        Some(Self { recur })
    }
}

impl Drop for Sentry<'_> {
    fn drop(&mut self) {
        self.recur.set(self.recur.get() - 1);
    }
}

const DEFAULT_THRESHOLDS: [usize; GENERATION_COUNT] = [10, 70, 500];

impl Default for GarbageCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl GarbageCollector {
    pub fn new() -> Self {
        Self {
            recur: Cell::new(0),
            pool: Vec::new(),
            gens: std::array::from_fn(|g| GenerationState {
                tracked: VariableSet::default(),
                count: 0,
                threshold: DEFAULT_THRESHOLDS[g],
            }),
        }
    }

    pub fn threshold(&self, generation: Generation) -> usize {
        self.gens[generation.index()].threshold
    }

    pub fn set_threshold(&mut self, generation: Generation, threshold: usize) {
        self.gens[generation.index()].threshold = threshold;
    }

    pub fn count_tracked(&self, generation: Generation) -> usize {
        self.gens[generation.index()].tracked.len()
    }

    pub fn count_pooled(&self) -> usize {
        self.pool.len()
    }

    pub fn clear_pooled(&mut self) {
        self.pool.clear();
    }

    /// Hands out a fresh (or recycled) uninitialized cell tracked by the
    /// hinted generation. Any generation whose allocation counter has reached
    /// its threshold is collected first, youngest to oldest.
    pub fn create_variable(&mut self, gen_hint: Generation) -> VarRef {
        for g in 0..GENERATION_COUNT {
            if self.gens[g].count >= self.gens[g].threshold {
                self.do_collect_generation(g);
            }
        }
        let var = match self.pool.pop() {
            Some(var) => {
                var.set_gc_ref(0);
                var
            }
            None => Variable::new_cell(),
        };
        let state = &mut self.gens[gen_hint.index()];
        state.tracked.insert(&var);
        state.count += 1;
        var
    }

    /// Collects every generation up to and including `gen_limit`, clears the
    /// reuse pool, and returns the number of cells reclaimed.
    pub fn collect(&mut self, gen_limit: Generation) -> usize {
        let mut nvars = 0;
        for g in 0..=gen_limit.index() {
            nvars += self.do_collect_generation(g);
        }
        self.pool.clear();
        nvars
    }

    /// Tears the collector down: uninitializes every tracked cell of every
    /// generation (indirect foreign references are left alone), clears the
    /// pool, and returns the number of cells observed. Calling this while a
    /// collection is in progress is a programmer error.
    pub fn finalize(&mut self) -> usize {
        if self.recur.get() != 0 {
            panic!("[rye runtime] garbage collector is not finalizable while a collection is in progress");
        }
        let mut nvars = 0;
        for state in &mut self.gens {
            nvars += state.tracked.len();
            while let Some(var) = state.tracked.take_any() {
                var.uninitialize();
            }
        }
        nvars += self.pool.len();
        self.pool.clear();
        if gc_log_enabled() {
            gc_log(format_args!("gc: finalize dropped {} cells", nvars));
        }
        nvars
    }

    fn do_collect_generation(&mut self, g: usize) -> usize {
        let Some(_sentry) = Sentry::enter(&self.recur) else {
            return 0;
        };

        let tracked_before = self.gens[g].tracked.len();
        let mut staged = VariableSet::default();
        let mut temp_1 = VariableSet::default();
        let mut temp_2 = VariableSet::default();
        let mut unreach = VariableSet::default();
        let mut reachable = VariableSet::default();
        let mut nvars = 0usize;

        // Walk everything reachable from this generation's tracked set. Each
        // visited cell starts with one counted reference, standing for the
        // tracked-set entry of whichever generation owns it. `staged` records
        // each owning slot once, so an edge is never counted twice even when
        // the walk revisits a cell.
        temp_1.merge(&self.gens[g].tracked);
        while let Some(var) = temp_1.take_any() {
            var.set_gc_ref(1);
            debug_assert!(var.gc_ref() <= Rc::strong_count(&var) - 1);
            var.for_each_referenced_variable(&mut |slot| {
                if staged.insert_at(slot_key(slot), slot) {
                    temp_1.insert(slot);
                }
            });
        }

        // Each staged slot is one reference originating inside the subgraph.
        while let Some(var) = staged.take_any() {
            var.set_gc_ref(var.gc_ref() + 1);
            debug_assert!(var.gc_ref() <= Rc::strong_count(&var) - 1);
            temp_1.insert(&var);
        }

        // Partition. A cell whose counted references account for its whole
        // strong count (minus the handle drained into `popped`) has no
        // holder outside the subgraph. Every other cell is reachable and so
        // is everything its value refers to, transitively.
        temp_1.merge(&self.gens[g].tracked);
        while let Some(popped) = temp_1.take_any() {
            if popped.gc_ref() == Rc::strong_count(&popped) - 1 {
                unreach.insert(&popped);
                continue;
            }
            let mut var = popped;
            loop {
                var.set_gc_ref(0);
                unreach.remove(&var);
                reachable.insert(&var);
                var.for_each_referenced_variable(&mut |slot| {
                    if staged.insert_at(slot_key(slot), slot) {
                        temp_2.insert(slot);
                    }
                });
                match temp_2.take_any() {
                    Some(next) => var = next,
                    None => break,
                }
            }
        }

        // Reclaim. Uninitializing severs each dead cell's outgoing edges, so
        // the whole cycle is broken before any member can be freed. Cells
        // tracked by this generation go to the reuse pool; dead cells owned
        // by an older generation are merely emptied here and stay tracked
        // there.
        while let Some(var) = unreach.take_any() {
            debug_assert!(var.gc_ref() != 0);
            var.uninitialize();
            let erased = self.gens[g].tracked.remove(&var);
            nvars += 1;
            if erased {
                self.pool.push(var);
            }
        }

        // Promote survivors that this generation tracks into the next one.
        if g + 1 < GENERATION_COUNT {
            let (lo, hi) = self.gens.split_at_mut(g + 1);
            let cur = &mut lo[g];
            let next = &mut hi[0];
            while let Some(var) = reachable.take_any() {
                debug_assert_eq!(var.gc_ref(), 0);
                if cur.tracked.remove(&var) {
                    next.tracked.insert(&var);
                    next.count += 1;
                }
            }
        }

        // The allocation counter resets only when the pass ran to completion.
        self.gens[g].count = 0;

        if gc_log_enabled() {
            gc_log(format_args!(
                "gc: generation {} pass reclaimed {} cells ({} were tracked)",
                g, nvars, tracked_before
            ));
        }
        nvars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn create_tracks_in_the_hinted_generation() {
        let mut gc = GarbageCollector::new();
        let _a = gc.create_variable(Generation::Youngest);
        let _b = gc.create_variable(Generation::Oldest);
        assert_eq!(gc.count_tracked(Generation::Youngest), 1);
        assert_eq!(gc.count_tracked(Generation::Middle), 0);
        assert_eq!(gc.count_tracked(Generation::Oldest), 1);
    }

    #[test]
    fn thresholds_are_per_generation_and_mutable() {
        let mut gc = GarbageCollector::new();
        assert_eq!(gc.threshold(Generation::Youngest), 10);
        assert_eq!(gc.threshold(Generation::Middle), 70);
        assert_eq!(gc.threshold(Generation::Oldest), 500);
        gc.set_threshold(Generation::Youngest, 3);
        assert_eq!(gc.threshold(Generation::Youngest), 3);
    }

    #[test]
    fn unrooted_plain_cells_are_reclaimed_and_pooled() {
        let mut gc = GarbageCollector::new();
        {
            let var = gc.create_variable(Generation::Youngest);
            var.initialize(Value::from(1i64), false);
        }
        // The root handle is gone; only the tracked set holds the cell.
        let reclaimed = gc.do_collect_generation(0);
        assert_eq!(reclaimed, 1);
        assert_eq!(gc.count_tracked(Generation::Youngest), 0);
        assert_eq!(gc.count_pooled(), 1);
    }

    #[test]
    fn pooled_cells_are_reused() {
        let mut gc = GarbageCollector::new();
        let first = gc.create_variable(Generation::Youngest);
        first.initialize(Value::from(1i64), true);
        let address = Rc::as_ptr(&first);
        drop(first);
        gc.do_collect_generation(0);
        assert_eq!(gc.count_pooled(), 1);

        let second = gc.create_variable(Generation::Youngest);
        assert_eq!(Rc::as_ptr(&second), address);
        assert!(!second.is_initialized());
        assert!(!second.is_immutable());
    }

    #[test]
    fn rooted_cells_survive_and_promote() {
        let mut gc = GarbageCollector::new();
        let var = gc.create_variable(Generation::Youngest);
        var.initialize(Value::from(5i64), false);
        let reclaimed = gc.do_collect_generation(0);
        assert_eq!(reclaimed, 0);
        assert_eq!(gc.count_tracked(Generation::Youngest), 0);
        assert_eq!(gc.count_tracked(Generation::Middle), 1);
        assert_eq!(var.value().as_integer(), Some(5));
    }

    #[test]
    fn oldest_generation_has_nowhere_to_promote() {
        let mut gc = GarbageCollector::new();
        let var = gc.create_variable(Generation::Oldest);
        var.initialize(Value::Null, false);
        gc.do_collect_generation(2);
        assert_eq!(gc.count_tracked(Generation::Oldest), 1);
    }

    #[test]
    fn collect_clears_the_pool() {
        let mut gc = GarbageCollector::new();
        {
            let var = gc.create_variable(Generation::Youngest);
            var.initialize(Value::Null, false);
        }
        let reclaimed = gc.collect(Generation::Oldest);
        assert_eq!(reclaimed, 1);
        assert_eq!(gc.count_pooled(), 0);
    }

    #[test]
    fn finalize_is_idempotent() {
        let mut gc = GarbageCollector::new();
        let kept = gc.create_variable(Generation::Youngest);
        kept.initialize(Value::from("data"), false);
        let _other = gc.create_variable(Generation::Middle);
        assert_eq!(gc.finalize(), 2);
        assert!(!kept.is_initialized());
        assert_eq!(gc.finalize(), 0);
    }
}
