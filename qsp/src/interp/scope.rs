//! Save groups for `LOCAL` variables
//!
//! Each code frame (location body, block, loop, subroutine call) allocates
//! a group. `LOCAL x` moves the current binding of `x` into the innermost
//! group; releasing the group swaps the saved binding back. Frames that
//! unwind with an error release their groups without restoring.

use super::error::InterpResult;
use super::vars::{VarStore, Variable};
use tracing::trace;

/// Bindings saved by one frame
#[derive(Debug, Default)]
pub struct SaveGroup {
    vars: Vec<(String, Variable)>,
}

impl SaveGroup {
    fn holds(&self, key: &str) -> bool {
        self.vars.iter().any(|(name, _)| name == key)
    }
}

/// Stack of save groups, innermost last
#[derive(Debug, Default)]
pub struct SaveStack {
    groups: Vec<SaveGroup>,
}

impl SaveStack {
    pub fn new() -> Self {
        SaveStack { groups: Vec::new() }
    }

    /// Push a new group and return the mark to release it with
    pub fn allocate(&mut self) -> usize {
        let mark = self.groups.len();
        self.groups.push(SaveGroup::default());
        mark
    }

    pub fn depth(&self) -> usize {
        self.groups.len()
    }

    /// Move a variable into the innermost group
    ///
    /// Only the first request per group saves anything; later requests
    /// for the same name keep the binding that is already saved.
    pub fn localize(&mut self, store: &mut VarStore, key: &str) -> InterpResult<()> {
        let Some(group) = self.groups.last_mut() else {
            return Ok(());
        };
        if group.holds(key) {
            return Ok(());
        }
        let saved = store.take(key);
        group.vars.push((key.to_string(), saved));
        trace!(name = key, depth = self.groups.len(), "localized");
        Ok(())
    }

    /// Release every group above `mark`
    ///
    /// With `restore` the saved bindings replace the current ones, newest
    /// group first. Without it the saved bindings are dropped. Marks that
    /// were already released by [`SaveStack::restore_all`] are ignored.
    pub fn release(&mut self, mark: usize, store: &mut VarStore, restore: bool) {
        while self.groups.len() > mark {
            let Some(group) = self.groups.pop() else { break };
            if restore {
                for (key, var) in group.vars.into_iter().rev() {
                    store.restore(key, var);
                }
            }
        }
    }

    /// Restore every group, leaving the stack empty
    pub fn restore_all(&mut self, store: &mut VarStore) {
        self.release(0, store, true);
    }

    /// Drop every group without restoring anything
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::value::Value;
    use crate::interp::vars::VarName;

    fn set(store: &mut VarStore, name: &str, n: i64) {
        store
            .set(&VarName::parse(name).unwrap(), &Value::Number(0), Value::Number(n))
            .unwrap();
    }

    fn get(store: &VarStore, name: &str) -> Value {
        store.get(&VarName::parse(name).unwrap(), &Value::Number(0))
    }

    #[test]
    fn test_release_restores() {
        let mut store = VarStore::new(64, 1024);
        let mut stack = SaveStack::new();
        set(&mut store, "x", 1);
        let mark = stack.allocate();
        stack.localize(&mut store, "X").unwrap();
        assert_eq!(get(&store, "x"), Value::Number(0));
        set(&mut store, "x", 2);
        stack.release(mark, &mut store, true);
        assert_eq!(get(&store, "x"), Value::Number(1));
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn test_release_without_restore_keeps_local_value() {
        let mut store = VarStore::new(64, 1024);
        let mut stack = SaveStack::new();
        set(&mut store, "x", 1);
        let mark = stack.allocate();
        stack.localize(&mut store, "X").unwrap();
        set(&mut store, "x", 99);
        stack.release(mark, &mut store, false);
        assert_eq!(get(&store, "x"), Value::Number(99));
    }

    #[test]
    fn test_first_localize_wins() {
        let mut store = VarStore::new(64, 1024);
        let mut stack = SaveStack::new();
        set(&mut store, "x", 1);
        let mark = stack.allocate();
        stack.localize(&mut store, "X").unwrap();
        set(&mut store, "x", 5);
        stack.localize(&mut store, "X").unwrap();
        assert_eq!(get(&store, "x"), Value::Number(5));
        stack.release(mark, &mut store, true);
        assert_eq!(get(&store, "x"), Value::Number(1));
    }

    #[test]
    fn test_nested_groups_and_restore_all() {
        let mut store = VarStore::new(64, 1024);
        let mut stack = SaveStack::new();
        set(&mut store, "x", 1);
        let outer = stack.allocate();
        stack.localize(&mut store, "X").unwrap();
        set(&mut store, "x", 2);
        let inner = stack.allocate();
        stack.localize(&mut store, "X").unwrap();
        set(&mut store, "x", 3);
        stack.restore_all(&mut store);
        assert_eq!(get(&store, "x"), Value::Number(1));
        // stale marks are no-ops
        stack.release(inner, &mut store, true);
        stack.release(outer, &mut store, false);
        assert_eq!(get(&store, "x"), Value::Number(1));
    }
}
