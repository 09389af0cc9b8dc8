//! Dependency graph checks run before insertion.

use std::collections::HashSet;

use crate::id::ThreadId;

/// Find a dependency cycle reachable from any of `roots`.
///
/// `deps_of` yields the direct dependencies of a node. Returns the cycle as a
/// path whose first and last elements are the same node.
pub(crate) fn find_cycle<F>(roots: &[ThreadId], deps_of: F) -> Option<Vec<ThreadId>>
where
    F: Fn(ThreadId) -> Vec<ThreadId>,
{
    let mut visited = HashSet::new();
    let mut stack = Vec::new();

    fn dfs<F>(node: ThreadId, deps_of: &F, visited: &mut HashSet<ThreadId>, stack: &mut Vec<ThreadId>) -> Option<Vec<ThreadId>>
    where
        F: Fn(ThreadId) -> Vec<ThreadId>,
    {
        if let Some(pos) = stack.iter().position(|n| *n == node) {
            let mut cycle = stack[pos..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        if !visited.insert(node) {
            return None;
        }

        stack.push(node);
        for dep in deps_of(node) {
            if let Some(cycle) = dfs(dep, deps_of, visited, stack) {
                return Some(cycle);
            }
        }
        stack.pop();
        None
    }

    for root in roots {
        if let Some(cycle) = dfs(*root, &deps_of, &mut visited, &mut stack) {
            return Some(cycle);
        }
    }
    None
}
