//! Resolution stack for cycle detection.
//!
//! Each container and scope keeps its own stack of tokens currently under
//! construction, one per thread. A token that shows up twice on the same
//! stack is a cycle.

use std::thread::{self, ThreadId};

use dashmap::DashMap;
use tracing::warn;

use crate::error::{AmbitError, CircularDependencyError, Result};
use crate::token::TokenKey;

#[derive(Debug, Default)]
pub(crate) struct ResolutionStack {
    frames: DashMap<ThreadId, Vec<TokenKey>>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `key`, or fails with the cycle if it is already in flight.
    ///
    /// The frame is popped when the returned guard drops, whether the
    /// construction succeeded, failed or panicked.
    pub fn enter(&self, key: &TokenKey) -> Result<StackGuard<'_>> {
        let thread = thread::current().id();
        let mut frames = self.frames.entry(thread).or_default();

        if let Some(start) = frames.iter().position(|k| k == key) {
            let mut chain = frames[start..].to_vec();
            chain.push(key.clone());
            warn!(token = %key, depth = frames.len(), "Circular dependency detected");
            return Err(AmbitError::CircularDependency(CircularDependencyError { chain }));
        }

        frames.push(key.clone());
        Ok(StackGuard { stack: self, thread })
    }

    /// Number of in-flight tokens on the calling thread.
    pub fn depth(&self) -> usize {
        self.frames
            .get(&thread::current().id())
            .map_or(0, |frames| frames.len())
    }
}

pub(crate) struct StackGuard<'a> {
    stack: &'a ResolutionStack,
    thread: ThreadId,
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        let empty = match self.stack.frames.get_mut(&self.thread) {
            Some(mut frames) => {
                frames.pop();
                frames.is_empty()
            }
            None => false,
        };
        if empty {
            self.stack.frames.remove_if(&self.thread, |_, frames| frames.is_empty());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Token;

    fn key(name: &'static str) -> TokenKey {
        Token::<u32>::new(name).key().clone()
    }

    #[test]
    fn nested_enter_and_unwind() {
        let stack = ResolutionStack::new();
        let (a, b) = (key("A"), key("B"));
        {
            let _ga = stack.enter(&a).unwrap();
            let _gb = stack.enter(&b).unwrap();
            assert_eq!(stack.depth(), 2);
        }
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn reentry_is_a_cycle_with_chain() {
        let stack = ResolutionStack::new();
        let (a, b, c) = (key("A"), key("B"), key("C"));
        let _ga = stack.enter(&a).unwrap();
        let _gb = stack.enter(&b).unwrap();
        let _gc = stack.enter(&c).unwrap();

        match stack.enter(&b) {
            Err(AmbitError::CircularDependency(e)) => {
                assert_eq!(e.chain, vec![b.clone(), c.clone(), b.clone()]);
            }
            other => panic!("Expected CircularDependency, got: {:?}", other.err()),
        }
        // the failed enter pushed nothing
        assert_eq!(stack.depth(), 3);
    }

    #[test]
    fn same_name_different_token_is_not_a_cycle() {
        let stack = ResolutionStack::new();
        let first = key("Config");
        let second = key("Config");
        let _g1 = stack.enter(&first).unwrap();
        assert!(stack.enter(&second).is_ok());
    }

    #[test]
    fn threads_have_separate_stacks() {
        let stack = ResolutionStack::new();
        let a = key("A");
        let _guard = stack.enter(&a).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(stack.depth(), 0);
                assert!(stack.enter(&a).is_ok());
            });
        });
        assert_eq!(stack.depth(), 1);
    }
}
