//! Scoped release of acquired cluster handles
//!
//! Every handle is pushed onto a `ReleaseStack` as soon as it is acquired.
//! `unwind` walks the stack once, in reverse acquisition order, releasing
//! each entry exactly once and carrying on past failures. Entries pushed
//! with `push_base` are released after all the others.

use std::any::Any;
use std::marker::PhantomData;

use log::warn;

use crate::cluster::{ClusterClient, ClusterDescriptor};
use crate::error::{report, ClusterError};
use crate::graph::PackagedProgram;

/// A handle that must be released after use
pub trait Release: Send + 'static {
    fn release(&mut self) -> Result<(), ClusterError>;
}

impl Release for Box<dyn ClusterDescriptor> {
    fn release(&mut self) -> Result<(), ClusterError> {
        self.close()
    }
}

impl Release for Box<dyn ClusterClient> {
    fn release(&mut self) -> Result<(), ClusterError> {
        self.close()
    }
}

impl Release for Box<dyn PackagedProgram> {
    fn release(&mut self) -> Result<(), ClusterError> {
        self.close()
    }
}

/// A release that failed during unwind
#[derive(Debug)]
pub struct ReleaseFailure {
    pub label: &'static str,
    pub error: ClusterError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Top,
    Base,
}

/// Typed access to an entry of a `ReleaseStack`
pub struct Slot<R> {
    tier: Tier,
    index: usize,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for Slot<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Slot<R> {}

type ReleaseFn = fn(&mut (dyn Any + Send + 'static)) -> Result<(), ClusterError>;

struct Entry {
    label: &'static str,
    resource: Box<dyn Any + Send>,
    release: ReleaseFn,
}

fn release_as<R: Release>(resource: &mut (dyn Any + Send + 'static)) -> Result<(), ClusterError> {
    match resource.downcast_mut::<R>() {
        Some(r) => r.release(),
        None => Ok(()),
    }
}

/// Acquired handles, released in reverse acquisition order
#[derive(Default)]
pub struct ReleaseStack {
    top: Vec<Entry>,
    base: Vec<Entry>,
}

impl ReleaseStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly acquired handle
    pub fn push<R: Release>(&mut self, label: &'static str, resource: R) -> Slot<R> {
        self.top.push(Self::entry(label, resource));
        Slot {
            tier: Tier::Top,
            index: self.top.len() - 1,
            _marker: PhantomData,
        }
    }

    /// Register a handle that is released after every other entry
    pub fn push_base<R: Release>(&mut self, label: &'static str, resource: R) -> Slot<R> {
        self.base.push(Self::entry(label, resource));
        Slot {
            tier: Tier::Base,
            index: self.base.len() - 1,
            _marker: PhantomData,
        }
    }

    fn entry<R: Release>(label: &'static str, resource: R) -> Entry {
        Entry {
            label,
            resource: Box::new(resource),
            release: release_as::<R>,
        }
    }

    fn entry_mut(&mut self, tier: Tier, index: usize) -> &mut Entry {
        match tier {
            Tier::Top => &mut self.top[index],
            Tier::Base => &mut self.base[index],
        }
    }

    /// Borrow a registered handle.
    ///
    /// # Panics
    ///
    /// If `slot` was issued by a different stack.
    pub fn get<R: Release>(&mut self, slot: Slot<R>) -> &R {
        self.get_mut(slot)
    }

    /// Mutably borrow a registered handle.
    ///
    /// Slots are only handed out by `push` and `push_base`, and entries are
    /// never removed before `unwind` consumes the stack, so a slot always
    /// names a live entry of the stack that issued it.
    ///
    /// # Panics
    ///
    /// If `slot` was issued by a different stack.
    pub fn get_mut<R: Release>(&mut self, slot: Slot<R>) -> &mut R {
        self.entry_mut(slot.tier, slot.index)
            .resource
            .as_mut()
            .downcast_mut::<R>()
            .expect("slot used with the stack that issued it")
    }

    pub fn len(&self) -> usize {
        self.top.len() + self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Labels in the order `unwind` will release them
    pub fn release_order(&self) -> Vec<&'static str> {
        self.top
            .iter()
            .rev()
            .chain(self.base.iter().rev())
            .map(|e| e.label)
            .collect()
    }

    /// Release every entry, returning the failures
    pub fn unwind(mut self) -> Vec<ReleaseFailure> {
        self.release_all()
    }

    fn release_all(&mut self) -> Vec<ReleaseFailure> {
        let mut failures = Vec::new();
        while let Some(entry) = self.top.pop().or_else(|| self.base.pop()) {
            let Entry {
                label,
                mut resource,
                release,
            } = entry;
            if let Err(error) = release(resource.as_mut()) {
                failures.push(ReleaseFailure { label, error });
            }
        }
        failures
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        for failure in self.release_all() {
            warn!("release of {} failed: {}", failure.label, report(&failure.error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Tracked {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
        uses: u32,
    }

    impl Tracked {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self {
                name,
                log: Arc::clone(log),
                fail: false,
                uses: 0,
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    impl Release for Tracked {
        fn release(&mut self) -> Result<(), ClusterError> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                Err(ClusterError::Rejected(format!("{} refused to close", self.name)))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_unwind_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ReleaseStack::new();
        stack.push("descriptor", Tracked::new("descriptor", &log));
        stack.push("client", Tracked::new("client", &log));

        assert_eq!(stack.release_order(), vec!["client", "descriptor"]);
        let failures = stack.unwind();

        assert!(failures.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["client", "descriptor"]);
    }

    #[test]
    fn test_base_entries_released_last() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ReleaseStack::new();
        stack.push("descriptor", Tracked::new("descriptor", &log));
        stack.push_base("program", Tracked::new("program", &log));
        stack.push("client", Tracked::new("client", &log));

        stack.unwind();
        assert_eq!(*log.lock().unwrap(), vec!["client", "descriptor", "program"]);
    }

    #[test]
    fn test_failure_does_not_stop_unwind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ReleaseStack::new();
        stack.push("descriptor", Tracked::new("descriptor", &log));
        stack.push("client", Tracked::new("client", &log).failing());

        let failures = stack.unwind();

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].label, "client");
        assert_eq!(*log.lock().unwrap(), vec!["client", "descriptor"]);
    }

    #[test]
    fn test_drop_releases_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let mut stack = ReleaseStack::new();
            stack.push("descriptor", Tracked::new("descriptor", &log));
        }
        assert_eq!(*log.lock().unwrap(), vec!["descriptor"]);

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ReleaseStack::new();
        stack.push("descriptor", Tracked::new("descriptor", &log));
        stack.unwind();
        // unwind consumed the stack; its drop found nothing left
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_slot_access() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = ReleaseStack::new();
        let first = stack.push("first", Tracked::new("first", &log));
        let second = stack.push_base("second", Tracked::new("second", &log));

        stack.get_mut(first).uses += 1;
        stack.get_mut(second).uses += 2;

        assert_eq!(stack.get(first).uses, 1);
        assert_eq!(stack.get(second).uses, 2);
        assert_eq!(stack.len(), 2);
    }

    #[test]
    #[should_panic(expected = "slot used with the stack that issued it")]
    fn test_foreign_slot_panics() {
        struct Other;
        impl Release for Other {
            fn release(&mut self) -> Result<(), ClusterError> {
                Ok(())
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut first = ReleaseStack::new();
        let slot = first.push("other", Other);
        let mut second = ReleaseStack::new();
        second.push("tracked", Tracked::new("tracked", &log));

        second.get_mut(slot);
    }

    #[test]
    fn test_empty_stack() {
        let stack = ReleaseStack::new();
        assert!(stack.is_empty());
        assert!(stack.unwind().is_empty());
    }
}
