//! Shared navigator slot.
//!
//! The relay that receives `navigate` commands lives inside the room
//! connection; the code that can actually navigate lives wherever the
//! host's router is. Both hold a clone of the same [`NavigatorRegistry`],
//! scoped to one session, and meet through its single slot.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Callback that performs navigation to a destination.
pub type Navigator = Arc<dyn Fn(&str) + Send + Sync>;

/// Identifies one call to [`NavigatorRegistry::set_navigator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

#[derive(Default)]
struct Slot {
    id: u64,
    navigator: Option<Navigator>,
}

/// Single-slot, replaceable navigator shared between clones.
#[derive(Clone, Default)]
pub struct NavigatorRegistry {
    slot: Arc<RwLock<Slot>>,
}

impl fmt::Debug for NavigatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.read();
        f.debug_struct("NavigatorRegistry")
            .field("registration", &slot.id)
            .field("registered", &slot.navigator.is_some())
            .finish()
    }
}

impl NavigatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current navigator; `None` clears the slot.
    pub fn set_navigator(&self, navigator: Option<Navigator>) -> RegistrationId {
        let mut slot = self.slot.write();
        slot.id += 1;
        slot.navigator = navigator;
        RegistrationId(slot.id)
    }

    /// Clears the slot only if `id` is still the latest registration.
    pub fn clear_if_current(&self, id: RegistrationId) -> bool {
        let mut slot = self.slot.write();
        if slot.id != id.0 {
            return false;
        }
        slot.navigator = None;
        true
    }

    /// Returns the current navigator, if any.
    pub fn navigator(&self) -> Option<Navigator> {
        self.slot.read().navigator.clone()
    }

    pub fn is_registered(&self) -> bool {
        self.slot.read().navigator.is_some()
    }

    /// Invokes the current navigator. Returns `false` when none is registered.
    ///
    /// The lock is released before the callback runs, so a navigator may
    /// itself re-register.
    pub fn navigate(&self, destination: &str) -> bool {
        match self.navigator() {
            Some(navigator) => {
                navigator(destination);
                true
            }
            None => false,
        }
    }
}
