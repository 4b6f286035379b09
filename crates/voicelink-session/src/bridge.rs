//! Adapts a host navigation function into the session's navigator slot.

use crate::navigator::{Navigator, NavigatorRegistry, RegistrationId};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Options passed to the host navigation function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavigateOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
}

/// Transform applied to every destination before navigation.
pub type UrlNormalizer = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// How a [`RouterBridge`] adapts destinations.
#[derive(Clone, Default)]
pub struct BridgeOptions {
    pub normalize_url: Option<UrlNormalizer>,
    pub replace: bool,
}

impl fmt::Debug for BridgeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeOptions")
            .field("normalize_url", &self.normalize_url.is_some())
            .field("replace", &self.replace)
            .finish()
    }
}

impl BridgeOptions {
    pub fn replace(mut self, replace: bool) -> Self {
        self.replace = replace;
        self
    }

    pub fn normalize_with<F>(mut self, normalize: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.normalize_url = Some(Arc::new(normalize));
        self
    }
}

/// A mounted bridge. Dropping it unregisters its navigator.
///
/// Unregistering only clears the slot if this bridge still owns it, so a
/// bridge replaced by a newer one never clears its successor.
pub struct RouterBridge {
    registry: NavigatorRegistry,
    registration: RegistrationId,
}

impl fmt::Debug for RouterBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBridge")
            .field("registration", &self.registration)
            .finish()
    }
}

impl RouterBridge {
    /// Registers `navigate` with `registry` and returns the mount guard.
    pub fn mount<F>(registry: &NavigatorRegistry, navigate: F, options: BridgeOptions) -> Self
    where
        F: Fn(&str, NavigateOptions) + Send + Sync + 'static,
    {
        let BridgeOptions {
            normalize_url,
            replace,
        } = options;
        let nav_options = NavigateOptions { replace };

        let adapter: Navigator = Arc::new(move |to: &str| {
            let destination = match &normalize_url {
                Some(normalize) => normalize(to),
                None => to.to_string(),
            };
            navigate(&destination, nav_options);
        });

        let registration = registry.set_navigator(Some(adapter));
        debug!(?registration, replace, "router bridge mounted");
        Self {
            registry: registry.clone(),
            registration,
        }
    }

    pub fn registration(&self) -> RegistrationId {
        self.registration
    }

    /// Unmounts the bridge now rather than at end of scope.
    pub fn unmount(self) {}
}

impl Drop for RouterBridge {
    fn drop(&mut self) {
        let cleared = self.registry.clear_if_current(self.registration);
        debug!(registration = ?self.registration, cleared, "router bridge unmounted");
    }
}
