// Binding acquisition. The hosting environment injects the platform object
// some time after startup; a BindingSource is where the store's probe looks
// for it on every poll tick.

use std::sync::{Arc, RwLock};

use super::Platform;

/// Where the readiness probe looks for the platform binding.
///
/// `acquire` runs once per poll tick and must be cheap and non-blocking.
pub trait BindingSource: Send + Sync + 'static {
    fn acquire(&self) -> Option<Arc<dyn Platform>>;
}

/// A slot the host fills once its platform object has finished loading.
/// This is the late-injected global of the original environment, made
/// explicit: the store polls the slot instead of a process-wide lookup.
#[derive(Default)]
pub struct LateBinding {
    slot: RwLock<Option<Arc<dyn Platform>>>,
}

impl LateBinding {
    /// An empty slot. The probe keeps polling until `install` is called.
    pub fn empty() -> Arc<Self> {
        Arc::new(LateBinding::default())
    }

    /// A slot that already holds the binding; the probe resolves on its
    /// first tick.
    pub fn installed(platform: Arc<dyn Platform>) -> Arc<Self> {
        let binding = LateBinding::default();
        binding.install(platform);
        Arc::new(binding)
    }

    /// Publishes the binding, replacing any previous one.
    pub fn install(&self, platform: Arc<dyn Platform>) {
        *self.slot.write().expect("binding slot poisoned") = Some(platform);
    }

    /// Removes the binding. Affects future probes only; stores that already
    /// adopted the old binding keep it until reset.
    pub fn clear(&self) {
        *self.slot.write().expect("binding slot poisoned") = None;
    }
}

impl BindingSource for LateBinding {
    fn acquire(&self) -> Option<Arc<dyn Platform>> {
        self.slot.read().expect("binding slot poisoned").clone()
    }
}
