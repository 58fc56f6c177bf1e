// interrupt.rs — Shared flag raised by the binary's Ctrl-C handler.
//
// The first Ctrl-C only raises the flag; the engine sees it between tasks.
// A second Ctrl-C means the user will not wait for the running task, so the
// handler calls `force_shutdown`, which runs the hook the active run
// installed (close the tracker, terminate workers) before the process exits.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type ShutdownHook = Box<dyn FnOnce() + Send>;

/// Cloneable handle to one interrupt flag.
#[derive(Clone, Default)]
pub struct InterruptFlag {
    raised: Arc<AtomicBool>,
    hook: Arc<Mutex<Option<ShutdownHook>>>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Install the hook `force_shutdown` runs, replacing any previous one.
    pub fn set_shutdown_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *self.lock_hook() = Some(Box::new(hook));
    }

    /// Remove the hook without running it.
    pub fn clear_shutdown_hook(&self) {
        self.lock_hook().take();
    }

    /// Raise the flag and run the shutdown hook, if one is installed.
    /// The hook runs at most once.
    pub fn force_shutdown(&self) {
        self.interrupt();
        let hook = self.lock_hook().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn lock_hook(&self) -> std::sync::MutexGuard<'_, Option<ShutdownHook>> {
        self.hook.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl fmt::Debug for InterruptFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptFlag")
            .field("raised", &self.is_interrupted())
            .field("hook", &self.lock_hook().is_some())
            .finish()
    }
}
