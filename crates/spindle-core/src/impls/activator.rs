//! Activator implementations.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::ports::Activator;

/// Always runs the loop. For single-instance deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysActive;

impl Activator for AlwaysActive {
    fn is_active(&self) -> bool {
        true
    }
}

/// A flag flipped by whatever elects the active instance.
#[derive(Debug, Default)]
pub struct SwitchActivator {
    active: AtomicBool,
}

impl SwitchActivator {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
        }
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }
}

impl Activator for SwitchActivator {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
