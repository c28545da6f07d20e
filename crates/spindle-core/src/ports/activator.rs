//! Activator port - decides whether this process should run the loop.

/// Gate evaluated at the start of every dispatch cycle.
///
/// Typically backed by leader election: only the elected instance drains the
/// queue, the rest keep ticking without side effects.
pub trait Activator: Send + Sync {
    fn is_active(&self) -> bool;
}
