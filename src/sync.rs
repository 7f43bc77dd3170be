//! Lightweight spin lock for short per-node critical sections
//!
//! Accumulating a particle contribution into a node is a handful of
//! floating-point additions, so contending threads spin instead of parking.
//! `get_mut` gives lock-free access during exclusive (`&mut`) passes.

pub type SpinMutex<T> = spin::Mutex<T>;
pub type SpinMutexGuard<'a, T> = spin::MutexGuard<'a, T>;
