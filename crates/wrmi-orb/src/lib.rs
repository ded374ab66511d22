//! Client-side ORB for the WRMI protocol.
//!
//! The [`Orb`] owns the duplex pipe channel to the compiler process and
//! routes traffic over it: outbound requests are matched to replies by
//! request id, inbound server-initiated requests are dispatched to locally
//! registered servants, and SHUTDOWN/VALIDATE control frames drive the
//! session lifecycle. Everything runs cooperatively on the calling thread;
//! the only suspension point is the blocking pipe read.

pub mod adapter;
pub mod error;
pub mod launcher;
pub mod orb;
pub mod pool;
pub mod remote;

#[cfg(test)]
pub(crate) mod testutil;

pub use adapter::{ObjectAdapter, AdapterError, Servant, SystemFault};
pub use error::{OrbError, Result};
pub use launcher::{launch, LaunchConfig};
pub use orb::{Orb, OrbConfig};
pub use pool::BufferPool;
pub use remote::{RemoteHandle, Reply};
