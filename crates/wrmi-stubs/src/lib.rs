//! Typed client stubs for the compiler's remote objects.
//!
//! Each stub wraps one remote identity and expresses its operations as
//! CDR-encoded requests through the ORB: prepare a request buffer, append
//! arguments, invoke, read results. Bulk dataset I/O is not part of this
//! surface; higher layers submit the compiler's own textual import/export
//! commands instead.

pub mod dataset;
pub mod libref;
pub mod listing;
pub mod logfile;
pub mod server;
pub mod session;

pub use dataset::Dataset;
pub use libref::{Libref, MemberInfo};
pub use listing::{ListingFile, ListingPage};
pub use logfile::{LogFile, LogLine};
pub use server::{WpsServer, BOOTSTRAP_IDENTITY};
pub use session::Session;

use wrmi_orb::{OrbError, Reply, Result};

/// Read a required object identity out of a reply.
pub(crate) fn expect_identity(reply: &mut Reply, operation: &str) -> Result<String> {
    reply.read_object_identity()?.ok_or_else(|| {
        OrbError::Protocol(format!("{operation} returned a null object reference"))
    })
}
