//! Client for the wpslinks statistical compiler over the WRMI protocol.
//!
//! The compiler runs as a co-located child process; frames travel over a
//! pair of named pipes. This crate re-exports the whole client stack:
//!
//! - [`cdr`] — CDR buffer and frame headers
//! - [`transport`] — pipe-pair byte channel and process capability
//! - [`orb`] — the object request broker
//! - [`stubs`] — typed remote objects (server, session, libref, dataset,
//!   log, listing)

/// Re-export CDR types.
pub mod cdr {
    pub use wrmi_cdr::*;
}

/// Re-export transport types.
pub mod transport {
    pub use wrmi_transport::*;
}

/// Re-export ORB types.
pub mod orb {
    pub use wrmi_orb::*;
}

/// Re-export stub types.
pub mod stubs {
    pub use wrmi_stubs::*;
}
