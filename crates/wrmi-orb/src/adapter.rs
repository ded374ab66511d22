use std::collections::HashMap;
use std::rc::Rc;

use uuid::Uuid;
use wrmi_cdr::{CdrBuffer, ReplyStatus};

/// Errors raised by object adapter registry operations.
///
/// These surface to the caller without killing the ORB. When one is hit
/// while dispatching an inbound request, it is reported to the peer as a
/// system exception carrying the variant's type id.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("identity '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("object '{0}' does not exist")]
    ObjectNotExist(String),

    #[error("operation '{operation}' is not supported by '{identity}'")]
    BadOperation { identity: String, operation: String },

    #[error("servant '{0}' is not active")]
    ServantNotActive(String),

    #[error("adapter error: {0}")]
    Unknown(String),
}

impl AdapterError {
    /// The type-id string written into a system-exception reply.
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered(_) => "AlreadyRegisteredError",
            Self::ObjectNotExist(_) => "ObjectNotExistError",
            Self::BadOperation { .. } => "BadOperationError",
            Self::ServantNotActive(_) => "ServantNotActiveError",
            Self::Unknown(_) => "UnknownError",
        }
    }
}

/// A fault raised by a servant dispatcher, reported to the peer as a
/// SYSTEM_EXCEPTION reply.
#[derive(Debug, Clone)]
pub struct SystemFault {
    pub type_id: String,
    pub message: String,
}

impl SystemFault {
    pub fn new(type_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            message: message.into(),
        }
    }
}

/// A locally hosted object servicing inbound operations.
///
/// The dispatcher reads arguments from `request` (positioned past the
/// request header) and writes results into `reply` (positioned past the
/// reserved reply headers). Returning `Ok(UserException)` means the
/// dispatcher wrote a user-exception payload itself; an `Err` fault is
/// converted into a system-exception reply by the adapter.
///
/// Servants are invoked re-entrantly while the client awaits its own reply,
/// so they must not assume exclusive use of the ORB.
pub trait Servant {
    fn dispatch(
        &self,
        operation: &str,
        request: &mut CdrBuffer,
        reply: &mut CdrBuffer,
    ) -> Result<ReplyStatus, SystemFault>;
}

/// Registry of local servants by identity.
#[derive(Default)]
pub struct ObjectAdapter {
    servants: HashMap<String, Rc<dyn Servant>>,
}

impl ObjectAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a servant under a caller-supplied identity.
    pub fn add(&mut self, servant: Rc<dyn Servant>, identity: &str) -> Result<(), AdapterError> {
        if self.servants.contains_key(identity) {
            return Err(AdapterError::AlreadyRegistered(identity.to_string()));
        }
        self.servants.insert(identity.to_string(), servant);
        Ok(())
    }

    /// Register a servant under a freshly generated identity.
    pub fn add_with_uuid(&mut self, servant: Rc<dyn Servant>) -> String {
        loop {
            let identity = Uuid::new_v4().to_string();
            if self.add(servant.clone(), &identity).is_ok() {
                return identity;
            }
        }
    }

    pub fn remove(&mut self, identity: &str) -> Result<(), AdapterError> {
        self.servants
            .remove(identity)
            .map(|_| ())
            .ok_or_else(|| AdapterError::ObjectNotExist(identity.to_string()))
    }

    pub fn id_to_servant(&self, identity: &str) -> Result<Rc<dyn Servant>, AdapterError> {
        self.servants
            .get(identity)
            .cloned()
            .ok_or_else(|| AdapterError::ObjectNotExist(identity.to_string()))
    }

    pub fn len(&self) -> usize {
        self.servants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servants.is_empty()
    }

    /// Look up and invoke a servant for an inbound request.
    pub fn dispatch(
        &self,
        identity: &str,
        operation: &str,
        request: &mut CdrBuffer,
        reply: &mut CdrBuffer,
    ) -> Result<ReplyStatus, AdapterError> {
        let servant = self.id_to_servant(identity)?;
        Ok(invoke_servant(servant.as_ref(), operation, request, reply))
    }
}

/// Invoke a dispatcher and fold servant faults into a system-exception
/// reply body. Partial results written before the fault are discarded.
pub fn invoke_servant(
    servant: &dyn Servant,
    operation: &str,
    request: &mut CdrBuffer,
    reply: &mut CdrBuffer,
) -> ReplyStatus {
    let reply_start = reply.position();
    match servant.dispatch(operation, request, reply) {
        Ok(status) => status,
        Err(fault) => {
            let _ = reply.set_position(reply_start);
            reply.write_string(&fault.type_id);
            if !fault.message.is_empty() {
                reply.write_string(&fault.message);
            }
            ReplyStatus::SystemException
        }
    }
}
