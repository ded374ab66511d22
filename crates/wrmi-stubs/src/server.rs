use wrmi_orb::{Orb, RemoteHandle, Result};

use crate::expect_identity;
use crate::session::Session;

/// Identity of the root server object, assigned by the compiler itself.
pub const BOOTSTRAP_IDENTITY: &str = "wpsserver";

/// The root compiler server: the only object with a well-known identity.
#[derive(Clone, Debug)]
pub struct WpsServer {
    handle: RemoteHandle,
}

impl WpsServer {
    /// The bootstrap server reachable on any freshly connected ORB.
    pub fn bootstrap(orb: &Orb) -> Self {
        Self::from_identity(orb, BOOTSTRAP_IDENTITY)
    }

    pub fn from_identity(orb: &Orb, identity: impl Into<String>) -> Self {
        Self {
            handle: RemoteHandle::new(orb, identity),
        }
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    /// Create a new compiler session.
    pub fn create_session(&self) -> Result<Session> {
        let buf = self.handle.request("createSession")?;
        let mut reply = self.handle.invoke(buf)?;
        let identity = expect_identity(&mut reply, "createSession")?;
        Ok(Session::from_identity(self.handle.orb(), identity))
    }

    /// Ask the server to stop. Oneway: no reply is expected.
    pub fn shutdown(&self) -> Result<()> {
        let buf = self.handle.request("shutdown")?;
        self.handle.invoke_oneway(buf)
    }

    /// DNS name of the host the compiler runs on.
    pub fn dns_name(&self) -> Result<String> {
        self.string_query("getDnsName")
    }

    /// Operating system name reported by the compiler.
    pub fn os_name(&self) -> Result<String> {
        self.string_query("getOSName")
    }

    fn string_query(&self, operation: &str) -> Result<String> {
        let buf = self.handle.request(operation)?;
        let mut reply = self.handle.invoke(buf)?;
        let value = reply.read_string()?;
        Ok(value)
    }
}
