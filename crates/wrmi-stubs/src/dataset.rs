use wrmi_orb::{Orb, RemoteHandle, Result};

/// An open dataset. Exposes metadata only; bulk rows move through the
/// compiler's own import/export commands.
#[derive(Clone, Debug)]
pub struct Dataset {
    handle: RemoteHandle,
}

impl Dataset {
    pub fn from_identity(orb: &Orb, identity: impl Into<String>) -> Self {
        Self {
            handle: RemoteHandle::new(orb, identity),
        }
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    /// Close the dataset on the compiler side.
    pub fn close(&self) -> Result<()> {
        let buf = self.handle.request("close")?;
        self.handle.invoke(buf)?;
        Ok(())
    }

    /// Number of observations (rows).
    pub fn nobs(&self) -> Result<i64> {
        let buf = self.handle.request("getNobs")?;
        let mut reply = self.handle.invoke(buf)?;
        let nobs = reply.read_i64()?;
        Ok(nobs)
    }

    /// Number of variables (columns).
    pub fn nvars(&self) -> Result<i32> {
        let buf = self.handle.request("getNvars")?;
        let mut reply = self.handle.invoke(buf)?;
        let nvars = reply.read_i32()?;
        Ok(nvars)
    }
}
