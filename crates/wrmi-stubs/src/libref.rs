use wrmi_orb::{Orb, RemoteHandle, Result};

use crate::dataset::Dataset;
use crate::expect_identity;

/// A library member as reported by `getMemberInfos`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: String,
    pub member_type: String,
}

/// A library reference inside a session.
#[derive(Clone, Debug)]
pub struct Libref {
    handle: RemoteHandle,
}

impl Libref {
    pub fn from_identity(orb: &Orb, identity: impl Into<String>) -> Self {
        Self {
            handle: RemoteHandle::new(orb, identity),
        }
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    /// The libref's assigned name.
    pub fn name(&self) -> Result<String> {
        let buf = self.handle.request("getName")?;
        let mut reply = self.handle.invoke(buf)?;
        let name = reply.read_string()?;
        Ok(name)
    }

    /// Enumerate the library's members.
    pub fn member_infos(&self) -> Result<Vec<MemberInfo>> {
        let buf = self.handle.request("getMemberInfos")?;
        let mut reply = self.handle.invoke(buf)?;
        let count = reply.read_i32()?;
        let mut members = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            members.push(MemberInfo {
                name: reply.read_string()?,
                member_type: reply.read_string()?,
            });
        }
        Ok(members)
    }

    /// Open an existing dataset in the given mode.
    pub fn open_dataset(&self, name: &str, mode: &str) -> Result<Dataset> {
        let mut buf = self.handle.request("openDataset")?;
        buf.write_string(name);
        buf.write_string(mode);
        let mut reply = self.handle.invoke(buf)?;
        let identity = expect_identity(&mut reply, "openDataset")?;
        Ok(Dataset::from_identity(self.handle.orb(), identity))
    }

    /// Create a new dataset in this library.
    pub fn create_dataset(&self, name: &str) -> Result<Dataset> {
        let mut buf = self.handle.request("createDataset")?;
        buf.write_string(name);
        let mut reply = self.handle.invoke(buf)?;
        let identity = expect_identity(&mut reply, "createDataset")?;
        Ok(Dataset::from_identity(self.handle.orb(), identity))
    }
}
