use wrmi_orb::{Orb, RemoteHandle, Result};

/// One page of listing output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub geometry_index: i64,
    pub lines: Vec<String>,
}

/// The session's listing (procedure output) file.
#[derive(Clone, Debug)]
pub struct ListingFile {
    handle: RemoteHandle,
}

impl ListingFile {
    pub fn from_identity(orb: &Orb, identity: impl Into<String>) -> Self {
        Self {
            handle: RemoteHandle::new(orb, identity),
        }
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    /// Total number of listing pages.
    pub fn page_count(&self) -> Result<i64> {
        let buf = self.handle.request("getPageCount")?;
        let mut reply = self.handle.invoke(buf)?;
        let count = reply.read_i64()?;
        Ok(count)
    }

    /// Fetch one page. `None` when the page does not exist.
    pub fn page(&self, page_number: i64) -> Result<Option<ListingPage>> {
        let mut buf = self.handle.request("getPage")?;
        buf.write_i64(page_number);
        let mut reply = self.handle.invoke(buf)?;

        if !reply.read_bool()? {
            return Ok(None);
        }
        let geometry_index = reply.read_i64()?;
        let line_count = reply.read_i32()?;
        let mut lines = Vec::with_capacity(line_count.max(0) as usize);
        for _ in 0..line_count {
            lines.push(reply.read_string()?);
        }
        Ok(Some(ListingPage {
            geometry_index,
            lines,
        }))
    }
}
