use wrmi_orb::{Orb, RemoteHandle, Result};

use crate::expect_identity;
use crate::libref::Libref;
use crate::listing::ListingFile;
use crate::logfile::LogFile;

/// One compiler session: program submission, macro variables, librefs and
/// the session's log and listing files.
#[derive(Clone, Debug)]
pub struct Session {
    handle: RemoteHandle,
}

impl Session {
    pub fn from_identity(orb: &Orb, identity: impl Into<String>) -> Self {
        Self {
            handle: RemoteHandle::new(orb, identity),
        }
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    /// Initialise the session with default options.
    pub fn init(&self) -> Result<()> {
        let buf = self.handle.request("init")?;
        self.handle.invoke(buf)?;
        Ok(())
    }

    /// Initialise the session with name/value option pairs.
    pub fn init_with_options(&self, options: &[(String, String)]) -> Result<()> {
        let mut buf = self.handle.request("initWithOptions")?;
        buf.write_i32(options.len() as i32);
        for (name, value) in options {
            buf.write_string(name);
            buf.write_string(value);
        }
        self.handle.invoke(buf)?;
        Ok(())
    }

    /// Submit program text for execution; returns the compiler's return code.
    pub fn submit_text(&self, code: &str) -> Result<i32> {
        let mut buf = self.handle.request("submitText")?;
        buf.write_string(code);
        let mut reply = self.handle.invoke(buf)?;
        let rc = reply.read_i32()?;
        Ok(rc)
    }

    /// Submit program lines, joined with newlines.
    pub fn submit_lines<S: AsRef<str>>(&self, lines: &[S]) -> Result<i32> {
        let code = lines
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        self.submit_text(&code)
    }

    /// Look up an existing libref by name. `None` when it is not assigned.
    pub fn libref(&self, name: &str) -> Result<Option<Libref>> {
        let mut buf = self.handle.request("getLibref")?;
        buf.write_string(name);
        let mut reply = self.handle.invoke(buf)?;
        let identity = reply.read_object_identity()?;
        Ok(identity.map(|id| Libref::from_identity(self.handle.orb(), id)))
    }

    /// Assign a libref to a directory path with an explicit engine.
    pub fn assign_libref(&self, name: &str, path: &str, engine: &str) -> Result<Libref> {
        let mut buf = self.handle.request("assignLibref")?;
        buf.write_string(name);
        buf.write_string(path);
        buf.write_string(engine);
        let mut reply = self.handle.invoke(buf)?;
        let identity = expect_identity(&mut reply, "assignLibref")?;
        Ok(Libref::from_identity(self.handle.orb(), identity))
    }

    /// Read a macro variable's value.
    pub fn macro_variable(&self, name: &str) -> Result<String> {
        let mut buf = self.handle.request("getMacroVariable")?;
        buf.write_string(name);
        let mut reply = self.handle.invoke(buf)?;
        let value = reply.read_string()?;
        Ok(value)
    }

    /// Set a macro variable.
    pub fn set_macro_variable(&self, name: &str, value: &str) -> Result<()> {
        let mut buf = self.handle.request("setMacroVariable")?;
        buf.write_string(name);
        buf.write_string(value);
        self.handle.invoke(buf)?;
        Ok(())
    }

    /// Open the session log.
    pub fn open_log(&self) -> Result<LogFile> {
        let buf = self.handle.request("openLog")?;
        let mut reply = self.handle.invoke(buf)?;
        let identity = expect_identity(&mut reply, "openLog")?;
        Ok(LogFile::from_identity(self.handle.orb(), identity))
    }

    /// Open the session listing.
    pub fn open_listing(&self) -> Result<ListingFile> {
        let buf = self.handle.request("openListing")?;
        let mut reply = self.handle.invoke(buf)?;
        let identity = expect_identity(&mut reply, "openListing")?;
        Ok(ListingFile::from_identity(self.handle.orb(), identity))
    }

    /// Discard accumulated listing output.
    pub fn clear_listing_file(&self) -> Result<()> {
        let buf = self.handle.request("clearListingFile")?;
        self.handle.invoke(buf)?;
        Ok(())
    }
}
