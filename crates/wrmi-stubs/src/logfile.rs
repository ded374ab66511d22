use wrmi_orb::{Orb, RemoteHandle, Result};

/// One log line: the compiler tags each with a line kind (source, note,
/// warning, error...) and a carriage-control byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub kind: u8,
    pub carriage_control: u8,
    pub text: String,
}

/// The session's log file.
#[derive(Clone, Debug)]
pub struct LogFile {
    handle: RemoteHandle,
}

impl LogFile {
    pub fn from_identity(orb: &Orb, identity: impl Into<String>) -> Self {
        Self {
            handle: RemoteHandle::new(orb, identity),
        }
    }

    pub fn identity(&self) -> &str {
        self.handle.identity()
    }

    /// Total number of log lines.
    pub fn line_count(&self) -> Result<i64> {
        let buf = self.handle.request("getLineCount")?;
        let mut reply = self.handle.invoke(buf)?;
        let count = reply.read_i64()?;
        Ok(count)
    }

    /// Fetch up to `max` lines starting at `first` (zero-based). Returns the
    /// compiler's result code alongside the decoded lines.
    pub fn lines(&self, first: i64, max: i32) -> Result<(i32, Vec<LogLine>)> {
        let mut buf = self.handle.request("getLines")?;
        buf.write_i64(first);
        buf.write_i32(max);
        let mut reply = self.handle.invoke(buf)?;

        let rc = reply.read_i32()?;
        let count = reply.read_i32()?;
        let mut lines = Vec::with_capacity(count.max(0) as usize);
        for _ in 0..count {
            lines.push(LogLine {
                kind: reply.read_u8()?,
                carriage_control: reply.read_u8()?,
                text: reply.read_string()?,
            });
        }
        Ok((rc, lines))
    }

    /// Fetch the whole log in one pass.
    pub fn all_lines(&self) -> Result<Vec<LogLine>> {
        let total = self.line_count()?;
        let mut lines = Vec::new();
        let mut first = 0i64;
        while first < total {
            let chunk = (total - first).min(i32::MAX as i64) as i32;
            let (_rc, mut batch) = self.lines(first, chunk)?;
            if batch.is_empty() {
                break;
            }
            first += batch.len() as i64;
            lines.append(&mut batch);
        }
        Ok(lines)
    }
}
