use std::fs::{File, OpenOptions};
use std::path::Path;

use tracing::debug;

use crate::channel::StreamChannel;
use crate::error::{Result, TransportError};

/// Duplex channel over the two peer-created named pipes.
pub type PipeChannel = StreamChannel<File, File>;

/// Open the pipe pair announced by the compiler.
///
/// `send_path` is the pipe the peer reads from (our outbound frames),
/// `recv_path` the pipe the peer writes to (our inbound frames). Both are
/// opened read/write in binary mode so neither open blocks waiting for the
/// other end.
pub fn open_pipe_pair(send_path: impl AsRef<Path>, recv_path: impl AsRef<Path>) -> Result<PipeChannel> {
    let tx = open_pipe(send_path.as_ref())?;
    let rx = open_pipe(recv_path.as_ref())?;
    debug!(send = ?send_path.as_ref(), recv = ?recv_path.as_ref(), "pipe pair open");
    Ok(StreamChannel::new(rx, tx))
}

fn open_pipe(path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::process::Command;

    use wrmi_cdr::CdrBuffer;

    use super::*;
    use crate::channel::ByteChannel;

    fn make_fifo_dir(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!(
            "/tmp/wrmi-pipes-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        dir
    }

    fn mkfifo(path: &Path) {
        let status = Command::new("mkfifo")
            .arg(path)
            .status()
            .expect("mkfifo should run");
        assert!(status.success(), "mkfifo failed for {path:?}");
    }

    #[test]
    #[cfg(unix)]
    fn open_missing_pipe_fails() {
        let dir = make_fifo_dir("missing");
        let err = open_pipe_pair(dir.join("a.pipe"), dir.join("b.pipe")).unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_fifos() {
        let dir = make_fifo_dir("roundtrip");
        let to_peer = dir.join("to-peer.pipe");
        let from_peer = dir.join("from-peer.pipe");
        mkfifo(&to_peer);
        mkfifo(&from_peer);

        let mut channel = open_pipe_pair(&to_peer, &from_peer).expect("pipes should open");

        // Loop our own frames back: what the peer would read, it echoes.
        let peer_rx = open_pipe(&to_peer).unwrap();
        let peer_tx = open_pipe(&from_peer).unwrap();
        let mut peer = StreamChannel::new(peer_rx, peer_tx);

        let mut out = CdrBuffer::new();
        out.write_string("over-the-pipe");
        out.flip();
        let frame_len = out.remaining();
        channel.send(&out).unwrap();

        let mut staged = CdrBuffer::with_capacity(64);
        staged.set_limit(frame_len).unwrap();
        peer.recv(&mut staged).unwrap();
        staged.flip();
        peer.send(&staged).unwrap();

        let mut incoming = CdrBuffer::with_capacity(64);
        incoming.set_limit(frame_len).unwrap();
        channel.recv(&mut incoming).unwrap();
        incoming.flip();
        assert_eq!(incoming.read_string().unwrap(), "over-the-pipe");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
