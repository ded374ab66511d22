use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{debug, info};
use wrmi_transport::{open_pipe_pair, ChildProcess};

use crate::error::{OrbError, Result};
use crate::orb::{Orb, OrbConfig};

const READING_PREFIX: &str = "Reading from pipe ";
const WRITING_PREFIX: &str = "Writing to pipe ";

/// How to start the compiler process.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Compiler executable, resolved through PATH when relative.
    pub program: PathBuf,
    /// Session options appended as `-<name> <value>` pairs.
    pub options: Vec<(String, String)>,
    /// Bound on waiting for the pipe announcement.
    pub startup_timeout: Duration,
    /// ORB tunables for the resulting connection.
    pub orb: OrbConfig,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("wpslinks"),
            options: Vec::new(),
            startup_timeout: Duration::from_secs(30),
            orb: OrbConfig::default(),
        }
    }
}

/// Spawn the compiler, discover its pipe pair and connect an ORB over it.
///
/// The compiler is started with `-namedpipe` and announces, on stdout, the
/// pipe it reads from (our outbound path) and the pipe it writes to (our
/// inbound path), one per line in either order. Anything else on stdout is a
/// fatal startup error.
pub fn launch(config: &LaunchConfig) -> Result<Orb> {
    let mut command = Command::new(&config.program);
    command.arg("-namedpipe");
    for (name, value) in &config.options {
        command.arg(format!("-{name}")).arg(value);
    }
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(program = ?config.program, options = config.options.len(), "starting compiler");
    let mut child = command.spawn().map_err(|err| {
        OrbError::Startup(format!("failed to start {}: {err}", config.program.display()))
    })?;
    let stdout = match child.stdout.take() {
        Some(stdout) => stdout,
        None => {
            let _ = child.kill();
            return Err(OrbError::Startup("compiler stdout not captured".to_string()));
        }
    };

    // From here on the wrapper owns the child: any early return kills it.
    let process = ChildProcess::new(child);
    let (send_path, recv_path) =
        match parse_announcement(BufReader::new(stdout), config.startup_timeout) {
            Ok(paths) => paths,
            Err(err) => return Err(err),
        };
    info!(pid = process.id(), send = ?send_path, recv = ?recv_path, "compiler announced pipes");

    let channel = open_pipe_pair(&send_path, &recv_path)?;
    let process = process.with_pipe_paths(vec![send_path, recv_path]);
    Orb::connect(
        Box::new(channel),
        Some(Box::new(process)),
        config.orb.clone(),
    )
}

fn parse_announcement<R: BufRead>(
    reader: R,
    timeout: Duration,
) -> Result<(PathBuf, PathBuf)> {
    let deadline = Instant::now() + timeout;
    let mut send_path: Option<PathBuf> = None;
    let mut recv_path: Option<PathBuf> = None;

    for line in reader.lines() {
        let line = line.map_err(|err| {
            OrbError::Startup(format!("failed to read compiler announcement: {err}"))
        })?;
        if let Some(rest) = line.strip_prefix(READING_PREFIX) {
            send_path = Some(PathBuf::from(rest));
        } else if let Some(rest) = line.strip_prefix(WRITING_PREFIX) {
            recv_path = Some(PathBuf::from(rest));
        } else {
            return Err(OrbError::Startup(format!(
                "unexpected compiler output: {line}"
            )));
        }

        if let (Some(send), Some(recv)) = (send_path.as_ref(), recv_path.as_ref()) {
            return Ok((send.clone(), recv.clone()));
        }
        if Instant::now() >= deadline {
            break;
        }
    }

    Err(OrbError::Startup(
        "compiler exited before announcing both pipes".to_string(),
    ))
}
