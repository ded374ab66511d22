use std::io::Read;

use tracing::info;
use wrmi_orb::{launch, LaunchConfig};
use wrmi_stubs::WpsServer;

use crate::cmd::{parse_options, parse_timeout, SubmitArgs};
use crate::exit::{io_error, orb_error, CliError, CliResult, FAILURE, SUCCESS, USAGE};
use crate::output::{print_log, OutputFormat};

pub fn run(args: SubmitArgs, format: OutputFormat) -> CliResult<i32> {
    let code = read_program(&args)?;
    let options = parse_options(&args.options)?;
    let startup_timeout = parse_timeout(&args.startup_timeout)?;

    let config = LaunchConfig {
        program: args.program.clone(),
        options: options.clone(),
        startup_timeout,
        ..LaunchConfig::default()
    };
    let orb = launch(&config).map_err(|e| orb_error("failed to start compiler", e))?;

    let result = submit_and_collect(&orb, &code, &options, format);
    // Always attempt a clean shutdown, even after a failed submit.
    if let Err(err) = orb.shutdown() {
        info!(%err, "shutdown after submit failed");
    }
    result
}

fn submit_and_collect(
    orb: &wrmi_orb::Orb,
    code: &str,
    options: &[(String, String)],
    format: OutputFormat,
) -> CliResult<i32> {
    let server = WpsServer::bootstrap(orb);
    let session = server
        .create_session()
        .map_err(|e| orb_error("createSession failed", e))?;

    if options.is_empty() {
        session.init().map_err(|e| orb_error("init failed", e))?;
    } else {
        session
            .init_with_options(options)
            .map_err(|e| orb_error("init failed", e))?;
    }

    let rc = session
        .submit_text(code)
        .map_err(|e| orb_error("submit failed", e))?;
    info!(rc, "program submitted");

    let log = session
        .open_log()
        .map_err(|e| orb_error("openLog failed", e))?;
    let lines = log
        .all_lines()
        .map_err(|e| orb_error("log retrieval failed", e))?;

    print_log(rc, &lines, format);
    Ok(if rc == 0 { SUCCESS } else { FAILURE })
}

fn read_program(args: &SubmitArgs) -> CliResult<String> {
    match (&args.file, &args.code) {
        (Some(path), None) => {
            std::fs::read_to_string(path).map_err(|e| io_error("failed to read program", e))
        }
        (None, Some(code)) => Ok(code.clone()),
        (None, None) => {
            // No file and no inline code: read the program from stdin.
            let mut code = String::new();
            std::io::stdin()
                .read_to_string(&mut code)
                .map_err(|e| io_error("failed to read stdin", e))?;
            if code.trim().is_empty() {
                return Err(CliError::new(USAGE, "no program text supplied"));
            }
            Ok(code)
        }
        (Some(_), Some(_)) => Err(CliError::new(USAGE, "give either a file or --code, not both")),
    }
}
