use serde::Serialize;
use wrmi_cdr::{PROTOCOL_MAJOR, PROTOCOL_MINOR};
use wrmi_orb::{launch, LaunchConfig};
use wrmi_stubs::WpsServer;

use crate::cmd::{parse_timeout, InfoArgs};
use crate::exit::{orb_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct InfoOutput {
    schema_id: &'static str,
    dns_name: String,
    os_name: String,
    protocol_version: String,
    connected: bool,
}

pub fn run(args: InfoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = LaunchConfig {
        program: args.program.clone(),
        startup_timeout: parse_timeout(&args.startup_timeout)?,
        ..LaunchConfig::default()
    };
    let orb = launch(&config).map_err(|e| orb_error("failed to start compiler", e))?;

    let result = query_info(&orb);
    let _ = orb.shutdown();
    let out = result?;

    print_info(&out, format);
    Ok(SUCCESS)
}

fn query_info(orb: &wrmi_orb::Orb) -> CliResult<InfoOutput> {
    let server = WpsServer::bootstrap(orb);
    let dns_name = server
        .dns_name()
        .map_err(|e| orb_error("getDnsName failed", e))?;
    let os_name = server
        .os_name()
        .map_err(|e| orb_error("getOSName failed", e))?;

    Ok(InfoOutput {
        schema_id: "https://schemas.wrmi.dev/cli/v1/server-info.schema.json",
        dns_name,
        os_name,
        protocol_version: format!("{PROTOCOL_MAJOR}.{PROTOCOL_MINOR}"),
        connected: true,
    })
}

fn print_info(out: &InfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Compiler Info:");
            println!("  Host:     {}", out.dns_name);
            println!("  OS:       {}", out.os_name);
            println!("  Protocol: WRMI {}", out.protocol_version);
        }
        OutputFormat::Raw => {
            println!("{}", out.dns_name);
        }
    }
}
