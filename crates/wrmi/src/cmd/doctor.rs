use std::path::Path;

use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        compiler_on_path_check(&args.program),
        temp_dir_writable_check(),
        fifo_support_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        schema_id: "https://schemas.wrmi.dev/cli/v1/doctor-report.schema.json",
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn compiler_on_path_check(program: &Path) -> CheckResult {
    let found = if program.is_absolute() {
        program.is_file()
    } else {
        std::env::var_os("PATH")
            .map(|path| {
                std::env::split_paths(&path).any(|dir| dir.join(program).is_file())
            })
            .unwrap_or(false)
    };

    CheckResult {
        name: "compiler_on_path".to_string(),
        status: if found {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        },
        detail: if found {
            format!("{} found", program.display())
        } else {
            format!("{} not found on PATH", program.display())
        },
    }
}

fn temp_dir_writable_check() -> CheckResult {
    let dir = std::env::temp_dir();
    let probe = dir.join(format!("wrmi-doctor-{}", std::process::id()));
    let status = match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            CheckStatus::Pass
        }
        Err(_) => CheckStatus::Fail,
    };
    CheckResult {
        name: "temp_dir_writable".to_string(),
        status,
        detail: dir.display().to_string(),
    }
}

fn fifo_support_check() -> CheckResult {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        use std::process::Command;

        let probe = std::path::PathBuf::from(format!(
            "/tmp/wrmi-doctor-fifo-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        ));
        let made = Command::new("mkfifo")
            .arg(&probe)
            .status()
            .map(|s| s.success())
            .unwrap_or(false);
        let is_fifo = made
            && std::fs::metadata(&probe)
                .map(|m| m.file_type().is_fifo())
                .unwrap_or(false);
        let _ = std::fs::remove_file(&probe);

        CheckResult {
            name: "fifo_support".to_string(),
            status: if is_fifo {
                CheckStatus::Pass
            } else {
                CheckStatus::Warn
            },
            detail: if is_fifo {
                "named pipes available".to_string()
            } else {
                "could not create a test FIFO".to_string()
            },
        }
    }

    #[cfg(not(unix))]
    CheckResult {
        name: "fifo_support".to_string(),
        status: CheckStatus::Fail,
        detail: "named pipes are only supported on Unix platforms".to_string(),
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => {
            println!("wrmi doctor\n");
            for c in &output.checks {
                println!("  [{:?}] {}: {}", c.status, c.name, c.detail);
            }
            println!("\noverall: {}", output.overall);
        }
    }
}
