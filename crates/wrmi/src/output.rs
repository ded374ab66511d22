use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use wrmi_stubs::LogLine;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct LogLineOutput<'a> {
    kind: u8,
    carriage_control: u8,
    text: &'a str,
}

#[derive(Serialize)]
struct LogOutput<'a> {
    schema_id: &'a str,
    return_code: i32,
    lines: Vec<LogLineOutput<'a>>,
}

pub fn print_log(return_code: i32, lines: &[LogLine], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = LogOutput {
                schema_id: "https://schemas.wrmi.dev/cli/v1/submit-log.schema.json",
                return_code,
                lines: lines
                    .iter()
                    .map(|line| LogLineOutput {
                        kind: line.kind,
                        carriage_control: line.carriage_control,
                        text: &line.text,
                    })
                    .collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "CC", "TEXT"]);
            for line in lines {
                table.add_row(vec![
                    line.kind.to_string(),
                    line.carriage_control.to_string(),
                    line.text.clone(),
                ]);
            }
            println!("{table}");
            println!("return code: {return_code}");
        }
        OutputFormat::Pretty => {
            for line in lines {
                println!("[{}] {}", line.kind, line.text);
            }
            println!("return code: {return_code}");
        }
        OutputFormat::Raw => {
            let mut out = std::io::stdout();
            for line in lines {
                let _ = out.write_all(line.text.as_bytes());
                let _ = out.write_all(b"\n");
            }
            let _ = out.flush();
        }
    }
}
