use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use irlink_relay::StatsSnapshot;
use serde::Serialize;

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
struct PacketOutput<'a> {
    event: &'static str,
    transport: &'a str,
    len: usize,
    hex: String,
    timestamp: String,
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    event: &'static str,
    transport: &'a str,
    #[serde(flatten)]
    stats: &'a StatsSnapshot,
}

#[derive(Serialize)]
pub struct PortOutput {
    pub name: String,
    pub description: String,
}

pub fn print_packet(data: &[u8], transport: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = PacketOutput {
                event: "packet",
                transport,
                len: data.len(),
                hex: to_hex(data),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TRANSPORT", "SIZE", "DATA"])
                .add_row(vec![
                    transport.to_string(),
                    data.len().to_string(),
                    to_hex_spaced(data),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "rx transport={} size={} data={}",
                transport,
                data.len(),
                to_hex_spaced(data)
            );
        }
        OutputFormat::Raw => print_raw(data),
    }
}

pub fn print_stats(stats: &StatsSnapshot, transport: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatsOutput {
            event: "stats",
            transport,
            stats,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stats_rows(stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = stats_rows(stats)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("stats transport={} {}", transport, fields.join(" "));
        }
        // Raw output is packet bytes only; a summary would corrupt it.
        OutputFormat::Raw => {}
    }
}

pub fn print_ports(ports: &[PortOutput], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ports),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "DESCRIPTION"]);
            for port in ports {
                table.add_row(vec![port.name.clone(), port.description.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                println!("{} ({})", port.name, port.description);
            }
        }
        OutputFormat::Raw => {
            for port in ports {
                println!("{}", port.name);
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn stats_rows(stats: &StatsSnapshot) -> [(&'static str, u64); 9] {
    [
        ("packets_sent", stats.packets_sent),
        ("bytes_sent", stats.bytes_sent),
        ("packets_received", stats.packets_received),
        ("bytes_received", stats.bytes_received),
        ("overflows", stats.overflows),
        ("overwritten", stats.overwritten),
        ("truncated_bytes", stats.truncated_bytes),
        ("dropped_transmits", stats.dropped_transmits),
        ("transport_faults", stats.transport_faults),
    ]
}

pub fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

fn to_hex_spaced(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
