use std::net::SocketAddr;

use clap::{Args, Subcommand};
use irlink_frame::CARTRIDGE_RX_LIMIT;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod bridge;
pub mod ports;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports an IR dongle could be attached to.
    Ports(PortsArgs),
    /// Relay packets between stdin/stdout and a real IR channel.
    Bridge(BridgeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Bridge(args) => bridge::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct BridgeArgs {
    #[command(subcommand)]
    pub backend: Backend,
    /// Exit after receiving N packets.
    #[arg(long, global = true)]
    pub count: Option<usize>,
    /// Longest packet handed to the emulation side; longer ones are truncated.
    #[arg(long, value_name = "BYTES", default_value_t = CARTRIDGE_RX_LIMIT, global = true)]
    pub rx_limit: usize,
    /// Silence that ends an inbound packet (e.g. 20ms, 1s).
    #[arg(long, default_value = "20ms", global = true)]
    pub silence_timeout: String,
    /// Pause between I/O loop ticks (e.g. 250us).
    #[arg(long, default_value = "250us", global = true)]
    pub poll_interval: String,
    /// Upper bound for one transport read (e.g. 1ms).
    #[arg(long, default_value = "1ms", global = true)]
    pub read_timeout: String,
}

#[derive(Subcommand, Debug)]
pub enum Backend {
    /// Serial port (USB IR dongle).
    Serial(SerialArgs),
    /// Point-to-point UDP with another bridge or emulator.
    Udp(UdpArgs),
}

#[derive(Args, Debug)]
pub struct SerialArgs {
    /// Serial port name (e.g. /dev/ttyUSB0, COM3).
    #[arg(env = "IRLINK_SERIAL_PORT")]
    pub port: String,
    /// Baud rate.
    #[arg(long, env = "IRLINK_BAUD_RATE", default_value_t = 115_200)]
    pub baud: u32,
}

#[derive(Args, Debug)]
pub struct UdpArgs {
    /// Local address to bind.
    #[arg(long, value_name = "ADDR")]
    pub local: SocketAddr,
    /// Peer address to exchange datagrams with.
    #[arg(long, value_name = "ADDR")]
    pub remote: SocketAddr,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
