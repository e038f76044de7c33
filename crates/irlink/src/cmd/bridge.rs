use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use irlink_frame::ByteBuffer;
use irlink_relay::{IrManager, RelayConfig};
use irlink_transport::UdpTransport;
use tracing::{debug, info, warn};

use crate::cmd::{Backend, BridgeArgs};
use crate::exit::{
    relay_error, CliError, CliResult, DATA_INVALID, INTERNAL, SUCCESS, TRANSPORT_ERROR, USAGE,
};
use crate::output::{print_packet, print_stats, OutputFormat};

// How often the emulation side checks its mailboxes.
const FRONT_POLL: Duration = Duration::from_millis(1);

pub fn run(args: BridgeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = RelayConfig {
        silence_timeout: parse_duration(&args.silence_timeout)?,
        poll_interval: parse_duration(&args.poll_interval)?,
        read_timeout: parse_duration(&args.read_timeout)?,
        ..RelayConfig::default()
    };
    let mut ir = IrManager::init(config).map_err(|err| relay_error("invalid timing", err))?;

    let state = match args.backend {
        Backend::Serial(ref serial) => setup_serial(&mut ir, serial.port.clone(), serial.baud)?,
        Backend::Udp(ref udp) => ir
            .setup(UdpTransport::new(udp.local, udp.remote))
            .map_err(|err| relay_error("setup failed", err))?,
    };
    if !state.is_connected() {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            "transport failed to connect (see log for details)",
        ));
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running))?;
    let lines = spawn_stdin_reader()?;

    let transport = ir.transport_name().unwrap_or("unknown");
    let code = pump(&ir, &lines, &running, &args, format);

    ir.deinit();
    print_stats(&ir.stats(), transport, format);
    code
}

#[cfg(feature = "serial")]
fn setup_serial(
    ir: &mut IrManager,
    port: String,
    baud: u32,
) -> CliResult<irlink_relay::ConnectionState> {
    let transport = irlink_transport::SerialTransport::with_baud_rate(port, baud);
    ir.setup(transport).map_err(|err| relay_error("setup failed", err))
}

#[cfg(not(feature = "serial"))]
fn setup_serial(
    _ir: &mut IrManager,
    _port: String,
    _baud: u32,
) -> CliResult<irlink_relay::ConnectionState> {
    Err(CliError::new(USAGE, "built without serial support"))
}

/// Act as the emulation thread: transmit stdin lines, print received
/// packets, until stopped.
fn pump(
    ir: &IrManager,
    lines: &Receiver<String>,
    running: &AtomicBool,
    args: &BridgeArgs,
    format: OutputFormat,
) -> CliResult<i32> {
    let transport = ir.transport_name().unwrap_or("unknown");
    let mut rx = ByteBuffer::new();
    let mut received = 0usize;
    let mut stdin_open = true;

    while running.load(Ordering::SeqCst) {
        while stdin_open {
            match lines.try_recv() {
                Ok(line) => transmit_line(ir, &line),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("stdin closed");
                    stdin_open = false;
                }
            }
        }

        if ir.rx_buffer(&mut rx, args.rx_limit) > 0 {
            print_packet(rx.as_slice(), transport, format);
            received = received.saturating_add(1);
            if args.count.is_some_and(|count| received >= count) {
                return Ok(SUCCESS);
            }
        }

        if !ir.is_connected() {
            return Err(CliError::new(TRANSPORT_ERROR, "transport lost"));
        }
        thread::sleep(FRONT_POLL);
    }

    info!(received, "interrupted");
    Ok(SUCCESS)
}

fn transmit_line(ir: &IrManager, line: &str) {
    let bytes = match parse_hex(line) {
        Ok(bytes) if bytes.is_empty() => return,
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "skipping stdin line");
            return;
        }
    };
    match ir.tx_bytes(&bytes) {
        Ok(()) => debug!(len = bytes.len(), "packet queued"),
        Err(err) => warn!(error = %err, "skipping stdin line"),
    }
}

fn spawn_stdin_reader() -> CliResult<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("irlink-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .map_err(|err| CliError::new(INTERNAL, format!("stdin reader failed to start: {err}")))?;
    Ok(rx)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Parse a line of hex bytes. Whitespace between digits is ignored, so
/// `0a0b` and `0a 0b` are the same packet.
fn parse_hex(line: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("odd number of hex digits: {}", line.trim()),
        ));
    }

    digits
        .chunks(2)
        .map(|pair| match (hex_value(pair[0]), hex_value(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(CliError::new(
                DATA_INVALID,
                format!("invalid hex byte in: {}", line.trim()),
            )),
        })
        .collect()
}

fn hex_value(digit: u8) -> Option<u8> {
    (digit as char).to_digit(16).map(|v| v as u8)
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix("us") {
        (num, "us")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "us" => Ok(Duration::from_micros(value)),
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
