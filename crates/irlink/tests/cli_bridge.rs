#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, UdpSocket};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn free_udp_addr() -> SocketAddr {
    let probe = UdpSocket::bind("127.0.0.1:0").expect("probe socket should bind");
    probe.local_addr().expect("probe socket should have an address")
}

fn irlink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_irlink"));
    cmd.arg("--log-level").arg("error");
    cmd
}

#[test]
fn udp_bridge_relays_both_directions() {
    let peer = UdpSocket::bind("127.0.0.1:0").expect("peer socket should bind");
    peer.set_read_timeout(Some(Duration::from_secs(5))).expect("read timeout should apply");
    let peer_addr = peer.local_addr().expect("peer address");
    let bridge_addr = free_udp_addr();

    let mut child = irlink()
        .arg("--format")
        .arg("json")
        .arg("bridge")
        .arg("udp")
        .arg("--local")
        .arg(bridge_addr.to_string())
        .arg("--remote")
        .arg(peer_addr.to_string())
        .arg("--count")
        .arg("1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("bridge should start");

    // Emulation side → peer.
    let mut stdin = child.stdin.take().expect("stdin should be piped");
    writeln!(stdin, "de ad be ef").expect("stdin should accept a line");
    stdin.flush().expect("stdin should flush");

    let mut buf = [0u8; 512];
    let (len, from) = peer.recv_from(&mut buf).expect("peer should get the packet");
    assert_eq!(&buf[..len], &[0xde, 0xad, 0xbe, 0xef]);
    assert_eq!(from, bridge_addr);

    // Peer → emulation side, split across two datagrams.
    peer.send_to(&[0x01, 0x02], bridge_addr).expect("first fragment should send");
    peer.send_to(&[0x03], bridge_addr).expect("second fragment should send");

    let stdout = child.stdout.take().expect("stdout should be piped");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let lines: Vec<String> = BufReader::new(stdout).lines().map_while(Result::ok).collect();
        let _ = tx.send(lines);
    });

    let status = child.wait().expect("bridge should exit");
    assert!(status.success(), "bridge exited with {status}");

    let lines = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("stdout should be collected");
    let packet: serde_json::Value =
        serde_json::from_str(&lines[0]).expect("first line should be packet JSON");
    assert_eq!(packet["event"], "packet");
    assert_eq!(packet["hex"], "010203");
    assert_eq!(packet["len"], 3);

    let stats: serde_json::Value =
        serde_json::from_str(lines.last().expect("stats line")).expect("stats should be JSON");
    assert_eq!(stats["event"], "stats");
    assert_eq!(stats["packets_sent"], 1);
    assert_eq!(stats["packets_received"], 1);
}

#[test]
fn version_prints_package_version() {
    let output = irlink().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("irlink {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_lists_features() {
    let output = irlink()
        .arg("version")
        .arg("--extended")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("max_packet_len: 255"));
    assert!(stdout.contains("features: serial="));
}

#[test]
fn invalid_timing_returns_usage() {
    let output = irlink()
        .arg("bridge")
        .arg("udp")
        .arg("--local")
        .arg("127.0.0.1:0")
        .arg("--remote")
        .arg("127.0.0.1:9")
        .arg("--silence-timeout")
        .arg("1ms")
        .arg("--read-timeout")
        .arg("5ms")
        .stdin(Stdio::null())
        .output()
        .expect("bridge should run");

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("read timeout"), "stderr: {stderr}");
}

#[test]
fn unknown_subcommand_fails() {
    let output = irlink().arg("beam").output().expect("irlink should run");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn occupied_local_port_returns_transport_error() {
    let taken = UdpSocket::bind("127.0.0.1:0").expect("socket should bind");
    let addr = taken.local_addr().expect("bound address");

    let output = irlink()
        .arg("bridge")
        .arg("udp")
        .arg("--local")
        .arg(addr.to_string())
        .arg("--remote")
        .arg("127.0.0.1:9")
        .stdin(Stdio::null())
        .output()
        .expect("bridge should run");

    assert_eq!(output.status.code(), Some(3));
}
