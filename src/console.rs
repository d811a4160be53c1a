//! Line console that plays the remote peer on host builds.
//!
//! Each command is turned into the same attribute read, write or
//! subscription a BLE peer would issue.
//!
//! # Commands
//!
//! - `scan` - Write the start command to the scanning mode value
//! - `connect` / `disconnect` - Write the connection state value
//! - `params <ssid> <open|wpa> [passphrase]` - Write the AP parameters
//! - `status` - Read every value
//! - `subscribe <on|off>` - Toggle notifications
//! - `help`, `quit`
//!
//! # Example Session
//!
//! ```text
//! > params Home wpa secret123
//! AP parameters written (99 bytes)
//! > subscribe on
//! Notifications on
//! > connect
//! Connect requested
//! [notify] Connection State = connected
//! ```

use crate::bridge::Bridge;
use crate::error::BridgeError;
use crate::gatt::codec::{CMD_CONNECT, CMD_DISCONNECT, START_SCAN};
use crate::gatt::records::decode_ap_details;
use crate::gatt::{ApParameters, AttributeKind, ConnectionState, ScanMode, Security};
use std::fmt::Write;
use zeroize::Zeroizing;

/// Parsed console command.
pub enum PeerCommand {
    Scan,
    Connect,
    Disconnect,
    /// Write the AP parameters record.
    Params {
        ssid: String,
        security: Security,
        passphrase: Zeroizing<String>,
    },
    Status,
    /// Enable or disable notifications on both notifiable values.
    Subscribe(bool),
    Help,
    Quit,
    /// Unknown or invalid command, with the message to show.
    Unknown(String),
}

impl PeerCommand {
    /// Parse a command from an input line.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return PeerCommand::Unknown(String::new());
        }

        let mut parts = input.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim();

        match cmd.to_lowercase().as_str() {
            "scan" => PeerCommand::Scan,
            "connect" | "c" => PeerCommand::Connect,
            "disconnect" | "d" => PeerCommand::Disconnect,
            "params" | "p" => parse_params(args),
            "status" | "s" => PeerCommand::Status,
            "subscribe" | "sub" => match args.to_lowercase().as_str() {
                "on" => PeerCommand::Subscribe(true),
                "off" => PeerCommand::Subscribe(false),
                _ => PeerCommand::Unknown("Usage: subscribe <on|off>".to_string()),
            },
            "help" | "h" | "?" => PeerCommand::Help,
            "quit" | "exit" | "q" => PeerCommand::Quit,
            _ => PeerCommand::Unknown(format!(
                "Unknown command: {}. Type 'help' for commands.",
                cmd
            )),
        }
    }
}

fn parse_params(args: &str) -> PeerCommand {
    const USAGE: &str = "Usage: params <ssid> <open|wpa> [passphrase]";

    let mut parts = args.splitn(3, ' ');
    let ssid = parts.next().unwrap_or("");
    let security = match parts.next().map(str::to_lowercase).as_deref() {
        Some("open") => Security::Open,
        Some("wpa") => Security::Wpa,
        _ => return PeerCommand::Unknown(USAGE.to_string()),
    };
    if ssid.is_empty() {
        return PeerCommand::Unknown(USAGE.to_string());
    }

    PeerCommand::Params {
        ssid: ssid.to_string(),
        security,
        passphrase: Zeroizing::new(parts.next().unwrap_or("").trim().to_string()),
    }
}

/// Help text for available commands.
pub const HELP_TEXT: &str = r#"
Available commands:
  scan                               Start a WiFi scan
  params <ssid> <open|wpa> [pass]    Set the access point to join (SSID without spaces)
  connect                            Connect with the stored parameters
  disconnect                         Drop the current link
  status                             Show every attribute value
  subscribe <on|off>                 Toggle notifications
  help                               Show this help
  quit                               Exit

Shortcuts: p=params, c=connect, d=disconnect, s=status, h=help, q=quit
"#;

fn describe(result: Result<usize, BridgeError>, ok: &str) -> String {
    match result {
        Ok(_) => ok.to_string(),
        Err(e) => format!("Rejected: {} (ATT error {:#04x})", e, e.att_code()),
    }
}

/// Run `command` against `bridge` as the remote peer would.
///
/// Returns the text to print. `Quit` is left to the caller.
pub fn execute(bridge: &Bridge, command: PeerCommand) -> String {
    match command {
        PeerCommand::Scan => describe(
            bridge.write(AttributeKind::ScanMode, 0, &[START_SCAN]),
            "Scan started",
        ),
        PeerCommand::Connect => describe(
            bridge.write(AttributeKind::ConnectionState, 0, &[CMD_CONNECT]),
            "Connect requested",
        ),
        PeerCommand::Disconnect => describe(
            bridge.write(AttributeKind::ConnectionState, 0, &[CMD_DISCONNECT]),
            "Disconnect requested",
        ),
        PeerCommand::Params {
            ssid,
            security,
            passphrase,
        } => match ApParameters::new(ssid.as_bytes(), security, passphrase.as_bytes()) {
            Ok(params) => match bridge.write(AttributeKind::ApParameters, 0, params.as_bytes()) {
                Ok(n) => format!("AP parameters written ({} bytes)", n),
                Err(e) => describe(Err(e), ""),
            },
            Err(e) => format!("Invalid parameters: {}", e),
        },
        PeerCommand::Status => format_status(bridge),
        PeerCommand::Subscribe(enabled) => {
            bridge.set_subscribed(AttributeKind::ScanMode, enabled);
            bridge.set_subscribed(AttributeKind::ConnectionState, enabled);
            format!("Notifications {}", if enabled { "on" } else { "off" })
        }
        PeerCommand::Help => HELP_TEXT.to_string(),
        PeerCommand::Quit => String::new(),
        PeerCommand::Unknown(message) => message,
    }
}

fn read_byte(bridge: &Bridge, kind: AttributeKind) -> Option<u8> {
    bridge.read(kind, 0, 1).ok()?.first().copied()
}

/// Format every attribute value as read by a peer.
pub fn format_status(bridge: &Bridge) -> String {
    let mut out = String::new();

    let mode = read_byte(bridge, AttributeKind::ScanMode)
        .and_then(|b| ScanMode::from_byte(b).ok())
        .unwrap_or_default();
    let count = read_byte(bridge, AttributeKind::ApCount).unwrap_or(0);
    let _ = writeln!(out, "Scan: {} ({} access points)", mode, count);

    let details = bridge
        .read(AttributeKind::ApDetails, 0, AttributeKind::ApDetails.max_len())
        .ok()
        .and_then(|bytes| decode_ap_details(&bytes, count as usize).ok())
        .unwrap_or_default();
    for (i, detail) in details.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{}] {:<32} {:>4} dBm  {}",
            i, detail.ssid, detail.rssi, detail.security
        );
    }

    let state = read_byte(bridge, AttributeKind::ConnectionState)
        .and_then(|b| ConnectionState::from_byte(b).ok())
        .unwrap_or_default();
    let _ = writeln!(out, "Connection: {}", state);

    bridge.with_ap_parameters(|params| {
        let _ = writeln!(
            out,
            "AP parameters: ssid='{}' security={}",
            String::from_utf8_lossy(params.ssid()),
            match params.security() {
                Some(security) => security.to_string(),
                None => format!("invalid ({})", params.security_byte()),
            }
        );
    });
    out
}

/// Format a notification for display.
pub fn format_notification(kind: AttributeKind, value: &[u8]) -> String {
    let decoded = match (kind, value) {
        (AttributeKind::ScanMode, [b]) => ScanMode::from_byte(*b).map(|m| m.to_string()),
        (AttributeKind::ConnectionState, [b]) => {
            ConnectionState::from_byte(*b).map(|s| s.to_string())
        }
        _ => return format!("[notify] {} = {:02x?}", kind, value),
    };
    match decoded {
        Ok(text) => format!("[notify] {} = {}", kind, text),
        Err(_) => format!("[notify] {} = {:02x?}", kind, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CredentialStore, MemorySettings};
    use crate::test_support::{MockRadio, RecordingNotifier};
    use crate::wifi::NetEvent;
    use std::sync::Arc;

    fn bridge() -> (Arc<MockRadio>, Bridge) {
        let radio = MockRadio::new();
        let store = CredentialStore::new(Box::new(Arc::new(MemorySettings::new())));
        let bridge = Bridge::new(radio.clone(), store, RecordingNotifier::new()).unwrap();
        (radio, bridge)
    }

    #[test]
    fn test_parse_simple_commands() {
        assert!(matches!(PeerCommand::parse("scan"), PeerCommand::Scan));
        assert!(matches!(PeerCommand::parse("connect"), PeerCommand::Connect));
        assert!(matches!(PeerCommand::parse("c"), PeerCommand::Connect));
        assert!(matches!(PeerCommand::parse("Disconnect"), PeerCommand::Disconnect));
        assert!(matches!(PeerCommand::parse("status"), PeerCommand::Status));
        assert!(matches!(PeerCommand::parse("?"), PeerCommand::Help));
        assert!(matches!(PeerCommand::parse("quit"), PeerCommand::Quit));
    }

    #[test]
    fn test_parse_params() {
        match PeerCommand::parse("params Home wpa secret 123") {
            PeerCommand::Params {
                ssid,
                security,
                passphrase,
            } => {
                assert_eq!(ssid, "Home");
                assert_eq!(security, Security::Wpa);
                assert_eq!(passphrase.as_str(), "secret 123");
            }
            _ => panic!("Expected Params command"),
        }

        match PeerCommand::parse("p Cafe OPEN") {
            PeerCommand::Params {
                security,
                passphrase,
                ..
            } => {
                assert_eq!(security, Security::Open);
                assert!(passphrase.is_empty());
            }
            _ => panic!("Expected Params command"),
        }
    }

    #[test]
    fn test_parse_params_missing_args() {
        assert!(matches!(PeerCommand::parse("params"), PeerCommand::Unknown(_)));
        assert!(matches!(PeerCommand::parse("params Home"), PeerCommand::Unknown(_)));
        assert!(matches!(
            PeerCommand::parse("params Home wep key"),
            PeerCommand::Unknown(_)
        ));
    }

    #[test]
    fn test_parse_subscribe() {
        assert!(matches!(PeerCommand::parse("subscribe on"), PeerCommand::Subscribe(true)));
        assert!(matches!(PeerCommand::parse("sub OFF"), PeerCommand::Subscribe(false)));
        assert!(matches!(PeerCommand::parse("subscribe"), PeerCommand::Unknown(_)));
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert!(matches!(PeerCommand::parse("foo"), PeerCommand::Unknown(_)));
        assert!(matches!(PeerCommand::parse("   "), PeerCommand::Unknown(_)));
    }

    #[test]
    fn test_execute_scan_twice() {
        let (_radio, bridge) = bridge();
        assert_eq!(execute(&bridge, PeerCommand::Scan), "Scan started");
        let second = execute(&bridge, PeerCommand::Scan);
        assert!(second.starts_with("Rejected: scan already running"), "{}", second);
        assert!(second.contains("0xfe"), "{}", second);
    }

    #[test]
    fn test_execute_params_and_status() {
        let (radio, bridge) = bridge();
        let written = execute(&bridge, PeerCommand::parse("params Home wpa secret123"));
        assert_eq!(written, "AP parameters written (99 bytes)");
        assert_eq!(execute(&bridge, PeerCommand::Connect), "Connect requested");
        assert_eq!(radio.connect_count(), 1);

        radio.emit(NetEvent::ConnectResult { status: 0 });
        let status = format_status(&bridge);
        assert!(status.contains("Connection: connected"), "{}", status);
        assert!(status.contains("ssid='Home' security=wpa"), "{}", status);
    }

    #[test]
    fn test_execute_params_too_long() {
        let (_radio, bridge) = bridge();
        let ssid = "x".repeat(40);
        let out = execute(&bridge, PeerCommand::parse(&format!("params {} open", ssid)));
        assert!(out.starts_with("Invalid parameters"), "{}", out);
    }

    #[test]
    fn test_format_notification() {
        assert_eq!(
            format_notification(AttributeKind::ScanMode, &[2]),
            format!("[notify] {} = {}", AttributeKind::ScanMode, ScanMode::Done)
        );
        assert_eq!(
            format_notification(AttributeKind::ConnectionState, &[9]),
            format!("[notify] {} = [09]", AttributeKind::ConnectionState)
        );
    }
}
