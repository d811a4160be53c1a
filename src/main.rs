//! WiFi provisioning bridge.
//!
//! Runs on both ESP32 and host platforms:
//! - **Host**: `cargo run --bin winc-bridge`
//! - **ESP32**: `cargo espflash flash --bin winc-bridge --features esp32 --release`
//!
//! On ESP32 the bridge is served over BLE. On the host a simulated radio
//! stands in for the WiFi driver and the console plays the remote peer;
//! type `help` for commands.

use log::{error, info};
use std::sync::Arc;

// ESP32: Initialize ESP-IDF before anything else
#[cfg(feature = "esp32")]
fn platform_init() {
    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
    info!("ESP-IDF initialized");
}

// Host: Just initialize env_logger
#[cfg(not(feature = "esp32"))]
fn platform_init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(feature = "esp32")]
fn start() -> Result<(), Box<dyn std::error::Error>> {
    use esp32_nimble::BLEDevice;
    use esp_idf_hal::peripherals::Peripherals;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use winc_gatt_bridge::gatt::GattServer;
    use winc_gatt_bridge::storage::{NvsSettings, NAMESPACE};
    use winc_gatt_bridge::wifi::EspRadio;
    use winc_gatt_bridge::{Bridge, CredentialStore};

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let radio = Arc::new(EspRadio::new(peripherals.modem, sysloop, Some(nvs.clone()))?);
    let store = CredentialStore::new(Box::new(NvsSettings::new(nvs, NAMESPACE)?));

    let device = BLEDevice::take();
    let gatt = GattServer::register(device.get_server());
    let bridge = Arc::new(Bridge::new(radio, store, gatt.clone())?);
    gatt.attach(bridge);
    GattServer::start_advertising(device).map_err(|e| format!("advertising: {:?}", e))?;
    Ok(())
}

#[cfg(feature = "esp32")]
fn main() {
    platform_init();
    info!("=== WiFi bridge starting ===");

    if let Err(e) = start() {
        error!("Start-up failed: {}", e);
        return;
    }

    info!("Waiting for peer");
    loop {
        std::thread::sleep(std::time::Duration::from_secs(60));
    }
}

#[cfg(not(feature = "esp32"))]
mod host {
    use std::io::Write;
    use winc_gatt_bridge::console::format_notification;
    use winc_gatt_bridge::gatt::CodecError;
    use winc_gatt_bridge::wifi::DriverSecurity;
    use winc_gatt_bridge::{AttributeKind, AttributeNotifier, SimNetwork};

    /// Print a line to stdout (console output).
    pub fn print_line(msg: &str) {
        println!("{}", msg);
        let _ = std::io::stdout().flush();
    }

    /// Print the prompt.
    pub fn print_prompt() {
        print!("> ");
        let _ = std::io::stdout().flush();
    }

    /// Shows notifications the way a subscribed peer would see them.
    pub struct ConsoleNotifier;

    impl AttributeNotifier for ConsoleNotifier {
        fn notify(&self, kind: AttributeKind, value: &[u8]) {
            print_line(&format!("\n{}", format_notification(kind, value)));
            print_prompt();
        }
    }

    /// Networks visible to the simulated radio.
    pub fn networks() -> Result<Vec<SimNetwork>, CodecError> {
        Ok(vec![
            SimNetwork::new("Home", 6, -42, DriverSecurity::Psk)?.with_passphrase("secret123"),
            SimNetwork::new("Cafe", 1, -67, DriverSecurity::None)?,
            SimNetwork::new("Office", 36, -58, DriverSecurity::Sae)?,
            SimNetwork::new("Lab", 11, -80, DriverSecurity::Psk)?.with_passphrase("labpass1"),
        ])
    }
}

#[cfg(not(feature = "esp32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() {
    use host::{print_line, print_prompt, ConsoleNotifier};
    use std::io::BufRead;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use winc_gatt_bridge::console::{execute, PeerCommand};
    use winc_gatt_bridge::storage::{FileSettings, NAMESPACE};
    use winc_gatt_bridge::{Bridge, CredentialStore, SimulatedRadio};

    /// Delay before the simulated driver answers a request.
    const SIM_DELAY: Duration = Duration::from_millis(500);

    platform_init();
    info!("=== WiFi bridge starting (host) ===");

    let settings = match FileSettings::open_default(NAMESPACE) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Settings directory unavailable: {}", e);
            std::process::exit(1);
        }
    };
    info!("Settings directory: {:?}", settings.dir());

    let networks = match host::networks() {
        Ok(networks) => networks,
        Err(e) => {
            error!("Invalid simulated network: {}", e);
            std::process::exit(1);
        }
    };
    let (radio, driver) = SimulatedRadio::new(networks, SIM_DELAY);
    let bridge = match Bridge::new(
        radio,
        CredentialStore::new(Box::new(settings)),
        Arc::new(ConsoleNotifier),
    ) {
        Ok(bridge) => Arc::new(bridge),
        Err(e) => {
            error!("Bridge start-up failed: {}", e);
            std::process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let driver_task = tokio::spawn(driver.run(cancel.clone()));

    print_line("");
    print_line("=== WiFi Bridge Console ===");
    print_line("Type 'help' for commands");
    print_line("");
    print_prompt();

    let stdin_bridge = bridge.clone();
    let stdin_cancel = cancel.clone();
    let stdin_task = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if stdin_cancel.is_cancelled() {
                break;
            }
            match PeerCommand::parse(&line) {
                PeerCommand::Quit => break,
                command => {
                    let output = execute(&stdin_bridge, command);
                    if !output.is_empty() {
                        print_line(&output);
                    }
                }
            }
            print_prompt();
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            print_line("\nShutting down...");
        }
        result = stdin_task => {
            if let Err(e) = result {
                error!("Console task error: {}", e);
            }
        }
        result = driver_task => {
            if let Err(e) = result {
                error!("Radio task error: {}", e);
            }
        }
    }
    cancel.cancel();

    info!("Shutdown complete");
    // The console thread may still be blocked on stdin
    std::process::exit(0);
}
