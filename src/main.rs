//! Terminal control panel for the WSPR beacon.
//!
//! ```bash
//! # Pick the serial device once, it is remembered in ~/fxk_wspr.json
//! wspr-beacon ports
//! wspr-beacon device set /dev/ttyUSB0
//!
//! # Watch the beacon, keeping its clock in sync
//! wspr-beacon monitor
//!
//! # Transmit every 4 minutes on 20 m
//! wspr-beacon start --interval 4 --band 20
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};

use wspr_beacon_lib::commands;
use wspr_beacon_lib::config::SettingsStore;
use wspr_beacon_lib::device::{Poller, SessionState};
use wspr_beacon_lib::serial::protocol::ConfigForm;
use wspr_beacon_lib::serial::BeaconSession;

/// WSPR beacon control panel
#[derive(Parser)]
#[command(name = "wspr-beacon")]
#[command(version)]
#[command(about = "Control an Arduino WSPR beacon over its serial CAT link")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Serial device to use instead of the stored one
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Settings file (defaults to ~/fxk_wspr.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List available serial ports
    Ports,

    /// Show or change the stored serial device
    #[command(subcommand)]
    Device(DeviceCommands),

    #[command(flatten)]
    Beacon(BeaconCommands),

    /// Poll the beacon once a second and print its state
    Monitor,
}

/// Commands that need an open beacon link
#[derive(Subcommand)]
enum BeaconCommands {
    /// Show beacon status and hardware
    Status,

    /// Start transmitting
    Start {
        /// Minutes between transmissions (2, 4, 6 or 8)
        #[arg(short, long)]
        interval: u32,

        /// Band in meters
        #[arg(short, long)]
        band: u32,
    },

    /// Cancel transmission
    Stop,

    /// Key the transmitter for tuning
    Tune {
        /// Band in meters
        #[arg(short, long)]
        band: u32,
    },

    /// Set the beacon clock from this computer
    SyncTime,

    /// Read or write the station configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum DeviceCommands {
    Show,
    Set { path: String },
    Clear,
}

#[derive(Subcommand)]
enum ConfigCommands {
    Show,
    Set {
        #[arg(long)]
        call: String,

        #[arg(long)]
        locator: String,

        /// Transmit power in watts, e.g. 0.2
        #[arg(long)]
        power: String,

        /// Oscillator calibration offset
        #[arg(long, default_value = "0")]
        offset: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let store = match &cli.settings {
        Some(path) => SettingsStore::open(path),
        None => SettingsStore::open_default().context("Failed to locate settings file")?,
    };

    match cli.command {
        Commands::Ports => {
            for port in commands::list_ports()? {
                let details = [port.manufacturer, port.product]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                println!("{:<24} {:<20} {}", port.port_name, port.port_type, details);
            }
        }
        Commands::Device(DeviceCommands::Show) => {
            let device = commands::get_serial_device(&store)?;
            if device.is_empty() {
                println!("No serial device configured");
            } else {
                println!("{}", device);
            }
        }
        Commands::Device(DeviceCommands::Set { path }) => {
            let mut session = BeaconSession::serial();
            if commands::set_serial_device(&store, &mut session, &path)? {
                println!("Saved {} and connected", path);
            } else {
                println!("Saved {} but the beacon did not answer", path);
            }
        }
        Commands::Device(DeviceCommands::Clear) => {
            commands::clear_serial_device(&store)?;
            println!("Serial device cleared");
        }
        Commands::Monitor => {
            let poller = Poller::new(BeaconSession::serial(), store).with_address(cli.device);
            let mut state_rx = poller.subscribe();

            tokio::spawn(async move {
                while state_rx.changed().await.is_ok() {
                    let state = state_rx.borrow_and_update().clone();
                    print_state(&state);
                }
            });

            poller
                .run(async {
                    let _ = tokio::signal::ctrl_c().await;
                })
                .await;
        }
        Commands::Beacon(command) => {
            let mut session = BeaconSession::serial();
            commands::connect_beacon(&mut session, &store, cli.device.as_deref())
                .context("Failed to connect to beacon")?;
            run_beacon_command(command, &mut session).await?;
            session.close();
        }
    }

    Ok(())
}

async fn run_beacon_command(command: BeaconCommands, session: &mut BeaconSession) -> Result<()> {
    match command {
        BeaconCommands::Status => {
            let status = commands::beacon_status(session).await?;
            let hardware = commands::hardware(session).await?;
            println!("Hardware  {}", hardware.description());
            println!("Status    {}", status.code.display_text());
            println!("Band      {} m", status.band);
            println!("Interval  {} min", status.interval);
        }
        BeaconCommands::Start { interval, band } => {
            let reply = commands::start_transmission(session, interval, band).await?;
            log::info!("Start reply: {:?}", reply.fields());
        }
        BeaconCommands::Stop => {
            let reply = commands::stop_transmission(session).await?;
            log::info!("Stop reply: {:?}", reply.fields());
        }
        BeaconCommands::Tune { band } => {
            let reply = commands::tune(session, band).await?;
            log::info!("Tune reply: {:?}", reply.fields());
        }
        BeaconCommands::SyncTime => {
            let reply = commands::sync_time(session, Utc::now()).await?;
            println!("Synchronising time");
            log::info!("Time reply: {:?}", reply.fields());
        }
        BeaconCommands::Config(ConfigCommands::Show) => {
            let form = commands::read_config_form(session).await;
            println!("Call                {}", form.callsign);
            println!("Locator             {}", form.locator);
            println!("Power(W)            {}", form.power_watts);
            println!("Calibration offset  {}", form.calibration_offset);
        }
        BeaconCommands::Config(ConfigCommands::Set { call, locator, power, offset }) => {
            let form = ConfigForm {
                callsign: call,
                locator,
                power_watts: power,
                calibration_offset: offset,
            };
            let reply = commands::write_config_form(session, &form).await?;
            log::info!("Config reply: {:?}", reply.fields());
        }
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    match time {
        Some(t) => t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "No connection".to_string(),
    }
}

fn print_state(state: &SessionState) {
    let hardware = state
        .hardware
        .as_ref()
        .map(|h| h.description())
        .unwrap_or("");
    let skew = state
        .clock_skew_secs
        .map(|s| format!(" ({:+}s)", s))
        .unwrap_or_default();
    let progress = state
        .progress
        .map(|p| format!("  [{:>3}]", p))
        .unwrap_or_default();
    let marker = if state.alert { "!" } else { " " };

    println!(
        "{} PC {} | WSPR {}{} | {}{} | {} | band {} m, interval {} min",
        marker,
        format_time(state.pc_time),
        format_time(state.beacon_time),
        skew,
        state.status_text,
        progress,
        hardware,
        state.band.map(|b| b.to_string()).unwrap_or_else(|| "-".to_string()),
        state.interval.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string()),
    );
}
