//! Pairing tool for Sprout plant monitors
//!
//! Scans for monitors in setup mode, sends them WiFi credentials via BLE and
//! manages the account their plants are registered to.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sprout_ble_controller::{
    BtleCentral, DiscoveredDevice, Provisioning, ScanOutcome, SetupSummary, WifiCredential,
    discovery,
};
use sprout_client::{ApiClient, AuthService, ClientConfig, CredentialStore, Role, store};
use sprout_proto::{DEFAULT_LOCATION, LOCATION_SUGGESTIONS, LocalRegistry, PlantProfile, PlantType};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "sprout-ble")]
#[command(about = "Pair Sprout plant monitors and manage your account")]
struct Cli {
    /// API base URL, overrides SPROUT_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan for plant monitors in setup mode
    Scan {
        /// Scan duration in milliseconds, overrides SPROUT_SCAN_TIMEOUT_MS
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },
    /// Send WiFi credentials to a monitor and attach a plant to it
    Provision {
        /// Hardware id, short id or advertised name; strongest signal when omitted
        #[arg(short, long)]
        device: Option<String>,
        /// WiFi credentials file (SSID on line 1, password on line 2)
        #[arg(short, long, default_value = "wifi_credentials.txt")]
        file: String,
        /// Account the monitor reports to, defaults to the logged-in user
        #[arg(long)]
        email: Option<String>,
        /// Name for the plant
        #[arg(short, long)]
        name: String,
        /// Plant type id, see `sprout-ble plants`
        #[arg(long = "type", default_value = "snake_plant")]
        plant_type: PlantType,
        #[arg(short, long, default_value = DEFAULT_LOCATION)]
        location: String,
    },
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long, default_value = "USER")]
        role: Role,
    },
    /// Forget the saved session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// List plant types and location suggestions
    Plants,
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine, the environment may be set externally
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_url = url.trim_end_matches('/').to_owned();
    }
    tracing::debug!(
        api_url = %config.api_url,
        home = %config.home.display(),
        backend = ?config.credential_backend,
        "config loaded"
    );

    match cli.command {
        Commands::Scan { timeout_ms } => {
            let timeout = timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(config.scan_timeout);
            scan_devices(timeout).await?;
        }
        Commands::Provision {
            device,
            file,
            email,
            name,
            plant_type,
            location,
        } => {
            let auth = auth_service(&config)?;
            let profile = PlantProfile::new(name, plant_type, location);
            provision_device(&config, &auth, device.as_deref(), &file, email, profile).await?;
        }
        Commands::Login { email, password } => {
            let auth = auth_service(&config)?;
            let session = auth
                .login(&email, &password)
                .await
                .map_err(|e| alert(e.user_message(), e))?;
            println!("Logged in as {} ({})", session.email, session.role);
        }
        Commands::Register {
            name,
            email,
            password,
            role,
        } => {
            let auth = auth_service(&config)?;
            auth.register(&email, &password, &name, role)
                .await
                .map_err(|e| alert(e.user_message(), e))?;
            println!("Account created for {email}. You can now log in.");
        }
        Commands::Logout => {
            auth_service(&config)?
                .logout()
                .map_err(|e| alert(e.user_message(), e))?;
            println!("Logged out.");
        }
        Commands::Whoami => {
            let auth = auth_service(&config)?;
            match auth.current_user() {
                Some(user) if auth.is_authenticated() => {
                    let role = user.role.map(|r| r.to_string());
                    println!("{} ({})", user.email, role.as_deref().unwrap_or("unknown role"));
                }
                _ => println!("Not logged in."),
            }
        }
        Commands::Plants => list_plants(),
    }

    Ok(())
}

/// Attach the user-facing text to an error, keeping it as the cause
fn alert<E>(message: impl std::fmt::Display + Send + Sync + 'static, e: E) -> anyhow::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    anyhow::Error::new(e).context(message)
}

fn auth_service(config: &ClientConfig) -> Result<AuthService> {
    let credentials = CredentialStore::new(
        store::open(config).context("failed to open credential storage")?,
    );
    let api = ApiClient::new(config, credentials.clone()).context("failed to build HTTP client")?;
    Ok(AuthService::new(api, credentials))
}

fn read_wifi_credentials(file: &str) -> Result<(String, String)> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("failed to read {file}"))?;
    let mut lines = content.lines();
    let ssid = lines
        .next()
        .context("Missing SSID in credentials file")?
        .trim()
        .to_string();
    let password = lines
        .next()
        .context("Missing password in credentials file")?
        .trim()
        .to_string();
    Ok((ssid, password))
}

fn print_device(device: &DiscoveredDevice) {
    println!(
        "  Plant Monitor {:<8} {:>4} dBm  {:<9}  ({})",
        device.short_id,
        device.rssi,
        device.signal_strength.label(),
        device.hardware_id
    );
}

async fn scan_devices(timeout: Duration) -> Result<()> {
    let central = BtleCentral::new()
        .await
        .map_err(|e| alert(e.user_message(), e))?;

    println!(
        "Scanning for plant monitors ({} seconds)...",
        timeout.as_secs_f32()
    );

    let mut session = discovery::scan(&central, timeout)
        .await
        .map_err(|e| alert(e.user_message(), e))?;

    let mut seen = HashSet::new();
    while let Some(device) = session
        .next()
        .await
        .map_err(|e| alert(e.user_message(), e))?
    {
        if seen.insert(device.hardware_id.clone()) {
            println!("  found {}", device.advertised_name);
        }
    }

    match session.outcome() {
        ScanOutcome::Found(devices) => {
            println!("\nFound {} devices:", devices.len());
            for device in &devices {
                print_device(device);
            }
        }
        ScanOutcome::NoDevicesFound => {
            println!("\nNo devices found.");
            println!("{}", ScanOutcome::NO_DEVICES_HINT);
        }
    }
    Ok(())
}

fn is_target(device: &DiscoveredDevice, target: &str) -> bool {
    device.hardware_id == target || device.short_id == target || device.advertised_name == target
}

/// Scan until `target` shows up, or pick the strongest monitor when no
/// target is given
async fn find_device(
    central: &BtleCentral,
    target: Option<&str>,
    timeout: Duration,
) -> Result<DiscoveredDevice> {
    println!("Scanning for plant monitors...");

    let mut session = discovery::scan(central, timeout)
        .await
        .map_err(|e| alert(e.user_message(), e))?;

    while let Some(device) = session
        .next()
        .await
        .map_err(|e| alert(e.user_message(), e))?
    {
        if target.is_some_and(|t| is_target(&device, t)) {
            session.stop().await;
            println!("Found device: {} ({})", device.advertised_name, device.hardware_id);
            return Ok(device);
        }
    }

    if let Some(t) = target {
        bail!("Device {t} not found. {}", ScanOutcome::NO_DEVICES_HINT);
    }

    match session.outcome() {
        ScanOutcome::Found(devices) => {
            let Some(device) = devices.into_iter().next() else {
                bail!("No devices found. {}", ScanOutcome::NO_DEVICES_HINT);
            };
            println!(
                "Found device: {} ({}, {})",
                device.advertised_name,
                device.hardware_id,
                device.signal_strength.label()
            );
            Ok(device)
        }
        ScanOutcome::NoDevicesFound => {
            bail!("No devices found. {}", ScanOutcome::NO_DEVICES_HINT)
        }
    }
}

async fn provision_device(
    config: &ClientConfig,
    auth: &AuthService,
    target: Option<&str>,
    file: &str,
    email: Option<String>,
    profile: PlantProfile,
) -> Result<()> {
    // check everything the user typed before touching the radio
    let (ssid, password) = read_wifi_credentials(file)?;
    let account_email = match email {
        Some(email) => email,
        None => auth
            .current_user()
            .map(|u| u.email)
            .context("No account email: log in first or pass --email")?,
    };
    let credential = WifiCredential::new(ssid, password, account_email);
    credential.validate().context("Invalid WiFi credentials")?;
    profile.validate().context("Invalid plant details")?;

    let central = BtleCentral::new()
        .await
        .map_err(|e| alert(e.user_message(), e))?;
    let device = find_device(&central, target, config.scan_timeout).await?;

    println!("Connecting...");
    let setup = Provisioning::connect(&central, &device, config.connect_timeout)
        .await
        .map_err(|e| alert(e.user_message(), e))?;
    println!("Connected!");

    // the link is released on every path, including a failed step
    let summary = setup
        .run_then_disconnect(async |setup| {
            for line in setup.read_device_info().await.status_lines() {
                println!("  {line}");
            }

            println!("Sending WiFi credentials...");
            println!("  SSID: {}", credential.ssid);
            setup
                .send_wifi_config(&credential)
                .await
                .map_err(|e| alert(e.user_message(), e))?;
            println!("WiFi credentials sent!");

            setup
                .begin_plant_details()
                .map_err(|e| alert(e.user_message(), e))?;

            let finalized = if auth.is_authenticated() {
                setup.finalize(profile, auth.api()).await
            } else {
                println!("Not logged in, the plant is only recorded on this machine.");
                setup.finalize(profile, &LocalRegistry).await
            };
            finalized.map_err(|e| alert(e.user_message(), e))
        })
        .await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SetupSummary) {
    let plant = &summary.plant;
    println!("\nSetup complete!");
    println!("  Device:   Plant Monitor {}", summary.device.short_id);
    println!("  Plant:    {}", plant.display_name);
    println!(
        "  Type:     {} (water needs: {})",
        plant.plant_type.display_name(),
        plant.plant_type.water_needs().label()
    );
    println!("  Location: {}", plant.location);
    println!("  WiFi:     {}", summary.wifi_ssid);
    println!("The device will restart and connect to WiFi.");
}

fn list_plants() {
    println!("Plant types:");
    for plant_type in PlantType::ALL {
        println!(
            "  {:<14} {:<18} water needs: {}",
            plant_type.id(),
            plant_type.display_name(),
            plant_type.water_needs().label()
        );
    }
    println!("\nLocations:");
    for location in LOCATION_SUGGESTIONS {
        let marker = if location == DEFAULT_LOCATION { " (default)" } else { "" };
        println!("  {location}{marker}");
    }
}
