//! leap_fingers: interactive entry point.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;

use fingers_core::Config;
use leap_fingers::app::{run, AppConfig};

#[derive(Parser)]
#[command(name = "leap_fingers")]
#[command(about = "Hands-free cockpit pointer: hand tracking + BLE ring", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Mount profile to start with (preset or custom name)
    #[arg(short, long)]
    profile: Option<String>,

    /// Screen size, e.g. 2560x1440
    #[arg(long, value_name = "WxH", value_parser = parse_screen)]
    screen: Option<(u32, u32)>,

    /// Run without the status window
    #[arg(long)]
    headless: bool,

    /// Receive ring telemetry datagrams on this address
    #[arg(long, value_name = "ADDR")]
    udp_ring: Option<SocketAddr>,

    /// The sensor reports left and right hands swapped
    #[arg(long)]
    swap_hands: bool,

    /// Print the built-in mount presets and exit
    #[arg(long)]
    list_profiles: bool,
}

fn parse_screen(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("expected WIDTHxHEIGHT, got `{}`", s))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(name) = &cli.profile {
        config.mount.profile = name.clone();
    }
    if let Some((w, h)) = cli.screen {
        config.screen.width  = w;
        config.screen.height = h;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║        Leap Fingers : Hands-free Cockpit Pointer             ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    #[cfg(feature = "leap")]
    println!("  Hands: LeapMotion hardware");
    #[cfg(not(feature = "leap"))]
    println!("  Hands: mouse simulation  (use --features leap for hardware)");
    #[cfg(feature = "inject")]
    println!("  Output: OS pointer");
    #[cfg(not(feature = "inject"))]
    println!("  Output: log only  (use --features inject to move the pointer)");
    println!();

    let config = load_config(&cli)?;

    if cli.list_profiles {
        for name in config.profile_names() {
            let p = config.resolve_profile(&name)?;
            println!(
                "  {:<10} rotation ({}, {}, {})  eye ({}, {}, {}) mm",
                name,
                p.rotation_offset_deg.x, p.rotation_offset_deg.y, p.rotation_offset_deg.z,
                p.position_offset_mm.x, p.position_offset_mm.y, p.position_offset_mm.z,
            );
        }
        return Ok(());
    }

    info!(
        "screen {}x{}, profile {}",
        config.screen.width, config.screen.height, config.mount.profile
    );

    run(AppConfig {
        config,
        headless:   cli.headless,
        udp_ring:   cli.udp_ring,
        swap_hands: cli.swap_hands,
    })
}
