//! Beamsight native viewer
//!
//! Desktop build of the browser demo. Reads `beamsight.toml` from the working
//! directory when present.

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use beamsight_core::config::{load_config, save_default_config, DEFAULT_CONFIG_FILE};
    use clap::Parser;
    use std::path::PathBuf;
    use tracing::info;
    use tracing_subscriber::EnvFilter;

    #[derive(Parser, Debug)]
    #[command(name = "beamsight")]
    #[command(about = "3D marker placement and simulated detection demo")]
    #[command(version)]
    struct Args {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Room scan (.glb) to load at startup
        #[arg(short, long)]
        room: Option<String>,

        /// Write the default configuration to the config path and exit
        #[arg(long)]
        write_config: bool,
    }

    let args = Args::parse();

    if args.write_config {
        save_default_config(&args.config)?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    let mut config = load_config(&args.config)?;
    if let Some(room) = args.room {
        config.scene.room = Some(room);
    }

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Beamsight v{}", env!("CARGO_PKG_VERSION"));
    info!(room = ?config.scene.room, mode = ?config.signal.mode, "Configuration loaded");

    beamsight_web::run(config);
    Ok(())
}

// The wasm build starts from the library's wasm_bindgen entry point
#[cfg(target_arch = "wasm32")]
fn main() {}
