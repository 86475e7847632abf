use clap::Parser;
use serial_term::config::{Config, ConfigLoader, LineEnding};
use serial_term::error::AppResult;
use serial_term::port::{BaudRate, SystemPortOpener};
use serial_term::session::IoMode;
use serial_term::{discovery, logging, stdio};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-term",
    version,
    about = "A line-mode serial terminal.",
    long_about = "Opens a serial device, prints whatever it sends and writes each typed line to it. \
                  Lines starting with ':' are terminal directives; type :help for the list."
)]
struct Args {
    /// Device to connect to on startup (a path or a configured alias).
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate: 9600, 38400, 115200 or 1200000.
    #[arg(short, long)]
    baud: Option<BaudRate>,

    /// I/O model: threaded or polling.
    #[arg(short, long)]
    mode: Option<IoMode>,

    /// Terminator appended to each typed line: none, lf, cr or crlf.
    #[arg(short, long)]
    line_ending: Option<LineEnding>,

    /// Configuration file to use instead of the standard locations.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List candidate ports and exit.
    #[arg(long)]
    list: bool,

    /// Emit one JSON object per event instead of plain text.
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> AppResult<Config> {
    let loader = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let mut config = loader.into_config();

    if let Some(port) = &args.port {
        config.serial.default_port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.serial.default_baud = baud.as_u32();
    }
    if let Some(mode) = args.mode {
        config.serial.io_mode = mode;
    }
    if let Some(line_ending) = args.line_ending {
        config.terminal.line_ending = line_ending;
    }
    Ok(config)
}

fn list_ports(config: &Config, json: bool) -> AppResult<()> {
    let ports = discovery::available_ports(&config.serial.port_prefixes)?;
    if json {
        let text = serde_json::to_string_pretty(&ports).map_err(std::io::Error::from)?;
        println!("{text}");
    } else {
        for port in ports {
            match port.product {
                Some(product) => println!("{}\t{}\t{}", port.name, port.transport, product),
                None => println!("{}\t{}", port.name, port.transport),
            }
        }
    }
    Ok(())
}

async fn run(args: Args) -> AppResult<()> {
    let config = load_config(&args)?;
    logging::init(&config.logging)?;
    debug!("Effective configuration: {:?}", config);

    if args.list {
        return list_ports(&config, args.json);
    }

    info!(
        "Starting serial-term ({} mode, {} baud)",
        config.serial.io_mode,
        config.serial.baud_rate()
    );
    let opener = SystemPortOpener::new(config.serial.read_timeout());
    stdio::run(opener, config, args.json).await
}

fn main() -> ExitCode {
    let args = Args::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("serial-term: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(run(args));
    // A stdin read may still be parked on its blocking thread after :quit.
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("serial-term: {e}");
            ExitCode::FAILURE
        }
    }
}
