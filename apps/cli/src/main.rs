use std::time::Duration;

use clap::Parser;
use pixy_link::{Link, UsbLink};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pixy (CMUcam5) USB link probe", long_about = None)]
struct Args {
    /// Zero-based index of the Pixy to open when several are attached
    #[arg(long, default_value_t = 0)]
    index: usize,

    /// Drain the IN endpoint for this many milliseconds, hex-dumping the bytes
    #[arg(long, default_value_t = 0)]
    listen_ms: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(if args.verbose {
                    tracing::Level::DEBUG.into()
                } else {
                    tracing::Level::INFO.into()
                })
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    if let Err(e) = run(&args) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut link = UsbLink::new();
    link.open(args.index)?;
    info!(
        index = args.index,
        block_size = link.block_size(),
        "link open"
    );

    if args.listen_ms == 0 {
        return Ok(());
    }

    let mut buf = vec![0u8; link.block_size() as usize];
    let mut total = 0usize;
    link.reset_timer();

    while link.elapsed_ms() < args.listen_ms {
        match link.receive(&mut buf, Duration::ZERO) {
            Ok(n) => {
                total += n;
                if n > 0 {
                    println!("{}", hex_dump(&buf[..n]));
                }
            }
            Err(e) if e.is_timeout() => continue,
            Err(e) => {
                warn!(error = %e, "receive failed");
                break;
            }
        }
    }

    info!(total, elapsed_ms = link.elapsed_ms(), "listen finished");
    Ok(())
}

fn hex_dump(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
