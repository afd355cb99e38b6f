//! frame-relay server
//!
//! Run with: frame-relay [INGEST_ADDR] [HTTP_ADDR] [--mjpeg] [--plain]
//!
//! Examples:
//!   frame-relay                                  # ingest 0.0.0.0:9999, HTTP 0.0.0.0:8080
//!   frame-relay localhost                        # ingest 127.0.0.1:9999
//!   frame-relay 0.0.0.0:7000 0.0.0.0:7080        # custom ports
//!   frame-relay --mjpeg                          # raw RGBA frames in, MJPEG out
//!
//! ## Playing
//!
//! Progressive (H.264 elementary stream):
//!   vlc http://<host>:8080/
//!   ffplay -f h264 http://<host>:8080/
//!
//! Multipart (MJPEG):
//!   open http://<host>:8080/ in a browser

use std::net::SocketAddr;

use frame_relay::protocol::constants::{DEFAULT_HTTP_PORT, DEFAULT_INGEST_PORT};
use frame_relay::{EgressMode, Relay, ServerConfig, WireFormat};

/// Parse an address argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:<default_port>
/// - "localhost:7000" -> 127.0.0.1:7000
/// - "127.0.0.1" -> 127.0.0.1:<default_port>
/// - "0.0.0.0:7000" -> 0.0.0.0:7000
fn parse_bind_addr(arg: &str, default_port: u16) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    Err(format!(
        "Invalid address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: frame-relay [INGEST_ADDR] [HTTP_ADDR] [--mjpeg] [--plain]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  INGEST_ADDR  Producer TCP address (default: 0.0.0.0:{DEFAULT_INGEST_PORT})");
    eprintln!("  HTTP_ADDR    Consumer HTTP address (default: 0.0.0.0:{DEFAULT_HTTP_PORT})");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --mjpeg      Transcode raw RGBA frames and serve multipart JPEG");
    eprintln!("  --plain      Producer uses the marker-less wire format");
    eprintln!("  -h, --help   Show this message");
}

fn parse_args(args: &[String]) -> Result<ServerConfig, String> {
    let mut config = ServerConfig::default();
    let mut positional = 0;

    for arg in args {
        match arg.as_str() {
            "--mjpeg" => config = config.egress(EgressMode::Multipart),
            "--plain" => config = config.wire_format(WireFormat::Plain),
            flag if flag.starts_with("--") => return Err(format!("Unknown option: {}", flag)),
            addr => {
                match positional {
                    0 => config = config.ingest(parse_bind_addr(addr, DEFAULT_INGEST_PORT)?),
                    1 => config = config.http(parse_bind_addr(addr, DEFAULT_HTTP_PORT)?),
                    _ => return Err(format!("Unexpected argument: {}", addr)),
                }
                positional += 1;
            }
        }
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("frame_relay=debug".parse()?),
        )
        .init();

    let relay = Relay::bind(config).await?;
    tracing::info!(
        ingest = %relay.ingest_addr()?,
        http = %relay.http_addr()?,
        "Relay started"
    );

    relay
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_bind_addr() {
        assert_eq!(
            parse_bind_addr("localhost", 9999).unwrap(),
            "127.0.0.1:9999".parse::<SocketAddr>().unwrap()
        );
        assert_eq!(
            parse_bind_addr("0.0.0.0:7000", 9999).unwrap(),
            "0.0.0.0:7000".parse::<SocketAddr>().unwrap()
        );
        assert!(parse_bind_addr("not-an-addr", 9999).is_err());
    }

    #[test]
    fn test_parse_args() {
        let config = parse_args(&args(&["localhost:7000", "localhost:7080", "--mjpeg", "--plain"]))
            .unwrap();

        assert_eq!(config.ingest_addr.port(), 7000);
        assert_eq!(config.http_addr.port(), 7080);
        assert_eq!(config.egress, EgressMode::Multipart);
        assert_eq!(config.wire_format, WireFormat::Plain);
    }

    #[test]
    fn test_parse_args_rejects_extra() {
        assert!(parse_args(&args(&["a:1", "b:2", "c:3"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}
