//! Stream manager demo
//!
//! Run with: cargo run --example manager_demo SOURCE RTMP_URL STREAM_KEY [KIND]
//!
//! Examples:
//!   cargo run --example manager_demo clip.mp4 rtmp://localhost/live test_key
//!   cargo run --example manager_demo https://youtu.be/abc rtmp://localhost/live test_key remote
//!   cargo run --example manager_demo screen rtmp://localhost/live test_key screen
//!
//! Adds one stream, starts it, and prints every status change until
//! Ctrl+C, then stops the stream and exits. Needs `ffmpeg` on PATH (and
//! `yt-dlp` for remote sources).

use livecast::{
    Destination, ManagerConfig, RegistryEvent, SourceKind, StreamConfig, StreamManager,
    StreamOptions,
};

fn parse_kind(arg: &str) -> Result<SourceKind, String> {
    match arg {
        "file" => Ok(SourceKind::File),
        "remote" => Ok(SourceKind::RemoteVideo),
        "screen" => Ok(SourceKind::ScreenCapture),
        other => Err(format!(
            "Unknown source kind: '{}'. Expected file, remote or screen",
            other
        )),
    }
}

fn print_usage() {
    eprintln!("Usage: manager_demo SOURCE RTMP_URL STREAM_KEY [KIND]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  SOURCE      File path, video URL, or 'screen'");
    eprintln!("  RTMP_URL    Ingest base URL, e.g. rtmp://localhost/live");
    eprintln!("  STREAM_KEY  Stream key appended to the URL");
    eprintln!("  KIND        file | remote | screen (default: file)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  manager_demo clip.mp4 rtmp://localhost/live test_key");
    eprintln!("  manager_demo https://youtu.be/abc rtmp://localhost/live test_key remote");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") || args.len() < 4 {
        print_usage();
        return Ok(());
    }

    let kind = match args.get(4) {
        Some(arg) => match parse_kind(arg) {
            Ok(kind) => kind,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => SourceKind::File,
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("livecast=debug".parse()?),
        )
        .init();

    let manager = StreamManager::new(ManagerConfig::default());

    // Print every status change as it happens
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                RegistryEvent::StatusChanged { id, snapshot } => {
                    println!(
                        "[{}] {} (pid: {:?}{})",
                        id,
                        snapshot.status,
                        snapshot.pid,
                        snapshot
                            .error_detail
                            .map(|d| format!(", error: {}", d))
                            .unwrap_or_default()
                    );
                }
                RegistryEvent::Removed { id } => println!("[{}] removed", id),
            }
        }
    });

    manager
        .add(StreamConfig {
            id: "demo".into(),
            source: args[1].clone(),
            kind,
            destination: Destination::new(args[2].clone(), args[3].clone()),
            options: StreamOptions::default(),
        })
        .await?;

    println!("Starting stream to {}/{}", args[2].trim_end_matches('/'), args[3]);
    manager.start("demo").await?;
    println!("Streaming. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    println!("\nStopping...");
    manager.stop("demo").await?;

    Ok(())
}
