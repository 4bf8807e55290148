//! Resolve addresses given on the command line.
//!
//! ```text
//! RUST_LOG=mappicker_rs=debug cargo run --example resolve_address -- "東京都千代田区丸の内１丁目９−１"
//! ```
//!
//! Provider settings are read from `MAPPICKER_*` environment variables.

use mappicker_rs::{MapPicker, MapPickerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mappicker_rs=info")),
        )
        .init();

    let addresses: Vec<String> = std::env::args().skip(1).collect();
    if addresses.is_empty() {
        eprintln!("usage: resolve_address <address>...");
        std::process::exit(2);
    }

    let picker = MapPicker::with_config(MapPickerConfig::from_env()?)?;

    for address in &addresses {
        let segments = picker.segment_address(address);
        println!("{address}");
        for (label, value) in segments.components() {
            println!("  {label:<10} {value}");
        }

        let outcome = picker.resolve(address).await?;
        match (outcome.coordinate, outcome.matched_query.as_deref()) {
            (Some(coordinate), Some(query)) => println!(
                "  -> {coordinate} via {query:?} ({}, zoom {}) after {} request(s)",
                outcome.specificity.map(|s| s.to_string()).unwrap_or_default(),
                outcome.zoom.unwrap_or_default(),
                outcome.attempts,
            ),
            _ => println!("  -> not found after {} request(s)", outcome.attempts),
        }
    }

    Ok(())
}
