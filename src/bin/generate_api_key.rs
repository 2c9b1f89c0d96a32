//! CLI tool to generate an ingest API key.
//!
//! The server accepts a single shared key read from `TRD_API_KEY`; this tool
//! only prints a fresh value to put there.
//!
//! Usage:
//!   cargo run --bin generate-api-key -- [--env]

use std::env;

use uuid::Uuid;

/// Prefix that makes keys easy to spot in secret scanners.
const KEY_PREFIX: &str = "trd_";

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut env_line = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "--env" | "-e" => env_line = true,
            "--help" | "-h" => {
                print_usage();
                return;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Two v4 UUIDs give 244 random bits.
    let key = format!(
        "{}{}{}",
        KEY_PREFIX,
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    );

    if env_line {
        println!("TRD_API_KEY={}", key);
        return;
    }

    println!();
    println!("════════════════════════════════════════════════════════════════");
    println!("  API Key Generated");
    println!("════════════════════════════════════════════════════════════════");
    println!();
    println!("  Key:     {}", key);
    println!();
    println!("  Set it as TRD_API_KEY on the server and in every test runner.");
    println!("════════════════════════════════════════════════════════════════");
    println!();
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: generate-api-key [--env]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --env, -e   Print as a TRD_API_KEY=... line for a .env file");
    eprintln!("  --help, -h  Show this help");
    eprintln!();
}
