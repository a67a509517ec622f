//! Build script for Aklla
//!
//! Stamps the binary with its compile time and cargo profile so a running
//! server can say which build wrote a batch record.

fn main() {
    println!("cargo:rerun-if-changed=src");

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=AKLLA_BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=AKLLA_BUILD_PROFILE={}", profile);
}
