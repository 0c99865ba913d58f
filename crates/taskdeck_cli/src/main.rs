//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskdeck_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

fn main() {
    println!("taskdeck_core version={}", taskdeck_core::core_version());
}
