use std::time::{SystemTime, UNIX_EPOCH};

fn emit_build_version() {
    let n = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    println!("cargo:rustc-env=PRIMERDESK_BUILD_N={n}");
    println!("cargo:rustc-env=PRIMERDESK_DISPLAY_VERSION={version}+{n}");
}

fn main() {
    emit_build_version();
}
