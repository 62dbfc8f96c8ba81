fn main() {
    set_build_version();
}

/// Make the current git hash available to the build as the environment
/// variable `SPEEDTEST_BUILD_GIT_HASH`, and the full version string shown by
/// `--version` as `SPEEDTEST_VERSION`.
fn set_build_version() {
    use std::process::Command;

    let version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();

    let args = &["rev-parse", "--short=10", "HEAD"];
    let rev = Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|rev| !rev.is_empty());

    match rev {
        Some(rev) => {
            println!("cargo:rustc-env=SPEEDTEST_BUILD_GIT_HASH={}", rev);
            println!("cargo:rustc-env=SPEEDTEST_VERSION={} (rev {})", version, rev);
        }
        None => println!("cargo:rustc-env=SPEEDTEST_VERSION={}", version),
    }
}
