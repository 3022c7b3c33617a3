//! Host platform gating for scenarios

/// Normalised name of the host operating system
pub fn host_platform() -> &'static str {
    normalize(std::env::consts::OS)
}

/// Human-readable host description for skip messages
pub fn host_description() -> String {
    let info = os_info::get();
    format!("{} {} ({})", info.os_type(), info.version(), std::env::consts::ARCH)
}

/// Whether `host` is one of `platforms`
///
/// Names are compared case-insensitively; `darwin` and `macosx` mean `macos`.
pub fn platform_matches<S: AsRef<str>>(platforms: &[S], host: &str) -> bool {
    let host = normalize(host);
    platforms
        .iter()
        .any(|p| normalize(&p.as_ref().to_ascii_lowercase()) == host)
}

fn normalize(name: &str) -> &str {
    match name {
        "darwin" | "macosx" | "osx" | "macos" => "macos",
        other => other,
    }
}
