/// Release index key for the host, e.g. `x86_64-linux`.
///
/// Returns `None` on hosts the upstream index does not publish builds for.
#[must_use]
pub fn host_platform() -> Option<&'static str> {
    let key = if cfg!(target_os = "linux") && cfg!(target_arch = "x86_64") {
        "x86_64-linux"
    } else if cfg!(target_os = "linux") && cfg!(target_arch = "aarch64") {
        "aarch64-linux"
    } else if cfg!(target_os = "linux") && cfg!(target_arch = "riscv64") {
        "riscv64-linux"
    } else if cfg!(target_os = "macos") && cfg!(target_arch = "aarch64") {
        "aarch64-macos"
    } else if cfg!(target_os = "macos") && cfg!(target_arch = "x86_64") {
        "x86_64-macos"
    } else if cfg!(target_os = "windows") && cfg!(target_arch = "x86_64") {
        "x86_64-windows"
    } else if cfg!(target_os = "windows") && cfg!(target_arch = "aarch64") {
        "aarch64-windows"
    } else if cfg!(target_os = "freebsd") && cfg!(target_arch = "x86_64") {
        "x86_64-freebsd"
    } else {
        return None;
    };
    Some(key)
}

/// Download URL pattern for builds missing from the index.
///
/// The returned template keeps a single `{version}` slot.
#[must_use]
pub fn fallback_url_template(platform: &str) -> String {
    format!("https://ziglang.org/builds/zig-{platform}-{{version}}.tar.xz")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn host_platform_matches_index_key_on_linux_x64() {
        assert_eq!(host_platform(), Some("x86_64-linux"));
    }

    #[test]
    fn host_platform_key_is_arch_then_os() {
        if let Some(key) = host_platform() {
            let (arch, os) = key.split_once('-').expect("key has arch and os");
            assert!(!arch.is_empty());
            assert!(!os.is_empty());
        }
    }

    #[test]
    fn fallback_template_keeps_version_slot() {
        let template = fallback_url_template("aarch64-macos");
        assert_eq!(
            template,
            "https://ziglang.org/builds/zig-aarch64-macos-{version}.tar.xz"
        );
    }
}
