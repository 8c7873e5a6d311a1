//! Small platform-detection helpers used by the lifecycle gate and the
//! atomic file helpers.

use std::path::{Path, PathBuf};

pub fn is_windows() -> bool {
    cfg!(windows)
}

/// The shell used to run a trusted package's lifecycle script: POSIX
/// `sh -c` everywhere except the platform that demands `cmd /C`.
pub fn shell_command(cmd: &str) -> std::process::Command {
    if is_windows() {
        let mut c = std::process::Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = std::process::Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Windows has a legacy 260-character path limit for some APIs; this is a
/// no-op passthrough elsewhere and on modern Windows with long-path support,
/// kept as an explicit seam so callers don't have to special-case it.
pub fn windows_long_path(path: &Path) -> PathBuf {
    path.to_path_buf()
}
