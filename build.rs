// vasurf/build.rs
//
//! The `vasurf` build script.

use cfg_aliases::cfg_aliases;

fn main() {
    // Setup aliases for #[cfg] checks
    cfg_aliases! {
        // Platforms
        android: { target_os = "android" },
        macos: { target_os = "macos" },
        linux: { all(unix, not(any(macos, android))) },

        // Features:
        // The libva backend links against the system `libva`, which only exists on Linux.
        va_backend: { all(linux, feature = "sm-va") },
    }
}
