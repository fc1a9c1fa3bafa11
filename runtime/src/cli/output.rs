//! Human-facing output helpers.
//!
//! Global flags are mirrored into environment variables by `main` so every
//! command can check them without threading arguments through.

/// Whether `--quiet` was given.
pub fn is_quiet() -> bool {
    std::env::var_os("BILLGRAB_QUIET").is_some()
}

/// Whether `--verbose` was given.
pub fn is_verbose() -> bool {
    std::env::var_os("BILLGRAB_VERBOSE").is_some()
}

/// Print a status line unless quiet.
pub fn status(msg: impl std::fmt::Display) {
    if !is_quiet() {
        println!("  {msg}");
    }
}

/// Check-list line as printed by `doctor` and `check-config`.
pub fn check(ok: bool, msg: impl std::fmt::Display) {
    let sym = if ok { "[OK]" } else { "[!!]" };
    println!("{sym} {msg}");
}
