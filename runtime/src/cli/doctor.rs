//! Environment readiness check.

use crate::cli::output;
use crate::config::{resolve_config_path, Config};
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::Path;

/// Check Chromium availability and the configuration file.
pub async fn run(explicit: Option<&Path>) -> Result<()> {
    println!("billgrab doctor");
    println!("===============");
    println!();

    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    let path = resolve_config_path(explicit);
    let config = match Config::load(&path) {
        Ok(config) => {
            output::check(true, format!("Config: {}", path.display()));
            Some(config)
        }
        Err(e) => {
            output::check(false, e);
            None
        }
    };

    let configured = config.as_ref().and_then(|c| c.browser.chrome_path.as_ref());
    if let Some(path) = configured.filter(|p| !p.exists()) {
        output::check(
            false,
            format!("browser.chrome_path does not exist: {}", path.display()),
        );
    }

    let chromium = find_chromium(configured);
    match &chromium {
        Some(path) => output::check(true, format!("Chromium found: {}", path.display())),
        None => output::check(
            false,
            "Chromium NOT found. Install Chrome/Chromium or set BILLGRAB_CHROMIUM_PATH.",
        ),
    }

    println!();
    if chromium.is_some() && config.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
