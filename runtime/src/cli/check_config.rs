//! `billgrab check-config`: load and validate without touching the portal.

use crate::cli::output;
use crate::config::{resolve_config_path, Config, NotifyKind};
use crate::notify;
use anyhow::{bail, Result};
use std::path::Path;

pub async fn run(explicit: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(explicit);
    let mut config = Config::load(&path)?;
    config.apply_env();

    println!("Config: {}", path.display());
    println!();

    let mut problems = 0usize;

    match config.portal.credentials() {
        Ok(creds) => output::check(true, format!("portal user {}", creds.user)),
        Err(e) => {
            problems += 1;
            output::check(false, e);
        }
    }

    match config.portal.endpoints() {
        Ok(endpoints) => output::check(true, format!("login page {}", endpoints.login_url)),
        Err(e) => {
            problems += 1;
            output::check(false, e);
        }
    }

    match config.selected_categories(&[]) {
        Ok(categories) => {
            let names: Vec<&str> = categories.iter().map(|c| c.display_name).collect();
            output::check(true, format!("categories: {}", names.join(", ")));
        }
        Err(e) => {
            problems += 1;
            output::check(false, e);
        }
    }

    match notify::from_config(&config) {
        Ok(Some(notifier)) => output::check(true, describe_notifier(&config, notifier.name())),
        Ok(None) => output::check(true, "delivery disabled"),
        Err(e) => {
            problems += 1;
            output::check(false, e);
        }
    }

    if output::is_verbose() {
        println!();
        println!("{config:#?}");
    }

    println!();
    if problems > 0 {
        bail!("{problems} configuration problem(s)");
    }
    println!("Status: OK");
    Ok(())
}

fn describe_notifier(config: &Config, name: &str) -> String {
    match config.notify {
        NotifyKind::Mail => format!(
            "{name} to {} via {}:{}",
            config.email.to, config.smtp.host, config.smtp.port
        ),
        NotifyKind::Webhook => format!("{name} to {}", config.webhook.url),
        NotifyKind::None => name.to_string(),
    }
}
