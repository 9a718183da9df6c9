//! Delivery of a rendered report through Pushover.

use anyhow::{Context, Result};
use nr_notify::Client;

use crate::Config;

/// Sends `message` to the configured Pushover user.
pub fn send(config: &Config, title: &str, message: &str) -> Result<()> {
    let (token, user) = config.pushover_credentials().ok_or_else(|| {
        anyhow::anyhow!(
            "missing Pushover credentials (set NR_PUSHOVER_TOKEN and NR_PUSHOVER_USER or config.toml)"
        )
    })?;

    let client = Client::new(token, user).context("failed to create Pushover client")?;
    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    runtime
        .block_on(client.send(title, message))
        .context("failed to send report to Pushover")?;
    tracing::info!(%title, "report sent to Pushover");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_fail_before_sending() {
        let err = send(&Config::default(), "NINA Report", "body").unwrap_err();
        assert!(err.to_string().contains("missing Pushover credentials"));
    }
}
