use std::path::Path;

use anyhow::bail;
use indoc::indoc;

use crate::Config;

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;

    validate(&config)?;

    for warning in warnings(&config) {
        log::warn!("{warning}");
    }

    log::debug!("Loaded configuration from {}", path.display());

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    let rate_limits = &config.server.rate_limits;

    if rate_limits.enabled && rate_limits.max_events == 0 {
        bail!(indoc! {r#"
            Rate limiting is enabled but max_events is 0, which would reject every request.
            Set a positive limit or disable rate limiting:

              [server.rate_limits]
              max_events = 5
              window = "60s"
        "#});
    }

    if rate_limits.enabled && rate_limits.window.is_zero() {
        bail!("Rate limit window must be longer than zero");
    }

    if config.storage.retry.attempts == 0 {
        bail!("storage.retry.attempts must be at least 1, the first attempt counts");
    }

    if let Some(hours) = &config.server.access_hours
        && (hours.start_hour >= hours.end_hour || hours.end_hour > 24)
    {
        bail!(
            "Invalid access hours {}..{}: start_hour must be before end_hour and end_hour at most 24",
            hours.start_hour,
            hours.end_hour
        );
    }

    if config.storage.cache.max_capacity == Some(0) {
        bail!("storage.cache.max_capacity must be positive when set");
    }

    Ok(())
}

/// Settings that are valid but probably not what the operator wants.
fn warnings(config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.storage.cache.is_unbounded() {
        warnings.push(
            "Memo cache has no max_capacity or time_to_live, entries are kept for the lifetime of the process"
                .to_string(),
        );
    }

    if !config.server.roles.protected_paths.is_empty() && config.server.roles.allowed_roles.is_empty() {
        warnings.push("Protected paths are configured without allowed roles, nobody can reach them".to_string());
    }

    warnings
}
