//! Configuration commands.

use absendo_core::DataMapping;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Dump the current configuration to stdout.
pub fn dump(config: &ClientConfig) -> ClientResult<()> {
    let toml_str = toml::to_string_pretty(config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    println!("# config.toml ({})", ClientConfig::default_path().display());
    println!("{}", toml_str);

    Ok(())
}

/// Validate the configuration.
pub fn validate(config: &ClientConfig) -> ClientResult<()> {
    let fetch = config.to_fetch_config().map_err(ClientError::Config)?;
    if let Some(ref proxy) = fetch.proxy {
        println!(
            "Proxy: {} (for URLs containing '{}')",
            proxy.endpoint, proxy.host_pattern
        );
    }

    let mapping = config.mapping.load().map_err(ClientError::Config)?;
    let (source, mapping) = match mapping {
        Some(ref custom) => ("custom", custom),
        None => ("built-in", DataMapping::builtin()),
    };
    println!(
        "Mapping tables ({}): {} teachers, {} subjects.",
        source,
        mapping.teacher_count(),
        mapping.subject_count()
    );

    println!("Configuration is valid.");
    Ok(())
}

/// Show the configuration file path.
pub fn path() -> ClientResult<()> {
    let config_path = ClientConfig::default_path();
    println!("config: {}", config_path.display());
    Ok(())
}
