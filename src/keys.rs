//! `pageforge keys` - inspect, store and check API keys without starting a build

use std::path::Path;

use pageforge_app::config::load_settings;
use pageforge_app::services::build_live_services;
use pageforge_app::CredentialStore;
use pageforge_core::prelude::*;
use pageforge_core::{ApiKeys, Provider};

/// Print every provider with "Configured" / "Not Set". Key values are never shown.
pub fn list(data_dir: &Path) {
    let store = CredentialStore::open(data_dir);
    for line in status_lines(store.keys()) {
        println!("{}", line);
    }
    println!();
    println!("Stored in {}", store.path().display());
}

/// Store one key, keeping the others.
pub fn set(data_dir: &Path, provider: Provider, value: &str) -> Result<()> {
    let mut store = CredentialStore::open(data_dir);
    let mut keys = store.keys().clone();
    keys.set(provider, value.trim());
    store.save(keys)?;
    info!("Stored {} via CLI", provider.label());
    println!("{} saved.", provider.label());
    Ok(())
}

/// Check the stored keys against their providers.
///
/// Returns `false` when any checked key was rejected.
pub async fn validate(config_dir: &Path, data_dir: &Path, only: Option<Provider>) -> Result<bool> {
    let store = CredentialStore::open(data_dir);
    let settings = load_settings(config_dir);
    let services = build_live_services(&settings)?;

    let providers: Vec<Provider> = match only {
        Some(provider) => vec![provider],
        None => Provider::ALL.to_vec(),
    };

    let mut all_valid = true;
    for provider in providers {
        let Some(key) = store.keys().require(provider) else {
            println!("{:<10} not set", provider.short_name());
            continue;
        };
        let valid = services.validator.validate(provider, key).await;
        all_valid &= valid;
        println!(
            "{:<10} {}",
            provider.short_name(),
            if valid { "valid" } else { "invalid" }
        );
    }
    Ok(all_valid)
}

fn status_lines(keys: &ApiKeys) -> Vec<String> {
    keys.status_summary()
        .into_iter()
        .map(|(provider, status)| {
            format!(
                "{:<10} {:<10} {}",
                provider.short_name(),
                status,
                provider.id()
            )
        })
        .collect()
}
