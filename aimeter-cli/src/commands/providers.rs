//! Providers command - list providers and their login state.

use aimeter_core::UsageProvider;
use aimeter_providers::ProviderRegistry;
use aimeter_store::SettingsStore;
use anyhow::Result;
use tracing::info;

use crate::output::{JsonFormatter, ProviderInfoOutput, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the providers command.
pub async fn run(cli: &Cli, store: &SettingsStore) -> Result<ExitCode> {
    info!("Listing providers");

    let enabled = store.enabled_providers().await;

    // Credential lookups may hit the keychain.
    let providers = tokio::task::spawn_blocking(|| {
        ProviderRegistry::all()
            .into_iter()
            .map(|provider| (provider.kind(), provider.is_available()))
            .collect::<Vec<_>>()
    })
    .await?;

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());

            println!("{}", formatter.format_providers_header());
            for (kind, logged_in) in &providers {
                println!(
                    "{}",
                    formatter.format_provider_line(*kind, enabled.contains(kind), *logged_in)
                );
            }

            println!();
            println!(
                "Total: {} providers ({} enabled)",
                providers.len(),
                providers.iter().filter(|(kind, _)| enabled.contains(kind)).count()
            );
        }
        OutputFormat::Json => {
            let output: Vec<ProviderInfoOutput> = providers
                .iter()
                .map(|(kind, logged_in)| {
                    ProviderInfoOutput::new(*kind, enabled.contains(kind), *logged_in)
                })
                .collect();
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(ExitCode::Success)
}
