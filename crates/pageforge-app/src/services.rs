//! Construction of the live service clients from settings

use std::sync::Arc;

use pageforge_core::prelude::*;
use pageforge_providers::http::{build_client, build_streaming_client};
use pageforge_providers::{
    E2bOptions, E2bProvider, FirecrawlScraper, GeminiClient, KeyValidator, PlaceholderScraper,
    Scraper,
};

use crate::config::{ScrapeMode, Settings};

/// Real network clients, ready to hand to the engine.
pub struct LiveServices {
    pub generator: GeminiClient,
    pub scraper: Scraper,
    pub sandbox: Arc<E2bProvider>,
    pub validator: KeyValidator<E2bProvider>,
}

pub fn build_live_services(settings: &Settings) -> Result<LiveServices> {
    let endpoints = &settings.endpoints;
    let http = build_client(settings.network.request_timeout())?;
    let stream_http = build_streaming_client()?;

    let generator = GeminiClient::new(
        stream_http.clone(),
        endpoints.gemini.clone(),
        settings.generation.model.clone(),
    );

    let scraper = match settings.scrape.mode {
        ScrapeMode::Firecrawl => {
            Scraper::Firecrawl(FirecrawlScraper::new(http.clone(), endpoints.firecrawl.clone()))
        }
        ScrapeMode::Placeholder => Scraper::Placeholder(PlaceholderScraper),
    };

    let sandbox = Arc::new(E2bProvider::new(
        http.clone(),
        stream_http,
        E2bOptions {
            api_base: endpoints.e2b_api.clone(),
            domain: endpoints.e2b_domain.clone(),
            template: settings.sandbox.template.clone(),
            timeout_secs: settings.sandbox.session_timeout_secs,
        },
    ));

    let probe_gemini = GeminiClient::new(
        http.clone(),
        endpoints.gemini.clone(),
        settings.generation.model.clone(),
    );
    let validator = KeyValidator::new(http, endpoints.clone(), probe_gemini, sandbox.clone());

    debug!(
        "Live services built (model {}, scrape {:?})",
        settings.generation.model, settings.scrape.mode
    );

    Ok(LiveServices {
        generator,
        scraper,
        sandbox,
        validator,
    })
}
