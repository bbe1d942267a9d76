use std::env;
use std::sync::Arc;
use std::time::Instant;

use allergen_scanner::api::AllergenApiClient;
use allergen_scanner::config::AppConfig;
use allergen_scanner::detector::AllergenDetector;
use allergen_scanner::errors::error_logging;
use allergen_scanner::localization::{self, LocalizationManager};
use allergen_scanner::observability;
use allergen_scanner::observability::metrics::record_startup_metrics;
use allergen_scanner::session::ScanSession;
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();
    let startup = Instant::now();

    let config = AppConfig::from_env()?;
    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "app_config", "validate");
        return Err(e.into());
    }

    let api = Arc::new(AllergenApiClient::new(&config.api)?);

    // Complete observability stack: logging, metrics, tracing, health
    // endpoints with the backend wired into the readiness probe
    observability::init_observability_with_health_checks_and_config(
        Arc::clone(&api),
        config.observability.clone(),
    )
    .await?;

    info!("{}", config.summary());

    let _health_metrics_handle =
        observability::start_health_metrics_recorder(Some(Arc::clone(&api)));

    let messages = localization::create_localization_manager()?;
    let language = messages.resolve_language(env::var("SCANNER_LANG").ok().as_deref());

    let detector = AllergenDetector::new(api.as_ref().clone(), config.detection.clone());
    let session = Arc::new(ScanSession::new(detector));

    let _session_metrics_handle = observability::start_session_metrics_recorder({
        let session = Arc::clone(&session);
        move || session.cache_stats()
    });

    record_startup_metrics(startup.elapsed());
    info!(
        elapsed_ms = startup.elapsed().as_millis() as u64,
        language = %language,
        "Startup complete"
    );

    session.start_scanning();
    println!(
        "{}",
        messages.get_message_in_language("app-started", &language, None)
    );

    // Renders each alert the way the scan screen's dialogs would, then
    // dismisses it so scanning resumes.
    let alert_task = tokio::spawn(alert_loop(
        Arc::clone(&session),
        Arc::clone(&messages),
        language.clone(),
    ));

    // Frame feed: each stdin line stands in for one OCR frame from the
    // camera collaborator. "quit" and end-of-input end the session.
    let mut frames = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = frames.next_line() => {
                match line? {
                    Some(frame) if frame.trim() == "quit" => break,
                    Some(frame) => session.detect_allergens(&frame),
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupt received, shutting down");
                break;
            }
        }
    }

    session.stop_scanning();
    println!(
        "{}",
        messages.get_message_in_language("scan-stopped", &language, None)
    );

    let stats = session.cache_stats();
    info!(
        entries = stats.entries,
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate,
        "Session cache statistics at shutdown"
    );

    alert_task.abort();
    Ok(())
}

/// Watch session state and print alert dialogs as they appear
async fn alert_loop(
    session: Arc<ScanSession>,
    messages: Arc<LocalizationManager>,
    language: String,
) {
    let mut rx = session.subscribe();
    let mut last_error: Option<String> = None;
    loop {
        if rx.changed().await.is_err() {
            return;
        }
        let state = rx.borrow_and_update().clone();

        if state.show_allergen_alert {
            let names = state
                .detected_allergens
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "\n== {} ==",
                messages.get_message_in_language("allergen-alert-title", &language, None)
            );
            println!(
                "{}",
                messages.get_message_with_args_in_language(
                    "allergen-alert",
                    &language,
                    &[("names", names.as_str())],
                )
            );
            for allergen in &state.detected_allergens {
                let severity = messages.get_message_in_language(
                    localization::severity_key(allergen.severity_level),
                    &language,
                    None,
                );
                println!(
                    "  - {}",
                    messages.get_message_with_args_in_language(
                        "allergen-alert-line",
                        &language,
                        &[
                            ("name", allergen.name.as_str()),
                            ("severity", severity.as_str()),
                        ],
                    )
                );
            }
            session.dismiss_allergen_alert();
        } else if state.show_safe_product_alert {
            println!(
                "\n== {} ==",
                messages.get_message_in_language("safe-product-title", &language, None)
            );
            println!(
                "{}",
                messages.get_message_in_language("safe-product", &language, None)
            );
            session.dismiss_safe_product_alert();
        } else if let Some(reason) = &state.error_message {
            // An error stays in state until the next successful scan;
            // only print it once.
            if last_error.as_deref() != Some(reason.as_str()) {
                println!(
                    "{}",
                    messages.get_message_with_args_in_language(
                        "scan-error",
                        &language,
                        &[("reason", reason.as_str())],
                    )
                );
                last_error = Some(reason.clone());
            }
        }
    }
}
