// crates/veritrust-config/tests/config_validation.rs
// ============================================================================
// Module: Config Validation Tests
// Description: Validate fail-closed parsing and section-level guards.
// Purpose: Ensure invalid deployments are refused before anything starts.
// Dependencies: veritrust-config, veritrust-pipeline, tempfile
// ============================================================================

//! Configuration guards exercised through TOML fixtures, from file-level
//! limits down to cross-entry webhook ambiguity.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::io::Write;

use tempfile::NamedTempFile;
use veritrust_config::ConfigError;
use veritrust_config::VeritrustConfig;
use veritrust_core::core::identifiers::QueueName;
use veritrust_pipeline::QueueTopology;

/// A 32-byte secret that passes the length guard.
const SECRET_LINE: &str = r#"secret = "0123456789abcdef0123456789abcdef""#;

/// Asserts a parse attempt fails with a message containing the needle.
fn assert_invalid(result: Result<VeritrustConfig, ConfigError>, needle: &str) -> Result<(), String> {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// Builds a minimal valid config body.
fn minimal() -> String {
    format!("[auth]\n{SECRET_LINE}\n")
}

/// A minimal config parses and fills every default.
#[test]
fn minimal_config_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let config = VeritrustConfig::from_toml(&minimal())?;
    assert_eq!(config.auth.token_ttl_minutes, 60);
    assert!(!config.auth.allow_debug_auth);
    assert_eq!(config.queues.topology(), QueueTopology::default());
    let policy = config.retry.policy();
    assert_eq!(policy.backoff_seconds(0), 15);
    assert_eq!(policy.backoff_seconds(2), 195);
    assert!(config.storage.store_config().path.ends_with("veritrust.db"));
    Ok(())
}

/// An empty file is refused: the signing secret has no default.
#[test]
fn a_missing_secret_is_refused() -> Result<(), String> {
    assert_invalid(VeritrustConfig::from_toml(""), "auth.secret")
}

/// A short secret is refused.
#[test]
fn a_short_secret_is_refused() -> Result<(), String> {
    assert_invalid(
        VeritrustConfig::from_toml("[auth]\nsecret = \"short\"\n"),
        "auth.secret must be at least",
    )
}

/// The debug override is refused without the explicit opt-in.
#[test]
fn a_debug_override_requires_the_opt_in() -> Result<(), String> {
    let body = format!(
        "[auth]\n{SECRET_LINE}\ndebug_override = {{ kind = \"learner\", id = 42 }}\n"
    );
    assert_invalid(VeritrustConfig::from_toml(&body), "allow_debug_auth")?;

    let allowed = format!(
        "[auth]\n{SECRET_LINE}\nallow_debug_auth = true\n\
         debug_override = {{ kind = \"learner\", id = 42 }}\n"
    );
    VeritrustConfig::from_toml(&allowed).map_err(|err| err.to_string())?;
    Ok(())
}

/// A refresh lifetime shorter than the access lifetime is refused.
#[test]
fn an_inverted_ttl_pair_is_refused() -> Result<(), String> {
    let body = format!(
        "[auth]\n{SECRET_LINE}\ntoken_ttl_minutes = 120\nrefresh_ttl_minutes = 60\n"
    );
    assert_invalid(VeritrustConfig::from_toml(&body), "refresh_ttl_minutes")
}

/// Queue overrides replace only the named queues.
#[test]
fn queue_overrides_replace_only_the_named_queues() -> Result<(), Box<dyn std::error::Error>> {
    let body = format!("{}[queues]\nalerts = \"ops-alerts\"\n", minimal());
    let config = VeritrustConfig::from_toml(&body)?;
    let topology = config.queues.topology();
    assert_eq!(topology.alerts, QueueName::from("ops-alerts"));
    assert_eq!(topology.enrolment, QueueTopology::default().enrolment);
    Ok(())
}

/// A queue name with whitespace is refused.
#[test]
fn a_queue_name_with_whitespace_is_refused() -> Result<(), String> {
    let body = format!("{}[queues]\nalerts = \"ops alerts\"\n", minimal());
    assert_invalid(VeritrustConfig::from_toml(&body), "queues.alerts")
}

/// A zero retry base is refused.
#[test]
fn a_zero_retry_base_is_refused() -> Result<(), String> {
    let body = format!("{}[retry]\nbase_seconds = 0\n", minimal());
    assert_invalid(VeritrustConfig::from_toml(&body), "retry.base_seconds")
}

/// Webhook seeds validate per entry and across entries.
#[test]
fn webhook_seeds_are_checked_for_ambiguity() -> Result<(), String> {
    let body = format!(
        "{}[[webhooks.clients]]\n\
         id = 1\nname = \"tpt\"\nheader = \"tesla-sign\"\n\
         secret = \"0123456789abcdef\"\nhandler = \"tpt\"\n\
         [[webhooks.clients]]\n\
         id = 2\nname = \"other\"\nheader = \"TESLA-SIGN\"\n\
         secret = \"0123456789abcdef\"\nhandler = \"signed-provider\"\n",
        minimal()
    );
    assert_invalid(VeritrustConfig::from_toml(&body), "duplicate header")
}

/// A valid webhook seed yields an uppercase-normalized store record.
#[test]
fn webhook_seeds_normalize_headers() -> Result<(), Box<dyn std::error::Error>> {
    let body = format!(
        "{}[[webhooks.clients]]\n\
         id = 1\nname = \"tpt\"\nheader = \"tesla-sign\"\n\
         id_header = \"x-notification-id\"\n\
         secret = \"0123456789abcdef\"\nhandler = \"tpt\"\n",
        minimal()
    );
    let config = VeritrustConfig::from_toml(&body)?;
    let records = config.webhooks.records()?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].header, "TESLA-SIGN");
    assert_eq!(records[0].id_header.as_deref(), Some("X-NOTIFICATION-ID"));
    assert!(records[0].enabled);
    Ok(())
}

/// A short webhook secret is refused.
#[test]
fn a_short_webhook_secret_is_refused() -> Result<(), String> {
    let body = format!(
        "{}[[webhooks.clients]]\n\
         id = 1\nname = \"tpt\"\nheader = \"TESLA-SIGN\"\n\
         secret = \"short\"\nhandler = \"tpt\"\n",
        minimal()
    );
    assert_invalid(VeritrustConfig::from_toml(&body), "secret must be at least")
}

/// Loading from disk applies the same validation as in-memory parsing.
#[test]
fn loading_from_disk_validates_the_file() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(minimal().as_bytes())?;
    let config = VeritrustConfig::load(Some(file.path()))?;
    assert_eq!(config.auth.refresh_ttl_minutes, 7 * 24 * 60);
    Ok(())
}

/// An oversized file is refused before parsing.
#[test]
fn an_oversized_file_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(&vec![b'a'; 1_048_577])?;
    let denied = VeritrustConfig::load(Some(file.path()));
    assert!(matches!(denied, Err(ConfigError::Invalid(_))));
    Ok(())
}

/// A non-UTF-8 file is refused before parsing.
#[test]
fn a_non_utf8_file_is_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(&[0xFF, 0xFE, 0xFF])?;
    let denied = VeritrustConfig::load(Some(file.path()));
    assert!(matches!(denied, Err(ConfigError::Invalid(_))));
    Ok(())
}
