use crate::config::ExtensionsConfig;
use crate::errors::DomainResult;
use crate::validation::Validate;
use lazy_static::lazy_static;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

// Global state definitions
lazy_static! {
    static ref LOGGING_INITIALIZED: AtomicBool = AtomicBool::new(false);
    static ref DEFAULT_CONFIG: RwLock<ExtensionsConfig> = RwLock::new(ExtensionsConfig::default());
}

/// Install env_logger once. Later calls are no-ops.
pub fn init_logging() {
    if LOGGING_INITIALIZED.swap(true, Ordering::AcqRel) {
        return;
    }

    if std::env::var("RUST_LOG").is_err() {
        #[cfg(debug_assertions)]
        std::env::set_var("RUST_LOG", "debug");
        #[cfg(not(debug_assertions))]
        std::env::set_var("RUST_LOG", "info");
    }

    // Another logger may already be installed by the host application
    let _ = env_logger::try_init();
    log::debug!("Logging initialized");
}

/// Initialize logging and the process-wide default config from the environment
pub fn initialize() -> DomainResult<ExtensionsConfig> {
    init_logging();
    let config = ExtensionsConfig::from_env()?;
    set_default_config(config.clone())?;
    log::info!(
        "Table extensions initialized (page_size={}, batch_size={}, policy={:?})",
        config.page_size,
        config.batch_size,
        config.import_error_policy
    );
    Ok(config)
}

/// Replace the config used by wrappers built without an explicit one
pub fn set_default_config(config: ExtensionsConfig) -> DomainResult<()> {
    config.validate()?;
    match DEFAULT_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
    Ok(())
}

pub fn default_config() -> ExtensionsConfig {
    match DEFAULT_CONFIG.read() {
        Ok(guard) => guard.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
