//! Configuration: constants and the model alias table.

pub mod constants;
pub mod models;

use constants::env;

/// Resolves a custom base URL for a model: explicit flag first, then the
/// per-model environment override, then the global one.
pub fn resolve_custom_url(model: &str, flag: Option<&str>) -> Option<String> {
    if let Some(url) = flag {
        if !url.is_empty() {
            return Some(url.to_string());
        }
    }
    let key = format!(
        "{}{}{}",
        env::MODEL_URL_PREFIX,
        model.to_uppercase().replace(['-', '.'], "_"),
        env::MODEL_URL_SUFFIX
    );
    if let Ok(url) = std::env::var(&key) {
        if !url.is_empty() {
            return Some(url);
        }
    }
    match std::env::var(env::CUSTOM_URL) {
        Ok(url) if !url.is_empty() => Some(url),
        _ => None,
    }
}

/// True when native tool calling is disabled and the action-parsing fallback
/// should be used instead.
pub fn tools_disabled() -> bool {
    matches!(std::env::var(env::DISABLE_TOOLS), Ok(v) if v == "1" || v.eq_ignore_ascii_case("true"))
}
