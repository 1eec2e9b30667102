//! Log filter selection shared by the pulsewatch binaries.

/// Crate-specific filter variable, checked before `RUST_LOG`.
pub const LOG_ENV: &str = "PULSEWATCH_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Filter directive: `PULSEWATCH_LOG`, then `RUST_LOG`, then `info`.
pub fn filter_directive() -> String {
    select_directive(|key| std::env::var(key).ok())
}

fn select_directive(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup(LOG_ENV)
        .or_else(|| lookup("RUST_LOG"))
        .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}
