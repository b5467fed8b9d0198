//! Version string for `usedby --version`.

/// `usedby {version} ({commit} {date})`
pub fn version() -> String {
    format!(
        "usedby {} ({} {})",
        env!("CARGO_PKG_VERSION"),
        build_commit(),
        build_date()
    )
}

/// Commit the binary was built from, or "unknown".
pub fn build_commit() -> &'static str {
    option_env!("USEDBY_COMMIT_SHA").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("USEDBY_BUILD_DATE").unwrap_or("unknown")
}
