//! Version banner
//!
//! Build metadata is injected by `build.rs`; anything it could not
//! determine reads `unknown`.

use crate::cli::Output;

pub fn banner() -> String {
    format!(
        "gitsync version {} built on {} by {} (git {} {})",
        crate::VERSION,
        option_env!("BUILD_DATE").unwrap_or("unknown"),
        option_env!("BUILD_USER").unwrap_or("unknown"),
        option_env!("GIT_SHA").unwrap_or("unknown"),
        option_env!("GIT_DATE").unwrap_or("unknown"),
    )
}

/// Execute the version command
pub fn execute(output: &Output) {
    output.plain(&banner());
}
