//! Turn git's stderr into something a user can act on.

use crate::error::{UpdateErrorKind, UpdateFailure};

/// Shown for every credential failure, whatever git actually printed.
pub const AUTH_REQUIRED_MESSAGE: &str =
    "Authentication required. Add a GitHub token with repo access to update private repositories.";

pub const NETWORK_PREFIX: &str = "Network error: ";

const AUTH_SIGNATURES: &[&str] = &[
    "authentication failed",
    "could not read username",
    "could not read password",
    "terminal prompts disabled",
    "invalid username or password",
    "permission denied (publickey)",
    "repository not found",
    "the requested url returned error: 401",
    "the requested url returned error: 403",
];

const NETWORK_SIGNATURES: &[&str] = &[
    "could not resolve host",
    "failed to connect",
    "connection timed out",
    "connection refused",
    "connection reset",
    "network is unreachable",
    "operation timed out",
    "temporary failure in name resolution",
    "ssl_connect",
    "gnutls_handshake",
];

/// Transient lines git writes while cloning or fetching.
const PROGRESS_PREFIXES: &[&str] = &[
    "cloning into",
    "enumerating objects",
    "counting objects",
    "compressing objects",
    "receiving objects",
    "resolving deltas",
    "unpacking objects",
    "updating files",
    "total ",
];

/// Drop progress output, including `\r`-rewritten lines.
pub fn strip_progress(raw: &str) -> String {
    raw.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_progress(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_progress(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    let lower = lower.strip_prefix("remote:").map(str::trim_start).unwrap_or(&lower);
    PROGRESS_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// Classify a failed clone or pull from its diagnostic output.
pub fn classify(raw: &str) -> UpdateFailure {
    let text = strip_progress(raw);
    let lower = text.to_ascii_lowercase();

    if AUTH_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        return UpdateFailure::new(UpdateErrorKind::AuthRequired, raw, AUTH_REQUIRED_MESSAGE);
    }
    if NETWORK_SIGNATURES.iter().any(|sig| lower.contains(sig)) {
        return UpdateFailure::new(
            UpdateErrorKind::NetworkError,
            raw,
            format!("{NETWORK_PREFIX}{text}"),
        );
    }
    let message = if text.is_empty() {
        "git exited with an error".to_string()
    } else {
        text
    };
    UpdateFailure::new(UpdateErrorKind::Unknown, raw, message)
}
