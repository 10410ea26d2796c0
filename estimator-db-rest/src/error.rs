use estimator_core::RepositoryError;
use reqwest::StatusCode;
use serde::Deserialize;

/// PostgREST error body.
#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

const PERMISSION_CODES: &[&str] = &["42501"];
const MISSING_TABLE_CODES: &[&str] = &["42P01", "PGRST205"];

/// Sorts a failed response into permission, missing-table or generic
/// database errors.
pub fn classify(
    status: StatusCode,
    body: &str,
    table: &str,
) -> RepositoryError {
    let api: ApiError = serde_json::from_str(body).unwrap_or_default();
    let code = api.code.as_deref().unwrap_or_default();
    let message = api
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });
    let lowered = message.to_lowercase();

    if PERMISSION_CODES.contains(&code)
        || lowered.contains("policy")
        || lowered.contains("permission")
        || lowered.contains("row-level security")
        || status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
    {
        return RepositoryError::PermissionDenied(message);
    }

    if MISSING_TABLE_CODES.contains(&code)
        || status == StatusCode::NOT_FOUND
        || (lowered.contains("relation") && lowered.contains("does not exist"))
    {
        return RepositoryError::MissingTable(table.to_string());
    }

    match api.hint {
        Some(hint) if !hint.is_empty() => {
            RepositoryError::Database(format!("{message} ({hint})"))
        }
        _ => RepositoryError::Database(message),
    }
}

/// Maps errors raised before a status code was seen, or while reading the
/// body. Refused connections and timeouts are `Connection`; a URL the client
/// cannot even build a request for is `Configuration`.
pub(crate) fn transport(err: reqwest::Error) -> RepositoryError {
    if err.is_decode() {
        RepositoryError::Database(format!("unexpected response: {err}"))
    } else if err.is_builder() {
        RepositoryError::Configuration(format!("invalid request: {err}"))
    } else {
        RepositoryError::Connection(err.to_string())
    }
}
