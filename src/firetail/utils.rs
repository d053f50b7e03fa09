use tracing::warn;

#[derive(Debug, thiserror::Error)]
#[error("HTTP {status_code}: {body}")]
pub struct ServerError {
    pub status_code: u16,
    pub body: String,
}

/// Pass successful responses through, turn anything else into a [`ServerError`]
/// carrying the response body verbatim.
pub async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, ServerError> {
    let status = res.status();
    if !status.is_success() {
        let body = match res.text().await {
            Ok(body) => body,
            Err(err) => {
                warn!(
                    message = "Failed to read error response body",
                    status_code = status.as_u16(),
                    error = %err,
                );
                format!("<unreadable response body: {err}>")
            }
        };
        return Err(ServerError {
            status_code: status.as_u16(),
            body,
        });
    }
    Ok(res)
}
