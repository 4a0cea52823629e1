/// Posts a lifecycle or status message to the notification webhook. Absent a
/// configured URL (`DISCORD_WEBHOOK_URL` unset), the message is logged instead of
/// sent — notifications are disabled, not fatal.
pub async fn notify(client: &reqwest::Client, webhook_url: Option<&str>, text: &str) {
    let Some(url) = webhook_url else {
        tracing::info!(message = text, "no webhook configured; would have posted");
        return;
    };

    let body = serde_json::json!({ "content": text });
    match client.post(url).json(&body).send().await {
        Ok(resp) if resp.status().is_success() => {
            tracing::debug!(message = text, "posted webhook notification");
        }
        Ok(resp) => {
            tracing::warn!(status = %resp.status(), message = text, "webhook returned non-success status");
        }
        Err(err) => {
            tracing::warn!(error = %err, message = text, "failed to post webhook notification");
        }
    }
}
