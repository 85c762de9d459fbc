use super::{stream_path, ChatError, ChatEvent, ChatItem};
use crate::api::ApiClient;
use crate::ndjson::LineDecoder;
use reqwest::Method;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

#[derive(Debug, Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

enum Flow {
    Continue,
    Stop,
}

/// POST transport for long messages. The response body is newline-delimited
/// JSON; undecodable lines are logged and skipped.
pub(super) async fn run(api: ApiClient, conversation_id: u64, content: String, tx: mpsc::Sender<ChatItem>) {
    if let Err(e) = stream(&api, conversation_id, &content, &tx).await {
        tracing::error!(conversation_id, error = %e, "chunked chat stream failed");
        let _ = tx.send(Err(e)).await;
    }
}

async fn stream(
    api: &ApiClient,
    conversation_id: u64,
    content: &str,
    tx: &mpsc::Sender<ChatItem>,
) -> Result<(), ChatError> {
    let url = api.endpoint(&stream_path(conversation_id))?;
    tracing::debug!(%url, len = content.len(), "posting chat message");

    let resp = api
        .request(Method::POST, url)
        .json(&ContentBody { content })
        .send()
        .await
        .map_err(ChatError::Connect)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ChatError::Status { status, body });
    }

    let mut body = resp.bytes_stream();
    let mut lines = LineDecoder::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(ChatError::Read)?;
        for line in lines.push(&chunk) {
            if let Flow::Stop = forward(&line, tx).await {
                return Ok(());
            }
        }
    }

    if let Some(line) = lines.finish() {
        forward(&line, tx).await;
    }
    Ok(())
}

async fn forward(line: &str, tx: &mpsc::Sender<ChatItem>) -> Flow {
    match ChatEvent::from_json(line) {
        Ok(event) => {
            let done = event.is_done();
            if tx.send(Ok(event)).await.is_err() || done {
                Flow::Stop
            } else {
                Flow::Continue
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, line, "skipping undecodable chat line");
            Flow::Continue
        }
    }
}
