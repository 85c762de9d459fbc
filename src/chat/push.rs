use super::{stream_path, ChatError, ChatEvent, ChatItem};
use crate::api::ApiClient;
use crate::sse::SseParser;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use reqwest::Method;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

/// GET transport: the message rides in the query string and the answer comes
/// back as server-sent events whose `data` field holds one JSON record.
pub(super) async fn run(api: ApiClient, conversation_id: u64, content: String, tx: mpsc::Sender<ChatItem>) {
    if let Err(e) = stream(&api, conversation_id, &content, &tx).await {
        tracing::error!(conversation_id, error = %e, "push chat stream failed");
        let _ = tx.send(Err(e)).await;
    }
}

async fn stream(
    api: &ApiClient,
    conversation_id: u64,
    content: &str,
    tx: &mpsc::Sender<ChatItem>,
) -> Result<(), ChatError> {
    let mut url = api.endpoint(&stream_path(conversation_id))?;
    url.query_pairs_mut().append_pair("content", content);
    tracing::debug!(%url, "opening event stream");

    let resp = api
        .request(Method::GET, url)
        .header(ACCEPT, "text/event-stream")
        .header(CACHE_CONTROL, "no-cache")
        .send()
        .await
        .map_err(ChatError::Connect)?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ChatError::Status { status, body });
    }

    let mut body = resp.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(ChatError::Read)?;

        for ev in parser.push(&chunk) {
            if !ev.is_message() {
                continue;
            }

            match ChatEvent::from_json(&ev.data) {
                Ok(event) => {
                    let done = event.is_done();
                    if tx.send(Ok(event)).await.is_err() || done {
                        return Ok(());
                    }
                }
                Err(source) => {
                    tracing::warn!(error = %source, data = %ev.data, "undecodable event");
                    let err = ChatError::Decode { line: ev.data, source };
                    if tx.send(Err(err)).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    // The server hung up without a done record.
    Err(ChatError::Disconnected)
}
