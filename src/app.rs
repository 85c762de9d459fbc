use crate::api::{ApiClient, ConversationQuery, NewConversation};
use crate::chat::{ChatClient, ChatError, ChatRequest};
use crate::config::Settings;
use crate::notify::Notifier;
use crate::auth;
use anyhow::Context;
use std::io::Write;
use tokio_stream::StreamExt;

/// API client for `settings`, falling back to the cached login token when no
/// token was configured.
pub fn build_api(http: &reqwest::Client, settings: &Settings) -> anyhow::Result<ApiClient> {
    let token = match settings.token.clone() {
        Some(t) => Some(t),
        None => {
            let path = auth::token_path()?;
            match auth::load_token(&path)? {
                Some(tok) if tok.issued_by(&settings.base_url) => Some(tok.access_token),
                Some(_) => {
                    tracing::debug!(path = %path.display(), "cached token belongs to another backend");
                    None
                }
                None => None,
            }
        }
    };

    Ok(ApiClient::new(http.clone(), settings.base_url.clone()).with_token(token))
}

pub async fn cmd_login(api: &ApiClient, username: &str, password: Option<String>, notify: &Notifier) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };

    let tok = auth::login(api, username, &password).await?;
    let path = auth::token_path()?;
    auth::save_token_atomic(&path, &tok)?;

    notify.success("Login", format!("Saved token to: {}", path.display()));
    Ok(())
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush().ok();
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn cmd_conversations(api: &ApiClient, query: ConversationQuery) -> anyhow::Result<()> {
    let page = api
        .list_conversations(&query)
        .await
        .context("failed to list conversations")?;

    if page.items.is_empty() {
        println!("(no conversations)");
        return Ok(());
    }
    for c in &page.items {
        println!(
            "{}\tassistant={}\t{}",
            c.id,
            c.assistant_id,
            c.title.as_deref().unwrap_or("(untitled)")
        );
    }
    println!("-- page {} ({} per page), {} total", page.page, page.page_size, page.total);
    Ok(())
}

pub async fn cmd_new(api: &ApiClient, new: NewConversation, notify: &Notifier) -> anyhow::Result<()> {
    let conv = api
        .create_conversation(&new)
        .await
        .context("failed to create conversation")?;
    notify.success("Conversation", format!("created conversation {}", conv.id));
    println!("{}", conv.id);
    Ok(())
}

pub async fn cmd_rename(api: &ApiClient, conversation_id: u64, title: &str, notify: &Notifier) -> anyhow::Result<()> {
    let conv = api
        .update_conversation(conversation_id, title)
        .await
        .context("failed to rename conversation")?;
    notify.success("Conversation", format!("renamed conversation {}", conv.id));
    Ok(())
}

pub async fn cmd_delete(api: &ApiClient, conversation_id: u64, notify: &Notifier) -> anyhow::Result<()> {
    api.delete_conversation(conversation_id)
        .await
        .context("failed to delete conversation")?;
    notify.success("Conversation", format!("deleted conversation {conversation_id}"));
    Ok(())
}

pub async fn cmd_messages(api: &ApiClient, conversation_id: u64) -> anyhow::Result<()> {
    let messages = api
        .conversation_messages(conversation_id)
        .await
        .context("failed to fetch messages")?;
    for m in messages {
        println!("[{}] {}", m.role, m.content);
    }
    Ok(())
}

pub async fn cmd_send(api: &ApiClient, conversation_id: u64, content: &str) -> anyhow::Result<()> {
    let reply = api
        .send_message(conversation_id, content)
        .await
        .context("failed to send message")?;
    match reply.get("response").and_then(|v| v.as_str()) {
        Some(text) => println!("{text}"),
        None => println!("{}", serde_json::to_string_pretty(&reply)?),
    }
    Ok(())
}

/// Stream one answer to stdout. Ctrl-C closes the stream.
pub async fn cmd_chat(chat: &ChatClient, request: ChatRequest, raw: bool, notify: &Notifier) -> anyhow::Result<()> {
    let mut stream = match chat.open(request) {
        Ok(s) => s,
        Err(e @ ChatError::InvalidConversation) => {
            notify.error("Chat", e.to_string());
            anyhow::bail!("a conversation id is required (use --conversation or `agno-chat new`)");
        }
        Err(e) => return Err(e).context("failed to start chat"),
    };
    tracing::debug!(transport = ?stream.transport(), "chat started");

    let handle = stream.handle();
    let mut out = std::io::stdout();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let item = tokio::select! {
            item = stream.next() => item,
            _ = &mut ctrl_c => {
                handle.close();
                notify.warning("Chat", "stream closed");
                break;
            }
        };

        match item {
            Some(Ok(event)) => {
                if raw {
                    writeln!(out, "{}", event.raw())?;
                } else if let Some(text) = event.content() {
                    write!(out, "{text}")?;
                }
                out.flush().ok();
            }
            Some(Err(e)) if e.is_terminal() => {
                notify.error("Chat", e.to_string());
                return Err(e).context("chat stream failed");
            }
            Some(Err(e)) => notify.warning("Chat", e.to_string()),
            None => break,
        }
    }
    if !raw {
        writeln!(out)?;
    }

    Ok(())
}
