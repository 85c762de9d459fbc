use agno_chat::api::{ConversationQuery, NewConversation};
use agno_chat::chat::{ChatClient, ChatRequest};
use agno_chat::config::{self, Config, Settings};
use agno_chat::notify::{Notifier, TracingSink};
use agno_chat::{app, cli};
use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();

    let config_path = config::config_path()?;
    let cfg = Config::load_optional(&config_path)?;
    let settings = Settings::from_env(cfg.as_ref(), args.base_url.clone());
    tracing::debug!(?config_path, ?cfg, base_url = %settings.base_url, "resolved config");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let notify = Notifier::setup(TracingSink);
    let api = app::build_api(&http, &settings)?;

    match args.cmd {
        Some(cli::Command::Login { username, password }) => {
            return app::cmd_login(&api, &username, password, &notify).await;
        }
        Some(cli::Command::Conversations {
            assistant,
            page,
            page_size,
        }) => {
            let query = ConversationQuery {
                assistant_id: assistant,
                page,
                page_size,
            };
            return app::cmd_conversations(&api, query).await;
        }
        Some(cli::Command::New { assistant, title }) => {
            let new = NewConversation {
                assistant_id: assistant,
                title,
            };
            return app::cmd_new(&api, new, &notify).await;
        }
        Some(cli::Command::Rename { conversation, title }) => {
            return app::cmd_rename(&api, conversation, &title, &notify).await;
        }
        Some(cli::Command::Delete { conversation }) => {
            return app::cmd_delete(&api, conversation, &notify).await;
        }
        Some(cli::Command::Messages { conversation }) => {
            return app::cmd_messages(&api, conversation).await;
        }
        Some(cli::Command::Send { conversation, message }) => {
            let content = message.join(" ");
            if content.trim().is_empty() {
                anyhow::bail!("No message provided.");
            }
            return app::cmd_send(&api, conversation, &content).await;
        }
        None => {}
    }

    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("No message provided. Try: agno-chat -c 1 \"Hello\"");
    }

    let chat = ChatClient::new(api).with_push_threshold(settings.push_threshold);
    let request = ChatRequest {
        conversation_id: args.conversation,
        content: Some(prompt),
    };

    app::cmd_chat(&chat, request, args.raw, &notify).await
}
