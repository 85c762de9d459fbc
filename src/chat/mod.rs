//! Streaming chat against the assistant backend.
//!
//! A chat is opened with [`ChatClient::open`], which yields a [`ChatStream`],
//! or with [`ChatClient::start_chat`], which drives a [`ChatListener`] from a
//! background task. Either way the transport is chosen by message length and
//! the caller gets a [`StreamHandle`] to cancel it.

mod error;
mod post;
mod push;
mod types;

pub use error::ChatError;
pub use types::{ChatEvent, ChatRequest, TransportKind, DEFAULT_PUSH_THRESHOLD};

use crate::api::{ApiClient, AGNO_PREFIX};
use futures_core::Stream;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::thread::{self, ThreadId};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

pub type ChatItem = Result<ChatEvent, ChatError>;

pub(crate) fn stream_path(conversation_id: u64) -> String {
    format!("{AGNO_PREFIX}/conversations/{conversation_id}/chat/stream")
}

/// Receives the outcome of a chat started with [`ChatClient::start_chat`].
///
/// `on_message` calls always precede the single terminal call, which is either
/// `on_complete` or `on_error` with a terminal error. Decode errors from the
/// push transport also arrive through `on_error` but do not end the chat.
pub trait ChatListener: Send + 'static {
    fn on_message(&mut self, event: ChatEvent);
    fn on_complete(&mut self);
    fn on_error(&mut self, error: ChatError);
}

pub struct FnListener<M, C, E> {
    on_message: M,
    on_complete: C,
    on_error: E,
}

/// Build a [`ChatListener`] out of three closures.
pub fn listener_fn<M, C, E>(on_message: M, on_complete: C, on_error: E) -> FnListener<M, C, E>
where
    M: FnMut(ChatEvent) + Send + 'static,
    C: FnMut() + Send + 'static,
    E: FnMut(ChatError) + Send + 'static,
{
    FnListener {
        on_message,
        on_complete,
        on_error,
    }
}

impl<M, C, E> ChatListener for FnListener<M, C, E>
where
    M: FnMut(ChatEvent) + Send + 'static,
    C: FnMut() + Send + 'static,
    E: FnMut(ChatError) + Send + 'static,
{
    fn on_message(&mut self, event: ChatEvent) {
        (self.on_message)(event)
    }

    fn on_complete(&mut self) {
        (self.on_complete)()
    }

    fn on_error(&mut self, error: ChatError) {
        (self.on_error)(error)
    }
}

#[derive(Debug)]
struct Shared {
    transport: TransportKind,
    cancel: CancellationToken,
    dispatch: Dispatch,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The listener of a callback-form chat.
///
/// Every callback runs with `listener` locked and only after checking the
/// cancellation token under that lock, so a `close` that takes the listener
/// out waits for the callback in flight and no callback starts afterwards.
#[derive(Default)]
struct Dispatch {
    listener: Mutex<Option<Box<dyn ChatListener>>>,
    // Thread running a callback right now. A `close` from inside a callback
    // must not wait on the lock its own caller holds.
    running_on: Mutex<Option<ThreadId>>,
}

impl Dispatch {
    fn attach(&self, listener: Box<dyn ChatListener>) {
        *lock(&self.listener) = Some(listener);
    }

    /// Run `f` on the listener unless the chat was closed. A `last` call
    /// releases the listener afterwards. Returns false when nothing ran.
    fn deliver(&self, cancel: &CancellationToken, last: bool, f: impl FnOnce(&mut dyn ChatListener)) -> bool {
        *lock(&self.running_on) = Some(thread::current().id());
        let ran = {
            let mut slot = lock(&self.listener);
            match slot.as_mut() {
                Some(listener) if !cancel.is_cancelled() => {
                    f(&mut **listener);
                    if last {
                        *slot = None;
                    }
                    true
                }
                _ => false,
            }
        };
        *lock(&self.running_on) = None;
        ran
    }

    fn detach(&self) {
        if *lock(&self.running_on) == Some(thread::current().id()) {
            // Re-entered from a callback; the pump sees the cancellation and
            // releases the listener once that callback returns.
            return;
        }
        let listener = lock(&self.listener).take();
        drop(listener);
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatch").finish_non_exhaustive()
    }
}

/// Cancellation handle for one chat. Clones refer to the same chat.
#[derive(Debug, Clone)]
pub struct StreamHandle {
    shared: Option<Arc<Shared>>,
}

impl StreamHandle {
    fn new(transport: TransportKind, cancel: CancellationToken) -> Self {
        Self {
            shared: Some(Arc::new(Shared {
                transport,
                cancel,
                dispatch: Dispatch::default(),
            })),
        }
    }

    /// Handle for a chat that never started; `close` does nothing.
    pub fn noop() -> Self {
        Self { shared: None }
    }

    /// Abort the transport and detach the listener.
    ///
    /// A callback running on another thread is waited for; once this returns
    /// no callback is running and none will start. Called from inside a
    /// callback it returns immediately and that callback is the last one.
    /// Calling it again, or after the chat finished, has no effect.
    pub fn close(&self) {
        let Some(shared) = &self.shared else {
            return;
        };
        if !shared.cancel.is_cancelled() {
            tracing::debug!(transport = ?shared.transport, "closing chat stream");
            shared.cancel.cancel();
        }
        shared.dispatch.detach();
    }

    /// Transport picked for this chat, `None` for a no-op handle.
    pub fn transport(&self) -> Option<TransportKind> {
        self.shared.as_ref().map(|s| s.transport)
    }

    /// True once the transport has been released, either by [`close`](Self::close)
    /// or because the stream that owned it was dropped.
    pub fn is_closed(&self) -> bool {
        self.shared.as_ref().map_or(true, |s| s.cancel.is_cancelled())
    }

    fn cancel_token(&self) -> Option<&CancellationToken> {
        self.shared.as_ref().map(|s| &s.cancel)
    }
}

/// The chat as an async sequence of records.
///
/// Ends after the done record, at the end of the response body, after a
/// terminal error, or once the handle is closed. Dropping it closes the
/// transport.
pub struct ChatStream {
    inner: ReceiverStream<ChatItem>,
    handle: StreamHandle,
}

impl ChatStream {
    pub fn handle(&self) -> StreamHandle {
        self.handle.clone()
    }

    pub fn transport(&self) -> TransportKind {
        self.handle.transport().unwrap_or(TransportKind::Push)
    }
}

impl Stream for ChatStream {
    type Item = ChatItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.handle.is_closed() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        if let Some(cancel) = self.handle.cancel_token() {
            cancel.cancel();
        }
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream").field("handle", &self.handle).finish()
    }
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    api: ApiClient,
    push_threshold: usize,
}

impl ChatClient {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            push_threshold: DEFAULT_PUSH_THRESHOLD,
        }
    }

    pub fn with_push_threshold(mut self, push_threshold: usize) -> Self {
        self.push_threshold = push_threshold;
        self
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Validate the request, pick a transport and start it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, request: ChatRequest) -> Result<ChatStream, ChatError> {
        let Some(conversation_id) = request.conversation() else {
            tracing::warn!(conversation_id = ?request.conversation_id, "refusing chat without a conversation");
            return Err(ChatError::InvalidConversation);
        };
        let content = request.content().to_string();
        let transport = TransportKind::select(&content, self.push_threshold);
        tracing::debug!(conversation_id, ?transport, "starting chat stream");

        let (tx, rx) = mpsc::channel::<ChatItem>(64);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let api = self.api.clone();

        tokio::spawn(async move {
            let run = async move {
                match transport {
                    TransportKind::Push => push::run(api, conversation_id, content, tx).await,
                    TransportKind::ChunkedPost => post::run(api, conversation_id, content, tx).await,
                }
            };

            // Dropping the transport future drops the in-flight request.
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(conversation_id, "chat stream cancelled");
                }
                _ = run => {}
            }
        });

        Ok(ChatStream {
            inner: ReceiverStream::new(rx),
            handle: StreamHandle::new(transport, cancel),
        })
    }

    /// Callback form of [`open`](Self::open).
    ///
    /// An invalid conversation id is reported to `listener.on_error` before
    /// this returns and yields a no-op handle.
    pub fn start_chat<L: ChatListener>(&self, request: ChatRequest, mut listener: L) -> StreamHandle {
        match self.open(request) {
            Ok(stream) => {
                let handle = stream.handle();
                if let Some(shared) = &handle.shared {
                    shared.dispatch.attach(Box::new(listener));
                }
                tokio::spawn(pump(stream));
                handle
            }
            Err(e) => {
                listener.on_error(e);
                StreamHandle::noop()
            }
        }
    }
}

async fn pump(mut stream: ChatStream) {
    let Some(shared) = stream.handle.shared.clone() else {
        return;
    };
    let cancel = &shared.cancel;
    let dispatch = &shared.dispatch;

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            item = stream.next() => item,
        };

        let ran = match item {
            Some(Ok(event)) => dispatch.deliver(cancel, false, |l| l.on_message(event)),
            Some(Err(e)) if e.is_terminal() => {
                dispatch.deliver(cancel, true, |l| l.on_error(e));
                break;
            }
            Some(Err(e)) => dispatch.deliver(cancel, false, |l| l.on_error(e)),
            None => {
                dispatch.deliver(cancel, true, |l| l.on_complete());
                break;
            }
        };
        if !ran {
            break;
        }
    }

    dispatch.detach();
}
