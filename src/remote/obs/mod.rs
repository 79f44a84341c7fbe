//! obs-websocket v5 client.
//!
//! One socket carries requests, batch requests and events. A writer task
//! drains an outgoing queue and a reader task routes responses to waiting
//! callers by request id and publishes events on a broadcast channel.
mod auth;
mod codec;
mod protocol;


use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{RemoteError, RemoteResult};

use super::{RemoteControl, RemoteEvent, RemoteRequest, RemoteResponse};
use protocol::{
    BATCH_EXECUTION_SERIAL_REALTIME, BatchItem, BatchRequestMessage, BatchResponseMessage,
    EVENT_SUBSCRIPTIONS, EventMessage, Frame, HelloMessage, IdentifiedMessage, IdentifyMessage,
    OP_EVENT, OP_HELLO, OP_IDENTIFIED, OP_IDENTIFY, OP_REQUEST, OP_REQUEST_BATCH,
    OP_REQUEST_BATCH_RESPONSE, OP_REQUEST_RESPONSE, RPC_VERSION, RequestMessage, ResponseMessage,
};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Event fan-out capacity; slow subscribers past this point observe a lag.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ObsConnectOptions {
    pub url: String,
    pub password: Option<String>,
    pub request_timeout: Duration,
    pub handshake_timeout: Duration,
}

impl ObsConnectOptions {
    #[must_use]
    pub const fn new(url: String, password: Option<String>) -> Self {
        Self {
            url,
            password,
            request_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(10),
        }
    }
}

enum Reply {
    Single(ResponseMessage),
    Batch(Vec<ResponseMessage>),
}

struct Shared {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Mutex<HashMap<String, oneshot::Sender<Reply>>>,
    next_request_id: AtomicU64,
    events: broadcast::Sender<RemoteEvent>,
    connected: watch::Sender<bool>,
    request_timeout: Duration,
}

impl Shared {
    fn register(&self) -> (String, oneshot::Receiver<Reply>) {
        let id = self
            .next_request_id
            .fetch_add(1, Ordering::Relaxed)
            .to_string();
        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id.clone(), tx);
        }
        (id, rx)
    }

    fn forget(&self, id: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(id);
        }
    }

    fn complete(&self, id: &str, reply: Reply) {
        let waiter = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.remove(id));
        match waiter {
            Some(waiter) => {
                if waiter.send(reply).is_err() {
                    debug!("Caller for request {} went away", id);
                }
            }
            None => debug!("Response for unknown request {}", id),
        }
    }

    fn disconnect(&self) {
        self.connected.send_replace(false);
        if let Ok(mut pending) = self.pending.lock() {
            pending.clear();
        }
    }

    async fn send_frame(
        &self,
        id: &str,
        op: u8,
        payload: serde_json::Value,
        rx: oneshot::Receiver<Reply>,
        request_type: &'static str,
    ) -> RemoteResult<Reply> {
        let text = serde_json::to_string(&Frame { op, d: payload }).map_err(|err| {
            self.forget(id);
            RemoteError::Encode {
                context: request_type,
                source: err,
            }
        })?;
        if self.outgoing.send(Message::Text(text)).is_err() {
            self.forget(id);
            return Err(RemoteError::ConnectionClosed);
        }
        match timeout(self.request_timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_closed)) => Err(RemoteError::ConnectionClosed),
            Err(_elapsed) => {
                self.forget(id);
                Err(RemoteError::Timeout { request_type })
            }
        }
    }
}

/// Connected obs-websocket session.
pub struct ObsClient {
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl ObsClient {
    /// Opens the socket and completes the Hello/Identify handshake.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is invalid, the socket cannot be
    /// opened, the handshake times out, or authentication is required but
    /// no password was configured.
    pub async fn connect(options: &ObsConnectOptions) -> RemoteResult<Self> {
        let url = Url::parse(&options.url).map_err(|err| RemoteError::InvalidUrl {
            url: options.url.clone(),
            source: err,
        })?;

        info!("Connecting to mixer {}", url);
        let (socket, _) = timeout(options.handshake_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_elapsed| RemoteError::HandshakeTimeout { stage: "connect" })?
            .map_err(|err| RemoteError::Connect {
                url: url.to_string(),
                source: Box::new(err),
            })?;

        let (mut sink, mut stream) = socket.split();
        let negotiated = timeout(
            options.handshake_timeout,
            identify(&mut sink, &mut stream, options.password.as_deref()),
        )
        .await
        .map_err(|_elapsed| RemoteError::HandshakeTimeout { stage: "identify" })??;
        info!("Identified with mixer (rpc version {})", negotiated);

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel::<Message>();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (connected, _) = watch::channel(true);
        let shared = Arc::new(Shared {
            outgoing,
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(1),
            events,
            connected,
            request_timeout: options.request_timeout,
        });

        let writer = tokio::spawn(run_writer(sink, outgoing_rx));
        let reader = tokio::spawn(run_reader(stream, Arc::clone(&shared)));

        Ok(Self {
            shared,
            reader,
            writer,
        })
    }

    /// Closes the session. In-flight requests fail with `ConnectionClosed`.
    pub fn close(&self) {
        if self.shared.outgoing.send(Message::Close(None)).is_err() {
            debug!("Writer already stopped");
        }
        self.shared.disconnect();
    }
}

impl Drop for ObsClient {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
        self.shared.disconnect();
    }
}

#[async_trait]
impl RemoteControl for ObsClient {
    async fn call(&self, request: RemoteRequest) -> RemoteResult<RemoteResponse> {
        let request_type = request.request_type();
        let (id, rx) = self.shared.register();
        let payload = serde_json::to_value(RequestMessage {
            request_type,
            request_id: &id,
            request_data: codec::request_data(&request),
        })
        .map_err(|err| RemoteError::Encode {
            context: request_type,
            source: err,
        })?;
        debug!("-> {} ({})", request_type, id);
        match self
            .shared
            .send_frame(&id, OP_REQUEST, payload, rx, request_type)
            .await?
        {
            Reply::Single(message) => codec::decode_response(&request, message),
            Reply::Batch(_) => Err(RemoteError::UnexpectedResponse { request_type }),
        }
    }

    async fn call_batch(
        &self,
        requests: Vec<RemoteRequest>,
    ) -> RemoteResult<Vec<RemoteResult<RemoteResponse>>> {
        const BATCH: &str = "RequestBatch";
        let (id, rx) = self.shared.register();
        let items = requests
            .iter()
            .map(|request| BatchItem {
                request_type: request.request_type(),
                request_data: codec::request_data(request),
            })
            .collect();
        let payload = serde_json::to_value(BatchRequestMessage {
            request_id: &id,
            halt_on_failure: false,
            execution_type: BATCH_EXECUTION_SERIAL_REALTIME,
            requests: items,
        })
        .map_err(|err| RemoteError::Encode {
            context: BATCH,
            source: err,
        })?;
        debug!("-> batch of {} ({})", requests.len(), id);
        let results = match self
            .shared
            .send_frame(&id, OP_REQUEST_BATCH, payload, rx, BATCH)
            .await?
        {
            Reply::Batch(results) => results,
            Reply::Single(_) => {
                return Err(RemoteError::UnexpectedResponse {
                    request_type: BATCH,
                });
            }
        };
        if results.len() != requests.len() {
            return Err(RemoteError::BatchLength {
                expected: requests.len(),
                actual: results.len(),
            });
        }
        Ok(requests
            .iter()
            .zip(results)
            .map(|(request, message)| codec::decode_response(request, message))
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.shared.events.subscribe()
    }

    fn connection(&self) -> watch::Receiver<bool> {
        self.shared.connected.subscribe()
    }
}

async fn identify(
    sink: &mut SplitSink<Socket, Message>,
    stream: &mut SplitStream<Socket>,
    password: Option<&str>,
) -> RemoteResult<u32> {
    let hello: HelloMessage = read_op(stream, OP_HELLO, "Hello").await?;
    debug!(
        "Mixer hello: obs-websocket {}",
        hello.obs_web_socket_version.as_deref().unwrap_or("unknown")
    );
    let authentication = match (hello.authentication, password) {
        (Some(challenge), Some(password)) => Some(auth::authentication_string(
            password,
            &challenge.salt,
            &challenge.challenge,
        )),
        (Some(_), None) => return Err(RemoteError::AuthenticationRequired),
        (None, _) => None,
    };
    let identify = IdentifyMessage {
        rpc_version: RPC_VERSION.min(hello.rpc_version),
        authentication,
        event_subscriptions: EVENT_SUBSCRIPTIONS,
    };
    let payload = serde_json::to_value(identify).map_err(|err| RemoteError::Encode {
        context: "Identify",
        source: err,
    })?;
    let text = serde_json::to_string(&Frame {
        op: OP_IDENTIFY,
        d: payload,
    })
    .map_err(|err| RemoteError::Encode {
        context: "Identify",
        source: err,
    })?;
    sink.send(Message::Text(text))
        .await
        .map_err(|err| RemoteError::Socket {
            context: "identify",
            source: Box::new(err),
        })?;
    let identified: IdentifiedMessage = read_op(stream, OP_IDENTIFIED, "Identified").await?;
    Ok(identified.negotiated_rpc_version)
}

async fn read_op<T>(
    stream: &mut SplitStream<Socket>,
    op: u8,
    expected: &'static str,
) -> RemoteResult<T>
where
    T: DeserializeOwned,
{
    loop {
        let message = match stream.next().await {
            Some(Ok(message)) => message,
            Some(Err(err)) => {
                return Err(RemoteError::Socket {
                    context: "handshake",
                    source: Box::new(err),
                });
            }
            None => return Err(RemoteError::ConnectionClosed),
        };
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => return Err(RemoteError::ConnectionClosed),
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {
                continue;
            }
        };
        let frame: Frame = serde_json::from_str(&text).map_err(|err| RemoteError::Decode {
            context: expected,
            source: err,
        })?;
        if frame.op != op {
            return Err(RemoteError::UnexpectedHandshake { expected });
        }
        return serde_json::from_value(frame.d).map_err(|err| RemoteError::Decode {
            context: expected,
            source: err,
        });
    }
}

async fn run_writer(
    mut sink: SplitSink<Socket, Message>,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = outgoing.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(err) = sink.send(message).await {
            warn!("Failed to send to mixer: {}", err);
            break;
        }
        if closing {
            break;
        }
    }
}

async fn run_reader(mut stream: SplitStream<Socket>, shared: Arc<Shared>) {
    while let Some(message) = stream.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(frame)) => {
                info!("Mixer closed the connection: {:?}", frame);
                break;
            }
            Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                continue;
            }
            Err(err) => {
                warn!("Mixer connection error: {}", err);
                break;
            }
        };
        if let Err(err) = dispatch(&text, &shared) {
            warn!("Dropping mixer message: {}", err);
        }
    }
    shared.disconnect();
}

fn dispatch(text: &str, shared: &Shared) -> RemoteResult<()> {
    let frame: Frame = serde_json::from_str(text).map_err(|err| RemoteError::Decode {
        context: "frame",
        source: err,
    })?;
    match frame.op {
        OP_EVENT => {
            let message: EventMessage =
                serde_json::from_value(frame.d).map_err(|err| RemoteError::Decode {
                    context: "event",
                    source: err,
                })?;
            let event = codec::decode_event(message)?;
            debug!("<- event {:?}", event);
            // No subscribers is not an error.
            drop(shared.events.send(event));
        }
        OP_REQUEST_RESPONSE => {
            let message: ResponseMessage =
                serde_json::from_value(frame.d).map_err(|err| RemoteError::Decode {
                    context: "request response",
                    source: err,
                })?;
            let id = message.request_id.clone().unwrap_or_default();
            shared.complete(&id, Reply::Single(message));
        }
        OP_REQUEST_BATCH_RESPONSE => {
            let message: BatchResponseMessage =
                serde_json::from_value(frame.d).map_err(|err| RemoteError::Decode {
                    context: "batch response",
                    source: err,
                })?;
            shared.complete(&message.request_id, Reply::Batch(message.results));
        }
        other => debug!("Ignoring op {}", other),
    }
    Ok(())
}
