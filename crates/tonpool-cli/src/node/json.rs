// Newline-delimited JSON transport to the node client
//
// Each request is one JSON object with `@extra` set to the request id.
// Replies echo `@extra`; objects without it are push updates. A writer and
// a reader task own the two halves of the TCP stream.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use super::{NodeClient, NodeEvent};
use crate::api::Request;
use crate::correlator::PUSH_ID;
use crate::error::{CliError, CliResult, RemoteError};
use crate::event_loop::LoopEvent;

pub struct JsonNodeClient {
    outgoing: UnboundedSender<String>,
}

impl JsonNodeClient {
    /// Connect and start the transport tasks; events go to `events`
    pub async fn connect(endpoint: &str, events: UnboundedSender<LoopEvent>) -> CliResult<Self> {
        let stream = TcpStream::connect(endpoint).await.map_err(|err| {
            CliError::Config(format!("cannot connect to node client at {}: {}", endpoint, err))
        })?;
        info!(endpoint, "connected to node client");

        let (reader, writer) = stream.into_split();
        let (outgoing, requests) = mpsc::unbounded_channel();
        tokio::spawn(write_requests(writer, requests));
        tokio::spawn(read_events(reader, events));
        Ok(Self { outgoing })
    }
}

impl NodeClient for JsonNodeClient {
    fn request(&mut self, id: u64, request: Request) -> CliResult<()> {
        let line = encode_request(id, &request)?;
        self.outgoing
            .send(line)
            .map_err(|_| RemoteError::new(500, "connection to node client is closed").into())
    }
}

async fn write_requests(mut writer: OwnedWriteHalf, mut requests: UnboundedReceiver<String>) {
    while let Some(line) = requests.recv().await {
        if let Err(err) = writer.write_all(line.as_bytes()).await {
            warn!(%err, "failed to write to node client");
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("node client writer finished");
}

async fn read_events(reader: OwnedReadHalf, events: UnboundedSender<LoopEvent>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => match parse_event(&line) {
                Ok(event) => {
                    if events.send(LoopEvent::Node(event)).is_err() {
                        return;
                    }
                }
                Err(err) => warn!(%err, "malformed message from node client"),
            },
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "failed to read from node client");
                break;
            }
        }
    }
    let _ = events.send(LoopEvent::Node(NodeEvent::Closed));
}

/// Serialize a request as one line tagged with its id
pub fn encode_request(id: u64, request: &Request) -> CliResult<String> {
    let mut value = serde_json::to_value(request)?;
    if let Value::Object(fields) = &mut value {
        fields.insert("@extra".to_string(), Value::String(id.to_string()));
    }
    let mut line = serde_json::to_string(&value)?;
    line.push('\n');
    Ok(line)
}

/// Classify one line received from the node client
pub fn parse_event(line: &str) -> CliResult<NodeEvent> {
    let value: Value = serde_json::from_str(line)?;
    let id = match value.get("@extra") {
        Some(Value::String(text)) => text.parse::<u64>().ok(),
        Some(Value::Number(number)) => number.as_u64(),
        _ => None,
    };

    if value.get("@type").and_then(Value::as_str) == Some("error") {
        let code = value.get("code").and_then(Value::as_i64).unwrap_or_default() as i32;
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Ok(NodeEvent::Error {
            id: id.unwrap_or(PUSH_ID),
            error: RemoteError::new(code, message),
        });
    }

    match id {
        Some(id) if id != PUSH_ID => Ok(NodeEvent::Reply {
            id,
            response: serde_json::from_value(value)?,
        }),
        _ => Ok(NodeEvent::Push(serde_json::from_value(value)?)),
    }
}
