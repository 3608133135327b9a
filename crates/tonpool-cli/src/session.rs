//! Console session
//!
//! All mutable console state lives in one [`Session`] driven by the event
//! loop: the key registry, the address deriver, the pending continuation,
//! the pending queries and the handles to the node client, the relay and
//! the terminal. Every completion runs on the loop thread with exclusive
//! access to the session, so no locking is involved.

use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use colored::Colorize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use tonpool_contracts::{AddressDeriver, Grams};

use crate::api::{ConfigInfo, OptionsInfo, Options, Request, Response, SyncProgress, TonError, Update};
use crate::continuation::{self, ContinuationSlot, Suspendable};
use crate::correlator::{self, Correlated, QueryCorrelator};
use crate::dispatch;
use crate::error::{CliError, CliResult, RemoteError};
use crate::event_loop::LoopEvent;
use crate::keys::KeyRegistry;
use crate::node::{NodeClient, NodeEvent};
use crate::relay::{RelayTransport, DEFAULT_RELAY_TIMEOUT};
use crate::terminal::Terminal;

//-----------------------------------------------------------------------------
// Command Outcome
//-----------------------------------------------------------------------------

/// Identifies the command line a completion chain belongs to
#[derive(Debug, Clone)]
pub struct CommandToken {
    line: Rc<str>,
}

impl CommandToken {
    pub fn new(line: &str) -> Self {
        Self { line: Rc::from(line) }
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

/// How far a command got when its handler returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Finished, output written
    Done,
    /// Waiting for a reply from the node client
    Pending,
    /// Waiting for the next input line
    AwaitingInput,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Interactive,
    OneShot { command: Option<String> },
}

//-----------------------------------------------------------------------------
// Session State
//-----------------------------------------------------------------------------

/// Progress of the node client's blockchain synchronization
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncState {
    #[default]
    NotStarted,
    InProgress {
        from_seq: i32,
        to_seq: i32,
        at_seq: i32,
        started_at: Instant,
    },
}

impl SyncState {
    /// Progress line as printed to the console
    pub fn progress(&self) -> String {
        match self {
            SyncState::NotStarted => "synchronization: ???".to_string(),
            SyncState::InProgress {
                from_seq,
                to_seq,
                at_seq,
                ..
            } => {
                let total = i64::from(*to_seq) - i64::from(*from_seq);
                if total <= 0 {
                    return "synchronization: ???".to_string();
                }
                let done = i64::from(*at_seq) - i64::from(*from_seq);
                format!("synchronization: {}%", 100 * done / total)
            }
        }
    }
}

/// Bytes carried for the node client through the relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetStats {
    pub sent: u64,
    pub received: u64,
}

/// Reference count over the parties keeping the loop alive: the session
/// itself, the terminal input, the node client and in-flight relay queries.
#[derive(Debug)]
struct Lifecycle {
    closing: bool,
    refs: usize,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            closing: false,
            refs: 1,
        }
    }

    fn acquire(&mut self, holder: &'static str) {
        self.refs += 1;
        debug!(holder, refs = self.refs, "reference acquired");
    }

    fn release(&mut self, holder: &'static str) {
        self.refs = self.refs.saturating_sub(1);
        debug!(holder, refs = self.refs, "reference released");
    }
}

pub struct Session {
    keys: KeyRegistry,
    deriver: AddressDeriver,
    continuation: ContinuationSlot<Session>,
    queries: QueryCorrelator<Session, Response, CliError>,
    client: Option<Box<dyn NodeClient>>,
    init_options: Option<Options>,
    relay: Option<Arc<dyn RelayTransport>>,
    relay_timeout: Duration,
    events: Option<UnboundedSender<LoopEvent>>,
    terminal: Box<dyn Terminal>,
    input_attached: bool,
    input_closed: bool,
    sync: SyncState,
    netstats: NetStats,
    lifecycle: Lifecycle,
    mode: Mode,
    exit_code: i32,
    pool_request_amount: Grams,
}

impl Session {
    pub fn new(keys: KeyRegistry, deriver: AddressDeriver, terminal: Box<dyn Terminal>) -> Self {
        Self {
            keys,
            deriver,
            continuation: ContinuationSlot::new(),
            queries: QueryCorrelator::new(),
            client: None,
            init_options: None,
            relay: None,
            relay_timeout: DEFAULT_RELAY_TIMEOUT,
            events: None,
            terminal,
            input_attached: false,
            input_closed: false,
            sync: SyncState::NotStarted,
            netstats: NetStats::default(),
            lifecycle: Lifecycle::new(),
            mode: Mode::Interactive,
            exit_code: 0,
            pool_request_amount: Grams::from_nano(1_000_000_000),
        }
    }

    /// Attach the node client; `options` are sent with the `init` request
    pub fn with_client(mut self, client: Box<dyn NodeClient>, options: Options) -> Self {
        self.client = Some(client);
        self.init_options = Some(options);
        self.lifecycle.acquire("node");
        self
    }

    pub fn with_relay(mut self, relay: Arc<dyn RelayTransport>, timeout: Duration) -> Self {
        self.relay = Some(relay);
        self.relay_timeout = timeout;
        self
    }

    /// Queue used to feed relay results back into the loop
    pub fn with_events(mut self, events: UnboundedSender<LoopEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Run `command` once the node client is ready, then exit
    pub fn one_shot(mut self, command: impl Into<String>) -> Self {
        self.mode = Mode::OneShot {
            command: Some(command.into()),
        };
        self
    }

    pub fn with_pool_request_amount(mut self, amount: Grams) -> Self {
        self.pool_request_amount = amount;
        self
    }

    //-------------------------------------------------------------------------
    // Accessors
    //-------------------------------------------------------------------------

    pub fn keys(&self) -> &KeyRegistry {
        &self.keys
    }

    pub fn keys_mut(&mut self) -> &mut KeyRegistry {
        &mut self.keys
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn netstats(&self) -> NetStats {
        self.netstats
    }

    pub fn pool_request_amount(&self) -> Grams {
        self.pool_request_amount
    }

    pub fn pending_queries(&self) -> usize {
        self.queries.pending()
    }

    pub fn is_awaiting_input(&self) -> bool {
        self.continuation.is_pending()
    }

    pub fn is_closing(&self) -> bool {
        self.lifecycle.closing
    }

    /// True once closing and every reference has been released
    pub fn is_stopped(&self) -> bool {
        self.lifecycle.closing && self.lifecycle.refs == 0
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    fn is_one_shot(&self) -> bool {
        matches!(self.mode, Mode::OneShot { .. })
    }

    /// Write command output
    pub fn out(&mut self, text: impl AsRef<str>) {
        self.terminal.write(text.as_ref());
    }

    //-------------------------------------------------------------------------
    // Start-up and Input
    //-------------------------------------------------------------------------

    /// Initialize the node client, then run the one-shot command if any
    pub fn start(&mut self) {
        let Some(options) = self.init_options.take() else {
            self.run_one_shot();
            return;
        };

        let submitted = self.submit(Request::Init { options }, |session, outcome| {
            match outcome.and_then(OptionsInfo::try_from) {
                Ok(info) => {
                    session.apply_config_info(&info.config_info);
                    session.out("Node client is initialized\n");
                }
                Err(err) => {
                    error!(%err, "node client initialization failed");
                    session.out(format!("Failed to initialize node client: {}\n", err));
                }
            }
            session.run_one_shot();
        });
        if let Err(err) = submitted {
            error!(%err, "cannot submit init request");
            self.run_one_shot();
        }
    }

    fn run_one_shot(&mut self) {
        if let Mode::OneShot { command } = &mut self.mode {
            if let Some(command) = command.take() {
                info!(command = %command, "running one-shot command");
                self.handle_line(&command);
            }
        }
    }

    /// Record that the terminal feeds input lines
    pub fn attach_input(&mut self) {
        if !self.input_attached {
            self.input_attached = true;
            self.lifecycle.acquire("terminal");
        }
    }

    fn detach_input(&mut self) {
        if self.input_attached {
            self.input_attached = false;
            self.lifecycle.release("terminal");
        }
    }

    /// Adopt the node's configuration, including its default wallet id
    pub fn apply_config_info(&mut self, info: &ConfigInfo) {
        match u32::try_from(info.default_wallet_id) {
            Ok(wallet_id) => {
                debug!(wallet_id, "default wallet id updated");
                self.deriver.set_default_wallet_id(wallet_id);
            }
            Err(_) => warn!(
                wallet_id = info.default_wallet_id,
                "default wallet id out of range, keeping current"
            ),
        }
    }

    /// Route one event from the loop queue
    pub fn handle_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::Line(line) => self.handle_line(&line),
            LoopEvent::InputClosed => {
                self.detach_input();
                self.input_closed = true;
            }
            LoopEvent::Node(NodeEvent::Reply { id, response }) => self.on_reply(id, response),
            LoopEvent::Node(NodeEvent::Error { id, error }) => self.on_error(id, error),
            LoopEvent::Node(NodeEvent::Push(update)) => self.on_push(update),
            LoopEvent::Node(NodeEvent::Closed) => self.on_node_closed(),
            LoopEvent::Relay { id, result } => self.on_relay_result(id, result),
        }

        if self.input_closed && !self.lifecycle.closing && self.queries.pending() == 0 {
            info!("input finished and no queries pending");
            self.close();
        }
    }

    /// Feed a line to the pending continuation or dispatch it as a command
    pub fn handle_line(&mut self, line: &str) {
        if self.lifecycle.closing {
            return;
        }
        if self.continuation.is_pending() && matches!(line.trim(), "exit" | "quit") {
            self.close();
            return;
        }
        if continuation::feed(self, line) {
            return;
        }
        dispatch::dispatch(self, line);
    }

    //-------------------------------------------------------------------------
    // Requests
    //-------------------------------------------------------------------------

    /// Send a request; the completion runs once with the reply or error.
    ///
    /// Returns `None` without sending when the session is closing.
    pub fn submit(
        &mut self,
        request: Request,
        completion: impl FnOnce(&mut Session, CliResult<Response>) + 'static,
    ) -> CliResult<Option<u64>> {
        if self.lifecycle.closing {
            debug!("session closing, request dropped");
            return Ok(None);
        }
        let Some(client) = self.client.as_mut() else {
            return Err(CliError::Config("not connected to a node client".to_string()));
        };

        let id = self.queries.register(completion);
        debug!(id, request = ?request, "submitting request");
        if let Err(err) = client.request(id, request) {
            self.queries.take(id);
            return Err(err);
        }
        Ok(Some(id))
    }

    /// Send a request whose reply only needs logging
    pub fn submit_detached(&mut self, request: Request, what: &'static str) {
        let submitted = self.submit(request, move |_, outcome| {
            if let Err(err) = outcome {
                error!(%err, what, "request failed");
            }
        });
        if let Err(err) = submitted {
            error!(%err, what, "cannot submit request");
        }
    }

    /// Send a request on behalf of a command and continue with the typed reply
    pub fn send_query<R, F>(&mut self, token: &CommandToken, request: Request, then: F) -> CliResult<Flow>
    where
        R: TryFrom<Response, Error = CliError> + 'static,
        F: FnOnce(&mut Session, R) -> CliResult<Flow> + 'static,
    {
        let token = token.clone();
        self.submit(request, move |session, outcome| {
            let outcome = outcome
                .and_then(R::try_from)
                .and_then(|reply| then(session, reply));
            session.settle(token, outcome);
        })?;
        Ok(Flow::Pending)
    }

    /// Print `prompt` and continue with the next input line
    pub fn suspend<F>(&mut self, token: &CommandToken, prompt: &str, then: F) -> CliResult<Flow>
    where
        F: FnOnce(&mut Session, &str) -> CliResult<Flow> + 'static,
    {
        self.out(prompt);
        self.out("\n");
        let token = token.clone();
        self.continuation.suspend(move |session: &mut Session, line: &str| {
            let outcome = then(session, line);
            session.settle(token, outcome);
        });
        Ok(Flow::AwaitingInput)
    }

    /// Report the outcome of a command step
    pub fn settle(&mut self, token: CommandToken, outcome: CliResult<Flow>) {
        match outcome {
            Ok(Flow::Pending) => {}
            Ok(Flow::Done) => {
                debug!(command = token.line(), "command completed");
                if self.is_one_shot() {
                    info!("OK");
                    self.exit(0);
                }
            }
            Ok(Flow::AwaitingInput) => {
                if self.is_one_shot() {
                    error!("FAILED (not enough data)");
                    self.exit(2);
                }
            }
            Err(err) => {
                warn!(command = token.line(), %err, "command failed");
                self.out(format!("Query {{{}}} {}: \n\t{}\n", token.line(), "FAILED".red(), err));
                if self.is_one_shot() {
                    error!("FAILED");
                    self.exit(1);
                }
            }
        }
    }

    //-------------------------------------------------------------------------
    // Node Events
    //-------------------------------------------------------------------------

    pub fn on_reply(&mut self, id: u64, response: Response) {
        correlator::resolve(self, id, Ok(response));
    }

    pub fn on_error(&mut self, id: u64, error: RemoteError) {
        correlator::resolve(self, id, Err(CliError::Remote(error)));
    }

    pub fn on_push(&mut self, update: Update) {
        match update {
            Update::SyncState { sync_state } => self.on_sync_progress(sync_state),
            Update::SendLiteServerQuery { id, data } => self.relay_query(id, data),
        }
    }

    fn on_sync_progress(&mut self, progress: SyncProgress) {
        match progress {
            SyncProgress::Done => {
                let elapsed = match &self.sync {
                    SyncState::InProgress { started_at, .. } => started_at.elapsed(),
                    SyncState::NotStarted => Duration::ZERO,
                };
                self.out(format!("synchronization: DONE in {:.2?}\n", elapsed));
                self.sync = SyncState::NotStarted;
            }
            SyncProgress::InProgress {
                from_seqno,
                to_seqno,
                current_seqno,
            } => {
                let started_at = match &self.sync {
                    SyncState::InProgress { started_at, .. } => *started_at,
                    SyncState::NotStarted => Instant::now(),
                };
                self.sync = SyncState::InProgress {
                    from_seq: from_seqno,
                    to_seq: to_seqno,
                    at_seq: current_seqno,
                    started_at,
                };
                self.out(format!("{}\n", self.sync.progress()));
            }
        }
    }

    fn relay_query(&mut self, id: i64, data: Vec<u8>) {
        self.netstats.sent += data.len() as u64;
        let (Some(relay), Some(events)) = (self.relay.clone(), self.events.clone()) else {
            warn!(id, "lite-server query received but no relay is configured");
            self.submit_detached(
                Request::LiteServerQueryError {
                    id,
                    error: TonError {
                        code: 500,
                        message: "relay is not configured".to_string(),
                    },
                },
                "onLiteServerQueryError",
            );
            return;
        };

        self.lifecycle.acquire("relay");
        let answer = relay.send_query(data, self.relay_timeout);
        tokio::spawn(async move {
            let result = answer.await;
            let _ = events.send(LoopEvent::Relay { id, result });
        });
    }

    pub fn on_relay_result(&mut self, id: i64, result: Result<Vec<u8>, RemoteError>) {
        self.lifecycle.release("relay");
        match result {
            Ok(bytes) => {
                self.netstats.received += bytes.len() as u64;
                self.submit_detached(Request::LiteServerQueryResult { id, bytes }, "onLiteServerQueryResult");
            }
            Err(err) => {
                debug!(id, %err, "relay query failed");
                self.submit_detached(
                    Request::LiteServerQueryError {
                        id,
                        error: TonError {
                            code: err.code,
                            message: err.message,
                        },
                    },
                    "onLiteServerQueryError",
                );
            }
        }
    }

    fn on_node_closed(&mut self) {
        if self.client.take().is_some() {
            self.lifecycle.release("node");
        }
        if self.lifecycle.closing {
            return;
        }
        warn!("node client connection closed");
        self.out("Connection to the node client was lost\n");
        for (_, completion) in self.queries.drain() {
            completion(
                self,
                Err(RemoteError::new(500, "connection to node client is closed").into()),
            );
        }
        self.close();
    }

    //-------------------------------------------------------------------------
    // Shutdown
    //-------------------------------------------------------------------------

    /// Stop accepting work and release the session's references
    pub fn close(&mut self) {
        if self.lifecycle.closing {
            return;
        }
        info!("closing session");
        self.lifecycle.closing = true;
        self.continuation.clear();
        let dropped = self.queries.clear();
        if dropped > 0 {
            debug!(dropped, "pending queries dropped");
        }
        if self.client.take().is_some() {
            self.lifecycle.release("node");
        }
        self.detach_input();
        self.lifecycle.release("session");
    }

    /// Close with an exit status; the first status recorded wins
    pub fn exit(&mut self, code: i32) {
        if !self.lifecycle.closing {
            self.exit_code = code;
        }
        self.close();
    }
}

impl Suspendable for Session {
    fn continuation(&mut self) -> &mut ContinuationSlot<Self> {
        &mut self.continuation
    }
}

impl Correlated for Session {
    type Reply = Response;
    type Error = CliError;

    fn correlator(&mut self) -> &mut QueryCorrelator<Self, Response, CliError> {
        &mut self.queries
    }
}
