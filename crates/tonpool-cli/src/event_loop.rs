//! Single-threaded event loop
//!
//! Input lines, node client traffic and relay answers all arrive on one
//! queue and are handled in order on the loop thread. The loop ends once
//! the session is closing and every reference to it has been released.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use crate::error::RemoteError;
use crate::node::NodeEvent;
use crate::session::Session;

/// Everything the session reacts to
#[derive(Debug)]
pub enum LoopEvent {
    /// One line typed by the user
    Line(String),
    /// End of terminal input
    InputClosed,
    Node(NodeEvent),
    /// Answer to a relayed lite-server query
    Relay {
        id: i64,
        result: Result<Vec<u8>, RemoteError>,
    },
}

/// Drive `session` until it stops and return its exit status
pub async fn run(mut session: Session, mut events: UnboundedReceiver<LoopEvent>) -> i32 {
    session.start();

    while !session.is_stopped() {
        let Some(event) = events.recv().await else {
            debug!("event queue closed");
            session.close();
            break;
        };
        session.handle_event(event);
    }

    info!(exit_code = session.exit_code(), "event loop finished");
    session.exit_code()
}
