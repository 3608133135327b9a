// Terminal I/O: a sink for command output and a source of input lines

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::event_loop::LoopEvent;

/// Where command output goes
pub trait Terminal {
    fn write(&mut self, text: &str);
}

/// Writes to stdout and flushes so prompts show up immediately
#[derive(Debug, Default)]
pub struct StdoutTerminal;

impl Terminal for StdoutTerminal {
    fn write(&mut self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }
}

/// Collects output in memory; clones share the same buffer
#[derive(Debug, Clone, Default)]
pub struct BufferTerminal {
    buffer: Rc<RefCell<String>>,
}

impl BufferTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }

    /// Return everything written so far and reset the buffer
    pub fn take(&self) -> String {
        std::mem::take(&mut *self.buffer.borrow_mut())
    }
}

impl Terminal for BufferTerminal {
    fn write(&mut self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }
}

/// Forward stdin lines to the event loop until end of input
pub fn spawn_stdin_reader(events: UnboundedSender<LoopEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if events.send(LoopEvent::Line(line)).is_err() {
                return;
            }
        }
        debug!("standard input closed");
        let _ = events.send(LoopEvent::InputClosed);
    })
}
