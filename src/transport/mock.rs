//! In-memory connector for manager tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::error::TryRecvError;
use url::Url;

use super::{Connector, Frame, SocketCommand, SocketEvent, SocketHandle, SocketPeer};

/// Records every opened socket and hands its peer end to the test.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    sockets: Arc<Mutex<VecDeque<MockSocket>>>,
    urls: Arc<Mutex<Vec<Url>>>,
}

impl MockConnector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Number of sockets opened so far.
    pub(crate) fn opened(&self) -> usize {
        self.urls.lock().len()
    }

    /// URLs passed to `open`, in order.
    pub(crate) fn urls(&self) -> Vec<Url> {
        self.urls.lock().clone()
    }

    /// Takes the oldest socket not yet taken.
    pub(crate) fn take(&self) -> MockSocket {
        self.sockets
            .lock()
            .pop_front()
            .expect("a socket should have been opened")
    }
}

impl Connector for MockConnector {
    fn open(&self, url: &Url) -> SocketHandle {
        let (handle, peer) = SocketHandle::pair();
        self.urls.lock().push(url.clone());
        self.sockets.lock().push_back(MockSocket { peer });
        handle
    }
}

/// Server side of one fake socket.
pub(crate) struct MockSocket {
    peer: SocketPeer,
}

impl MockSocket {
    pub(crate) fn open(&self) {
        self.emit(SocketEvent::Open);
    }

    pub(crate) fn text(&self, text: &str) {
        self.emit(SocketEvent::Message(Frame::Text(text.to_string())));
    }

    pub(crate) fn error(&self, message: &str) {
        self.emit(SocketEvent::Error(message.to_string()));
    }

    pub(crate) fn close(&self) {
        self.emit(SocketEvent::Close);
    }

    /// Stops accepting commands; later sends from the manager fail.
    pub(crate) fn hang_up(&mut self) {
        self.peer.commands.close();
    }

    pub(crate) fn emit(&self, event: SocketEvent) {
        // The manager may already have dropped its end
        let _ = self.peer.events.send(event);
    }

    /// Drains every command the manager has issued so far.
    pub(crate) fn commands(&mut self) -> Vec<SocketCommand> {
        let mut out = Vec::new();
        loop {
            match self.peer.commands.try_recv() {
                Ok(command) => out.push(command),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return out,
            }
        }
    }

    /// Drains sent text frames, skipping close requests.
    pub(crate) fn sent(&mut self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter_map(|command| match command {
                SocketCommand::Send(text) => Some(text),
                SocketCommand::Close => None,
            })
            .collect()
    }
}
