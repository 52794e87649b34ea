use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::{self, Sender};
use std::thread;

use tracing::debug;

use super::channel::Command;
use super::dispatcher::run_session_worker;

/// Dedicated thread owning the session's `rusqlite::Connection`.
pub(super) struct SessionWorker {
    sender: Sender<Command>,
}

impl SessionWorker {
    pub(super) fn spawn(session_id: u64, connected: Arc<AtomicBool>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Command>();
        thread::Builder::new()
            .name(format!("sqlite-session-{session_id}"))
            .spawn(move || run_session_worker(session_id, &receiver, &connected))?;
        debug!(session_id, "spawned sqlite session worker");
        Ok(Self { sender })
    }

    pub(super) fn sender(&self) -> Sender<Command> {
        self.sender.clone()
    }
}

impl Drop for SessionWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

/// Queue `command` on the worker, settling it locally if the worker has exited.
pub(super) fn send_command(sender: &Sender<Command>, command: Command) {
    if let Err(mpsc::SendError(command)) = sender.send(command) {
        command.reject();
    }
}
