//! SyncSession: the client side of the synchronization protocol
//!
//! A session owns the live buffer, the translator snapshot, the undo
//! history and the in-flight bookkeeping. It has at most one operation
//! awaiting acknowledgment (`sent`) and at most one composed operation
//! buffered behind it (`pending`):
//!
//! ```text
//!            local edit                 local edit
//!   Idle  --------------> AwaitingAck --------------> AwaitingAckWithPending
//!    ^                      |    ^                         |        |
//!    |        ack           |    |   ack (pending sent)    |        | local edit
//!    +----------------------+    +-------------------------+        | (composed)
//!                                                                   v
//! ```
//!
//! Any algebra failure, payload error or translator mismatch poisons the
//! session. From then on every call fails with [`SyncError::Desync`] until
//! the host reloads the document through [`SyncSession::set_text`].

use super::clock::{Clock, SystemClock};
use super::config::SessionConfig;
use super::undo::UndoManager;
use crate::editor::translate::EditTranslator;
use crate::editor::{ChangeBatch, ChangeOrigin, EditorSurface};
use crate::error::{Result, SyncError};
use crate::ot::{compose, transform, TextOperation};
use crate::protocol::{deserialize_operation, serialize_operation, OperationData};
use crate::ClientID;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// Outbound side of the network
///
/// Delivery back to the session happens through
/// [`SyncSession::receive_remote_operation`], including the echo of the
/// session's own operations, which the server relays to every client.
pub trait Transport {
    /// Send a local operation based on server revision `revision`
    fn submit_operation(&mut self, operation: OperationData, revision: u64);

    /// Ask the host to reload the document after a desync
    fn request_snapshot(&mut self) {}
}

/// An operation handed to [`QueuedTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundOperation {
    pub operation: OperationData,
    pub revision: u64,
}

/// Transport that queues outbound operations for the host to pump
#[derive(Debug, Clone, Default)]
pub struct QueuedTransport {
    outbox: VecDeque<OutboundOperation>,
    snapshot_requests: usize,
}

impl QueuedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest queued operation
    pub fn pop(&mut self) -> Option<OutboundOperation> {
        self.outbox.pop_front()
    }

    /// Take every queued operation
    pub fn drain(&mut self) -> Vec<OutboundOperation> {
        self.outbox.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.outbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbox.is_empty()
    }

    /// Times a snapshot reload was requested
    pub fn snapshot_requests(&self) -> usize {
        self.snapshot_requests
    }
}

impl Transport for QueuedTransport {
    fn submit_operation(&mut self, operation: OperationData, revision: u64) {
        self.outbox.push_back(OutboundOperation { operation, revision });
    }

    fn request_snapshot(&mut self) {
        self.snapshot_requests += 1;
    }
}

/// Where the session stands with respect to the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing in flight
    Idle,
    /// One operation sent and not yet acknowledged
    AwaitingAck,
    /// One operation in flight and local edits buffered behind it
    AwaitingAckWithPending,
    /// Diverged from the server; needs a snapshot reload
    Desynchronized,
}

/// Client session for one document
pub struct SyncSession<S, T, C = SystemClock> {
    client_id: ClientID,
    surface: S,
    transport: T,
    clock: C,
    translator: EditTranslator,
    undo: UndoManager,

    /// Sent and awaiting acknowledgment
    sent: Option<TextOperation>,

    /// Composed local edits made while `sent` is in flight
    pending: Option<TextOperation>,

    /// Server revision the local state is based on
    revision: u64,

    /// Set once the session is poisoned
    desync: Option<String>,
}

impl<S, T> SyncSession<S, T, SystemClock>
where
    S: EditorSurface,
    T: Transport,
{
    /// Create a session over `surface`, whose current text is taken to be
    /// server revision 0
    pub fn new(client_id: ClientID, surface: S, transport: T, config: SessionConfig) -> Result<Self> {
        Self::with_clock(client_id, surface, transport, config, SystemClock)
    }
}

impl<S, T, C> SyncSession<S, T, C>
where
    S: EditorSurface,
    T: Transport,
    C: Clock,
{
    /// Create a session reading time from `clock`
    pub fn with_clock(
        client_id: ClientID,
        surface: S,
        transport: T,
        config: SessionConfig,
        clock: C,
    ) -> Result<Self> {
        config.validate()?;
        let translator = EditTranslator::new(client_id.clone(), &surface.value());

        debug!(client_id = %client_id, "session created");

        Ok(Self {
            client_id,
            surface,
            transport,
            clock,
            translator,
            undo: UndoManager::new(&config),
            sent: None,
            pending: None,
            revision: 0,
            desync: None,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn state(&self) -> SessionState {
        if self.desync.is_some() {
            return SessionState::Desynchronized;
        }
        match (&self.sent, &self.pending) {
            (None, _) => SessionState::Idle,
            (Some(_), None) => SessionState::AwaitingAck,
            (Some(_), Some(_)) => SessionState::AwaitingAckWithPending,
        }
    }

    /// Reason the session was poisoned, if it was
    pub fn desync_reason(&self) -> Option<&str> {
        self.desync.as_deref()
    }

    pub fn sent_operation(&self) -> Option<&TextOperation> {
        self.sent.as_ref()
    }

    pub fn pending_operation(&self) -> Option<&TextOperation> {
        self.pending.as_ref()
    }

    /// Server revision the local state is based on
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Text the session believes the buffer holds
    pub fn text(&self) -> String {
        self.translator.snapshot().to_string()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access to the buffer
    ///
    /// Edits made through this handle bypass the session; report them with
    /// [`handle_changes`](Self::handle_changes).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn undo_manager(&self) -> &UndoManager {
        &self.undo
    }

    pub fn can_undo(&self) -> bool {
        self.desync.is_none() && self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.desync.is_none() && self.undo.can_redo()
    }

    /// Load the document from a server snapshot taken at `revision`
    ///
    /// Resets the buffer, the history and the in-flight state, and clears a
    /// desync. Anything in flight is dropped, so later submissions are based
    /// on `revision` rather than on a count that would miss its echo.
    pub fn set_text(&mut self, text: &str, revision: u64) {
        self.surface.set_value(text);
        self.translator.reset(text);
        self.undo.clear();
        self.sent = None;
        self.pending = None;
        self.revision = revision;
        self.desync = None;

        info!(client_id = %self.client_id, revision, "document loaded");
    }

    /// Feed changes reported by the editor
    ///
    /// Only user input is turned into an operation; batches the session
    /// caused itself are ignored.
    pub fn handle_changes(&mut self, batch: &ChangeBatch) -> Result<()> {
        self.ensure_live()?;

        let operation = match self.translator.translate(batch) {
            Ok(Some(operation)) => operation,
            Ok(None) => return Ok(()),
            Err(err) => return Err(self.fail(err)),
        };

        let now = self.clock.now();
        self.undo.record(&operation, now);

        self.submit_local(operation)
            .map_err(|err| self.fail(err))
    }

    /// Handle an operation relayed by the server
    ///
    /// An operation authored by this client acknowledges the one in flight.
    /// Anything else is transformed past local unacknowledged work and the
    /// undo history, then applied to the buffer.
    pub fn receive_remote_operation(&mut self, data: &OperationData) -> Result<()> {
        self.ensure_live()?;

        if data.author_id == self.client_id {
            return self.acknowledge();
        }

        let remote = match deserialize_operation(data) {
            Ok(operation) => operation,
            Err(err) => return Err(self.fail(err)),
        };

        self.integrate_remote(remote).map_err(|err| self.fail(err))?;
        self.revision += 1;

        debug!(
            client_id = %self.client_id,
            author_id = %data.author_id,
            revision = self.revision,
            "remote operation applied"
        );

        Ok(())
    }

    /// Undo the most recent local action
    ///
    /// Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> Result<bool> {
        self.ensure_live()?;
        self.replay(ChangeOrigin::Undo)
    }

    /// Redo the most recently undone action
    ///
    /// Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> Result<bool> {
        self.ensure_live()?;
        self.replay(ChangeOrigin::Redo)
    }

    fn replay(&mut self, origin: ChangeOrigin) -> Result<bool> {
        let translator = &mut self.translator;
        let surface = &mut self.surface;
        let mut applied: Vec<TextOperation> = Vec::new();

        let mut apply = |operation: &TextOperation| -> Result<()> {
            translator.apply_operation(&mut *surface, operation, origin, true)?;
            applied.push(operation.clone());
            Ok(())
        };

        let result = match origin {
            ChangeOrigin::Redo => self.undo.redo(&mut apply),
            _ => self.undo.undo(&mut apply),
        };
        let count = result.map_err(|err| self.fail(err))?;

        let mut applied = applied.into_iter();
        let Some(first) = applied.next() else {
            return Ok(false);
        };
        let combined = applied
            .try_fold(first, |acc, next| compose(&acc, &next))
            .map_err(|err| self.fail(err))?;

        debug!(client_id = %self.client_id, ?origin, count, "history replayed");

        if !combined.is_noop() {
            self.submit_local(combined).map_err(|err| self.fail(err))?;
        }
        Ok(true)
    }

    fn acknowledge(&mut self) -> Result<()> {
        if self.sent.take().is_none() {
            warn!(client_id = %self.client_id, "acknowledgment with nothing in flight ignored");
            return Err(SyncError::UnexpectedAck);
        }
        self.revision += 1;

        debug!(client_id = %self.client_id, revision = self.revision, "operation acknowledged");

        if let Some(pending) = self.pending.take() {
            self.send(pending);
        }
        Ok(())
    }

    fn integrate_remote(&mut self, remote: TextOperation) -> Result<()> {
        let mut remote = remote;

        if let Some(sent) = &self.sent {
            let (sent_prime, remote_prime) = transform(sent, &remote)?;
            self.sent = Some(sent_prime);
            remote = remote_prime;

            if let Some(pending) = &self.pending {
                let (pending_prime, remote_prime) = transform(pending, &remote)?;
                self.pending = Some(pending_prime);
                remote = remote_prime;
            }
        }

        self.undo.transform_stacks(&remote)?;
        self.translator
            .apply_operation(&mut self.surface, &remote, ChangeOrigin::Network, false)
    }

    fn submit_local(&mut self, operation: TextOperation) -> Result<()> {
        match self.state() {
            SessionState::Idle => self.send(operation),
            SessionState::AwaitingAck => self.pending = Some(operation),
            SessionState::AwaitingAckWithPending => {
                if let Some(pending) = &self.pending {
                    self.pending = Some(compose(pending, &operation)?);
                }
            }
            SessionState::Desynchronized => {
                return Err(SyncError::Desync(self.desync.clone().unwrap_or_default()));
            }
        }
        Ok(())
    }

    fn send(&mut self, operation: TextOperation) {
        debug!(
            client_id = %self.client_id,
            revision = self.revision,
            source_length = operation.source_length(),
            target_length = operation.target_length(),
            "submitting operation"
        );
        self.transport
            .submit_operation(serialize_operation(&operation), self.revision);
        self.sent = Some(operation);
    }

    fn ensure_live(&self) -> Result<()> {
        match &self.desync {
            Some(reason) => Err(SyncError::Desync(reason.clone())),
            None => Ok(()),
        }
    }

    /// Poison the session and ask for a snapshot, once
    fn fail(&mut self, err: SyncError) -> SyncError {
        let err = err.into_desync();
        if self.desync.is_none() {
            let reason = match &err {
                SyncError::Desync(reason) => reason.clone(),
                other => other.to_string(),
            };
            error!(client_id = %self.client_id, %reason, "session desynchronized");
            self.desync = Some(reason);
            self.transport.request_snapshot();
        }
        err
    }
}
