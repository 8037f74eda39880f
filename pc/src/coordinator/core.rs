//! Main ProgressCoordinator implementation

use std::time::Instant;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::CoordinatorConfig;
use super::messages::{ClientFrame, CoordinatorMetrics, ProgressPacket};
use super::throttle::Throttle;
use crate::display::{NameResolver, NoNames, ProgressDisplay};
use crate::domain::{FilterId, ObjectKey, ProcessRole, Rank, RoleClassifier, Topology};
use crate::error::ProgressError;
use crate::progress::{ObjectRegistry, ProgressLedger};
use crate::transport::{Messenger, PendingRequest, Source};

/// Collects progress from the stages of one process, merges it with what the
/// other ranks report, and forwards a single consolidated value
///
/// All work happens inline in the calls made by the pipeline executor. Every
/// transport call is a non-blocking start or test, and at most one send and
/// one receive are outstanding at any time.
pub struct ProgressCoordinator<M: Messenger, D: ProgressDisplay> {
    config: CoordinatorConfig,
    classifier: RoleClassifier,
    registry: ObjectRegistry,
    ledger: ProgressLedger,
    throttle: Throttle,
    messenger: M,
    display: D,
    names: Box<dyn NameResolver + Send>,
    pending_send: PendingRequest<M::SendRequest>,
    pending_recv: PendingRequest<M::RecvRequest>,
    /// True between `prepare_progress` and `cleanup_pending_progress`
    receiving: bool,
    update_id: Option<Uuid>,
    metrics: CoordinatorMetrics,
}

impl<M: Messenger, D: ProgressDisplay> ProgressCoordinator<M, D> {
    /// Create a coordinator for a process with the given topology
    pub fn new(config: CoordinatorConfig, topology: Topology, messenger: M, display: D) -> Self {
        debug!(?config, ?topology, "ProgressCoordinator::new: called");
        if messenger.rank() != topology.local_rank {
            warn!(
                topology_rank = %topology.local_rank,
                transport_rank = %messenger.rank(),
                "Topology rank disagrees with transport rank, reporting as transport rank"
            );
        }
        Self {
            throttle: Throttle::new(config.minimum_interval()),
            ledger: ProgressLedger::with_ranks(topology.num_processes),
            classifier: RoleClassifier::new(topology),
            registry: ObjectRegistry::new(),
            config,
            messenger,
            display,
            names: Box::new(NoNames),
            pending_send: PendingRequest::new(),
            pending_recv: PendingRequest::new(),
            receiving: false,
            update_id: None,
            metrics: CoordinatorMetrics::default(),
        }
    }

    /// Use `names` to label filters on the display
    pub fn with_names(mut self, names: impl NameResolver + Send + 'static) -> Self {
        self.names = Box::new(names);
        self
    }

    /// Associate a stage with the id it reports under
    pub fn register_progress_event(&mut self, key: ObjectKey, id: FilterId) {
        self.registry.register(key, id);
    }

    /// Open an update window
    ///
    /// Clears the ledger and, on root roles, makes sure a receive is posted
    /// for satellite reports.
    pub fn prepare_progress(&mut self) -> Result<(), ProgressError> {
        let role = self.classifier.role()?;
        self.ledger.reset();
        self.receiving = true;

        let update_id = Uuid::now_v7();
        self.update_id = Some(update_id);
        self.metrics.windows_opened += 1;
        info!(%update_id, %role, "Update window opened");

        if role.is_root() {
            self.post_receive();
        }
        Ok(())
    }

    /// Handle one progress tick from a stage
    ///
    /// Reports about unknown stages and reports arriving outside a window are
    /// dropped; the only error is a topology that has no role.
    pub fn invoke_progress_event(
        &mut self,
        key: ObjectKey,
        percent: u8,
        name_override: Option<&str>,
    ) -> Result<(), ProgressError> {
        let role = self.classifier.role()?;
        self.metrics.events_seen += 1;

        if !role.forwards_directly() && !self.receiving {
            debug!(%role, %percent, "ProgressCoordinator::invoke_progress_event: outside update window, dropping");
            self.metrics.dropped_outside_window += 1;
            return Ok(());
        }

        match role {
            ProcessRole::Standalone | ProcessRole::ClientConnectedToServer => {
                let name = self.resolve_name(self.registry.lookup(key), name_override);
                self.show(&name, percent);
            }
            ProcessRole::SatelliteMpi => self.report_to_root(key, percent),
            ProcessRole::StandaloneMpiRoot | ProcessRole::ServerRootSingleProcess | ProcessRole::ServerRootMpi => {
                let local = self.registry.lookup(key);
                let rank = self.rank();
                match local {
                    Some(id) => self.ledger.record_local(id, rank, percent),
                    None => {
                        debug!(key = key.raw(), "ProgressCoordinator::invoke_progress_event: unregistered stage");
                        self.metrics.unknown_sources += 1;
                    }
                }
                self.drain();
                self.forward(role, local.zip(name_override));
            }
        }
        Ok(())
    }

    /// Close the update window
    ///
    /// Root roles drain and forward one last time. Calling this with no open
    /// window is a lifecycle error.
    pub fn cleanup_pending_progress(&mut self) -> Result<(), ProgressError> {
        if !self.receiving {
            warn!("CleanupPendingProgress called with no open update window");
            return Err(ProgressError::WindowNotOpen);
        }

        let role = self.classifier.role()?;
        if role.is_root() {
            self.drain();
            self.forward(role, None);
        }

        self.receiving = false;
        info!(update_id = ?self.update_id, %role, "Update window closed");
        self.update_id = None;
        Ok(())
    }

    /// Cancel any outstanding send or receive
    pub fn shutdown(&mut self) {
        let sends = u64::from(self.pending_send.cancel());
        let receives = u64::from(self.pending_recv.cancel());
        if sends > 0 {
            self.throttle.mark_completed();
        }
        if sends + receives > 0 {
            debug!(sends, receives, "ProgressCoordinator::shutdown: cancelled outstanding requests");
            self.metrics.requests_cancelled += sends + receives;
        }
    }

    /// The role, once classified
    pub fn role(&self) -> Option<ProcessRole> {
        self.classifier.cached()
    }

    pub fn topology(&self) -> &Topology {
        self.classifier.topology()
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    pub fn update_id(&self) -> Option<Uuid> {
        self.update_id
    }

    pub fn metrics(&self) -> &CoordinatorMetrics {
        &self.metrics
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn has_pending_send(&self) -> bool {
        self.pending_send.is_pending()
    }

    pub fn has_pending_receive(&self) -> bool {
        self.pending_recv.is_pending()
    }

    /// Identity on the fabric; packets and ledger slots use this rank
    fn rank(&self) -> Rank {
        self.messenger.rank()
    }

    /// Satellite path: at most one packet in flight, at most one per interval
    fn report_to_root(&mut self, key: ObjectKey, percent: u8) {
        if self.pending_send.poll().is_some() {
            self.throttle.mark_completed();
        }

        let now = Instant::now();
        if !self.throttle.should_send(now, percent) {
            self.metrics.throttled += 1;
            return;
        }

        let Some(id) = self.registry.lookup(key) else {
            debug!(key = key.raw(), "ProgressCoordinator::report_to_root: unregistered stage");
            self.metrics.unknown_sources += 1;
            return;
        };

        let packet = ProgressPacket::pack(self.rank(), id, percent);
        let tag = self.config.progress_tag;
        match self
            .pending_send
            .try_issue(|| self.messenger.send_nonblocking(packet, Rank::ROOT, tag))
        {
            Ok(true) => {
                debug!(?packet, "ProgressCoordinator::report_to_root: packet sent");
                self.throttle.mark_sent(now);
                self.metrics.packets_sent += 1;
            }
            Ok(false) => self.metrics.throttled += 1,
            Err(e) => {
                warn!(error = %e, "Failed to send progress to root");
                self.metrics.transport_errors += 1;
            }
        }
    }

    /// Keep one receive outstanding; false if none could be posted
    fn post_receive(&mut self) -> bool {
        let tag = self.config.progress_tag;
        match self
            .pending_recv
            .try_issue(|| self.messenger.receive_nonblocking(Source::Any, tag))
        {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Failed to post progress receive");
                self.metrics.transport_errors += 1;
                false
            }
        }
    }

    /// Absorb every completed satellite report, reposting after each
    fn drain(&mut self) {
        let num_processes = self.classifier.topology().num_processes;
        while self.post_receive() {
            let Some(packet) = self.pending_recv.poll() else {
                break;
            };
            self.metrics.packets_drained += 1;

            match packet.validate(num_processes) {
                Some((rank, id, percent)) if self.registry.knows(id) => {
                    self.ledger.record_local(id, rank, percent);
                }
                _ => {
                    debug!(?packet, "ProgressCoordinator::drain: discarding report for unknown source");
                    self.metrics.unknown_sources += 1;
                }
            }
        }
    }

    /// Send the least-advanced (filter, rank) to the client or the display
    fn forward(&mut self, role: ProcessRole, local: Option<(FilterId, &str)>) {
        let Some((winner, percent)) = self.ledger.min_progress() else {
            debug!("ProgressCoordinator::forward: no data this tick");
            return;
        };

        let name = match local {
            Some((id, name)) if id == winner => name.to_string(),
            _ => self.resolve_name(Some(winner), None),
        };

        if role == ProcessRole::ServerRootMpi {
            let frame = ClientFrame::new(name, percent).encode();
            match self
                .messenger
                .socket_send(&frame, self.config.client_channel, self.config.client_tag)
            {
                Ok(()) => self.metrics.client_frames_sent += 1,
                Err(e) => {
                    warn!(error = %e, "Failed to forward progress to client");
                    self.metrics.transport_errors += 1;
                }
            }
        } else {
            self.show(&name, percent);
        }
    }

    fn show(&mut self, name: &str, percent: u8) {
        self.display.set_local_progress(name, percent);
        self.metrics.display_updates += 1;
    }

    fn resolve_name(&self, id: Option<FilterId>, name_override: Option<&str>) -> String {
        if let Some(name) = name_override {
            return name.to_string();
        }
        match id {
            Some(id) => self
                .names
                .display_name(id)
                .unwrap_or_else(|| format!("filter-{}", id)),
            None => "pipeline".to_string(),
        }
    }
}

impl<M: Messenger, D: ProgressDisplay> Drop for ProgressCoordinator<M, D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
