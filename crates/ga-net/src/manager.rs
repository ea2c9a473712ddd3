//! The connection manager: the single task that owns the listening socket
//! and every live helper/client connection for one coordinator process.
//! Everything else (the generational engine, the distributed evaluator)
//! talks to it over an `mpsc` command channel, never touching a socket
//! directly — the same pump-task shape SPEC_FULL.md grounds on COS301's
//! `ws/mux.rs`.
//!
//! The manager deliberately knows nothing about `Factory` or `Genome`: it
//! moves already-serialized byte blobs (genome bytes, fitness-reply
//! bytes, factory-params blobs) and leaves decoding them to whoever holds
//! the concrete `Factory` — the [`crate::evaluator::DistributedEvaluator`]
//! and [`crate::coordinator::Coordinator`].

use crate::connection::{self, ConnEvent, ConnHandle, ConnId};
use crate::distribution::{self, DistributionState, HelperState};
use ga_core::codec::MemoryBuffer;
use ga_error::{Result, ga_bail};
use ga_protocol::command::CommandId;
use ga_protocol::message;
use ga_protocol::timeouts;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};

/// The factory-agnostic header of a FACTORY submission, plus the opaque
/// `factoryParams ‖ gaParams` blob the coordinator re-decodes once it has
/// looked the module name up in its registry.
#[derive(Debug, Clone)]
pub struct FactoryAnnouncement {
    pub factory_id: i32,
    pub module_name: String,
    pub population_size: i32,
    pub params_blob: Vec<u8>,
}

/// One genome's pre-serialized bytes, keyed by its population index.
pub struct GenomePayload {
    pub index: usize,
    pub bytes: Vec<u8>,
}

pub struct GenerationRequest {
    pub factory_id: i32,
    pub genomes: Vec<GenomePayload>,
    /// Set when the engine's `onStep` flagged `generationInfoChanged` (or
    /// this is generation zero); an opaque `writeCommonGenerationInfo`
    /// blob to broadcast ahead of the first dispatch.
    pub generation_info: Option<Vec<u8>>,
}

/// One FITNESS reply, still encoded: `factory_id ‖ count ‖ fitness·count`,
/// exactly as read off the wire after the leading command id. The caller
/// decodes it with its own `Factory` against `indices` (the population
/// slots this helper's batch was dispatched for, in dispatch order).
pub struct HelperDelivery {
    pub helper_id: u64,
    pub indices: Vec<usize>,
    pub fitness_payload: Vec<u8>,
}

pub enum ManagerCmd {
    /// Blocks (from the caller's perspective) until the next client
    /// connects and submits a FACTORY descriptor. Any further
    /// CLIENT_HELLO received while a session is open is answered BUSY.
    AwaitClient(oneshot::Sender<FactoryAnnouncement>),
    RunGeneration {
        request: GenerationRequest,
        reply: oneshot::Sender<Result<Vec<HelperDelivery>>>,
    },
    /// A pre-encoded CURRENT_BEST or RESULT payload (the caller already
    /// called `ga_protocol::message::encode_genome_fitness_list`).
    SendToClient(Vec<u8>),
    EndSession,
}

const SELECT_TICK: Duration = Duration::from_millis(150);

/// Spawns the manager task and returns the command channel used to drive
/// it. `addr` is bound synchronously so bind failures surface before the
/// coordinator process reports itself ready.
pub async fn spawn(addr: SocketAddr) -> Result<mpsc::Sender<ManagerCmd>> {
    let listener = TcpListener::bind(addr).await?;
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let manager = Manager::new(listener);
    tokio::spawn(manager.run(cmd_rx));
    Ok(cmd_tx)
}

#[derive(Clone, Copy)]
enum PeerRole {
    Helper(u64),
    Client,
}

struct Manager {
    listener: TcpListener,
    events_tx: mpsc::Sender<ConnEvent>,
    events_rx: mpsc::Receiver<ConnEvent>,
    next_conn_id: ConnId,
    connections: HashMap<ConnId, ConnHandle>,
    roles: HashMap<ConnId, PeerRole>,
    helpers: HashMap<u64, DistributionState>,
    next_helper_id: u64,
    client: Option<ConnId>,
    current_factory: Option<FactoryAnnouncement>,
    generation_info_version: u64,
    generation_info_payload: Option<Vec<u8>>,
}

impl Manager {
    fn new(listener: TcpListener) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            listener,
            events_tx,
            events_rx,
            next_conn_id: 0,
            connections: HashMap::new(),
            roles: HashMap::new(),
            helpers: HashMap::new(),
            next_helper_id: 0,
            client: None,
            current_factory: None,
            generation_info_version: 0,
            generation_info_payload: None,
        }
    }

    async fn run(mut self, mut cmd_rx: mpsc::Receiver<ManagerCmd>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                ManagerCmd::AwaitClient(reply) => {
                    if let Some(announcement) = self.await_client().await {
                        let _ = reply.send(announcement);
                    }
                }
                ManagerCmd::RunGeneration { request, reply } => {
                    let outcome = self.run_generation(request).await;
                    let _ = reply.send(outcome);
                }
                ManagerCmd::SendToClient(payload) => {
                    self.send_to_client(payload);
                }
                ManagerCmd::EndSession => {
                    self.end_session();
                }
            }
        }
    }

    /// Accepts and multiplexes connections until a client has sent a full
    /// FACTORY message, registering every HELPER_HELLO it sees along the
    /// way. Never surfaces a connection-level error to the caller: a bad
    /// connection just gets dropped and the wait continues.
    async fn await_client(&mut self) -> Option<FactoryAnnouncement> {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    self.handle_accept(accepted);
                }
                Some(event) = self.events_rx.recv() => {
                    if let Some(announcement) = self.handle_lobby_event(event) {
                        return Some(announcement);
                    }
                }
                _ = tokio::time::sleep(SELECT_TICK) => {}
            }
            self.run_maintenance();
        }
    }

    fn handle_accept(&mut self, accepted: std::io::Result<(tokio::net::TcpStream, SocketAddr)>) {
        let Ok((stream, peer_addr)) = accepted else {
            return;
        };
        let id = self.next_conn_id;
        self.next_conn_id += 1;
        let handle = connection::spawn(stream, id, self.events_tx.clone());
        tracing::debug!(conn = id, peer = %peer_addr, "accepted connection");
        self.connections.insert(id, handle);
    }

    fn handle_lobby_event(&mut self, event: ConnEvent) -> Option<FactoryAnnouncement> {
        match event {
            ConnEvent::Closed(id) => {
                self.forget_connection(id);
                None
            }
            ConnEvent::Frame(id, payload) => self.handle_frame(id, payload),
        }
    }

    fn handle_frame(&mut self, id: ConnId, payload: bytes::Bytes) -> Option<FactoryAnnouncement> {
        let mut buf = MemoryBuffer::from_vec(payload.to_vec());
        let command = match message::read_command(&mut buf) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(conn = id, error = %e, "dropping connection on bad command");
                self.close_connection(id);
                return None;
            }
        };

        match self.roles.get(&id).copied() {
            None => self.handle_unidentified(id, command, &mut buf),
            Some(PeerRole::Helper(helper_id)) => {
                self.handle_helper_frame(helper_id, command, &mut buf);
                None
            }
            Some(PeerRole::Client) => self.handle_client_frame(command, &mut buf),
        }
    }

    fn handle_unidentified(
        &mut self,
        id: ConnId,
        command: CommandId,
        _buf: &mut MemoryBuffer,
    ) -> Option<FactoryAnnouncement> {
        match command {
            CommandId::HelperHello => {
                let helper_id = self.next_helper_id;
                self.next_helper_id += 1;
                self.roles.insert(id, PeerRole::Helper(helper_id));
                self.helpers.insert(helper_id, DistributionState::new());
                if let Ok(accept) = message::encode_bodyless(CommandId::Accept) {
                    self.send_to_conn(id, accept);
                }
                if let Some(announcement) = self.current_factory.clone() {
                    self.send_factory_to(id, &announcement);
                }
                None
            }
            CommandId::ClientHello => {
                if self.client.is_some() {
                    if let Ok(busy) = message::encode_bodyless(CommandId::Busy) {
                        self.send_to_conn(id, busy);
                    }
                    self.close_connection(id);
                } else {
                    self.roles.insert(id, PeerRole::Client);
                    self.client = Some(id);
                    if let Ok(accept) = message::encode_bodyless(CommandId::Accept) {
                        self.send_to_conn(id, accept);
                    }
                }
                None
            }
            _ => {
                tracing::debug!(conn = id, command = ?command, "unexpected command before handshake");
                self.close_connection(id);
                None
            }
        }
    }

    fn handle_client_frame(&mut self, command: CommandId, buf: &mut MemoryBuffer) -> Option<FactoryAnnouncement> {
        match command {
            CommandId::Factory => {
                let header = match message::decode_factory_header(buf) {
                    Ok(h) => h,
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed FACTORY from client");
                        return None;
                    }
                };
                let announcement = FactoryAnnouncement {
                    factory_id: header.factory_id,
                    module_name: header.module_name,
                    population_size: header.population_size,
                    params_blob: buf.remaining().to_vec(),
                };
                self.current_factory = Some(announcement.clone());
                Some(announcement)
            }
            _ => None,
        }
    }

    fn handle_helper_frame(&mut self, helper_id: u64, command: CommandId, buf: &mut MemoryBuffer) {
        match command {
            CommandId::FactoryResult => {
                if let Ok((factory_id, available)) = message::decode_factory_result(buf) {
                    if let Some(dist) = self.helpers.get_mut(&helper_id) {
                        dist.acked_factory_id = Some(factory_id);
                        dist.can_help = available;
                        if available && dist.state == HelperState::Unidentified {
                            dist.state = HelperState::Idle;
                        }
                    }
                }
            }
            CommandId::Keepalive => {}
            _ => {}
        }
    }

    fn send_factory_to(&mut self, id: ConnId, announcement: &FactoryAnnouncement) {
        if let Ok(payload) = message::encode_factory_from_parts(
            announcement.factory_id,
            &announcement.module_name,
            announcement.population_size,
            &announcement.params_blob,
        ) {
            self.send_to_conn(id, payload);
        }
    }

    // -- generation dispatch (§4.8) -----------------------------------

    async fn run_generation(&mut self, request: GenerationRequest) -> Result<Vec<HelperDelivery>> {
        let factory_id = request.factory_id;
        let population_size = request.genomes.len();

        if let Some(info) = request.generation_info {
            self.generation_info_version += 1;
            self.generation_info_payload = Some(info);
        }

        let all_genomes: HashMap<usize, Vec<u8>> =
            request.genomes.into_iter().map(|g| (g.index, g.bytes)).collect();
        let mut remaining: Vec<usize> = {
            let mut ids: Vec<usize> = all_genomes.keys().copied().collect();
            ids.sort_unstable();
            ids
        };

        for dist in self.helpers.values_mut() {
            dist.begin_generation();
        }
        self.seed_quotas(population_size);

        let generation_start = Instant::now();
        let mut deliveries: Vec<HelperDelivery> = Vec::new();
        let mut calculated = 0usize;

        loop {
            self.dispatch_round(factory_id, &mut remaining, &all_genomes);

            if calculated == population_size {
                break;
            }

            if calculated < population_size
                && !self.any_helper_calculating()
                && !self.any_helper_eligible()
            {
                if let Some(client_id) = self.client {
                    if let Ok(no_helpers) = message::encode_bodyless(CommandId::NoHelpers) {
                        self.send_to_conn(client_id, no_helpers);
                    }
                }
                ga_bail!(Exhaustion: "no connected helper can evaluate factory {}", factory_id);
            }

            tokio::select! {
                accepted = self.listener.accept() => {
                    self.handle_accept(accepted);
                }
                Some(event) = self.events_rx.recv() => {
                    match event {
                        ConnEvent::Closed(id) => {
                            self.requeue_on_disconnect(id, &mut remaining);
                            let was_client = self.client == Some(id);
                            self.forget_connection(id);
                            if was_client {
                                ga_bail!(Transport: "client disconnected mid-generation");
                            }
                        }
                        ConnEvent::Frame(id, payload) => {
                            self.handle_generation_frame(id, payload, factory_id, &mut deliveries, &mut calculated);
                        }
                    }
                }
                _ = tokio::time::sleep(SELECT_TICK) => {}
            }

            self.run_maintenance();
        }

        self.finish_generation(&deliveries, population_size, generation_start);
        Ok(deliveries)
    }

    fn seed_quotas(&mut self, population_size: usize) {
        let eligible: Vec<u64> = self
            .helpers
            .iter()
            .filter(|(_, d)| d.can_help)
            .map(|(&id, _)| id)
            .collect();
        if eligible.is_empty() {
            return;
        }
        let targets = distribution::initial_targets(&eligible, population_size);
        for (id, target) in targets {
            if let Some(dist) = self.helpers.get_mut(&id) {
                dist.write_target = target;
            }
        }
    }

    fn dispatch_round(&mut self, factory_id: i32, remaining: &mut Vec<usize>, all_genomes: &HashMap<usize, Vec<u8>>) {
        let helper_ids: Vec<u64> = self.helpers.keys().copied().collect();
        for helper_id in helper_ids {
            if remaining.is_empty() {
                break;
            }

            let (eligible, quota) = match self.helpers.get(&helper_id) {
                Some(dist) => (
                    dist.can_help && dist.acked_factory_id == Some(factory_id) && dist.state == HelperState::Idle,
                    dist.remaining_quota(),
                ),
                None => (false, 0),
            };
            if !eligible || quota == 0 {
                continue;
            }

            let Some(conn_id) = self.helper_conn_id(helper_id) else {
                continue;
            };

            let take = quota.min(remaining.len());
            let indices: Vec<usize> = remaining.drain(..take).collect();
            let batch: Vec<Vec<u8>> = indices.iter().map(|i| all_genomes[i].clone()).collect();

            let needs_generation_info = self
                .helpers
                .get(&helper_id)
                .map(|d| d.acked_generation_info < self.generation_info_version)
                .unwrap_or(false);
            if needs_generation_info {
                if let Some(payload) = self.generation_info_payload.clone() {
                    if let Ok(frame) = message::encode_generation_info_from_bytes(factory_id, &payload) {
                        self.send_to_conn(conn_id, frame);
                    }
                    if let Some(dist) = self.helpers.get_mut(&helper_id) {
                        dist.acked_generation_info = self.generation_info_version;
                    }
                }
            }

            match message::encode_calculate_from_parts(factory_id, &batch) {
                Ok(frame) => {
                    self.send_to_conn(conn_id, frame);
                    if let Some(dist) = self.helpers.get_mut(&helper_id) {
                        dist.state = HelperState::Calculating;
                        dist.written_this_gen += indices.len();
                        dist.assigned_indices = indices;
                    }
                }
                Err(_) => {
                    remaining.extend(indices);
                }
            }
        }
    }

    fn handle_generation_frame(
        &mut self,
        id: ConnId,
        payload: bytes::Bytes,
        factory_id: i32,
        deliveries: &mut Vec<HelperDelivery>,
        calculated: &mut usize,
    ) {
        let mut buf = MemoryBuffer::from_vec(payload.to_vec());
        let command = match message::read_command(&mut buf) {
            Ok(c) => c,
            Err(_) => {
                self.close_connection(id);
                return;
            }
        };

        match self.roles.get(&id).copied() {
            Some(PeerRole::Client) => {
                if command == CommandId::ClientHello {
                    if let Ok(busy) = message::encode_bodyless(CommandId::Busy) {
                        self.send_to_conn(id, busy);
                    }
                }
                // KEEPALIVE and anything else from the client mid-run is a
                // no-op: the client only ever reads during an active run.
            }
            Some(PeerRole::Helper(helper_id)) => match command {
                CommandId::Fitness => {
                    let Ok(reply_factory_id) = buf.peek_i32() else {
                        return;
                    };
                    if reply_factory_id != factory_id {
                        tracing::debug!(helper = helper_id, "discarding stale fitness reply");
                        return;
                    }
                    let indices = self
                        .helpers
                        .get(&helper_id)
                        .map(|d| d.assigned_indices.clone())
                        .unwrap_or_default();
                    if indices.is_empty() {
                        return;
                    }
                    let fitness_payload = buf.remaining().to_vec();

                    *calculated += indices.len();
                    if let Some(dist) = self.helpers.get_mut(&helper_id) {
                        dist.state = HelperState::Idle;
                        dist.assigned_indices.clear();
                    }
                    deliveries.push(HelperDelivery {
                        helper_id,
                        indices,
                        fitness_payload,
                    });
                }
                CommandId::FactoryResult => {
                    self.handle_helper_frame(helper_id, command, &mut buf);
                }
                CommandId::Keepalive => {}
                _ => {}
            },
            None => {
                self.handle_unidentified(id, command, &mut buf);
            }
        }
    }

    fn requeue_on_disconnect(&mut self, id: ConnId, remaining: &mut Vec<usize>) {
        if let Some(PeerRole::Helper(helper_id)) = self.roles.get(&id).copied() {
            if let Some(dist) = self.helpers.remove(&helper_id) {
                remaining.extend(dist.assigned_indices);
                remaining.sort_unstable();
            }
        }
    }

    fn any_helper_calculating(&self) -> bool {
        self.helpers.values().any(|d| d.state == HelperState::Calculating)
    }

    fn any_helper_eligible(&self) -> bool {
        self.helpers.values().any(|d| d.can_help)
    }

    /// Recomputes each delivering helper's observed per-genome time and
    /// feeds it into [`distribution::rebalance`] to set next generation's
    /// write targets.
    fn finish_generation(&mut self, deliveries: &[HelperDelivery], population_size: usize, generation_start: Instant) {
        let elapsed_secs = generation_start.elapsed().as_secs_f64().max(1e-6);

        let mut delivered_by_helper: HashMap<u64, usize> = HashMap::new();
        for delivery in deliveries {
            *delivered_by_helper.entry(delivery.helper_id).or_insert(0) += delivery.indices.len();
        }

        let per_genome_time: HashMap<u64, f64> = delivered_by_helper
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(id, count)| (id, elapsed_secs / count as f64))
            .collect();

        let current_targets: HashMap<u64, usize> =
            self.helpers.iter().map(|(&id, d)| (id, d.write_target)).collect();
        let rebalanced = distribution::rebalance(&current_targets, &per_genome_time, population_size);
        for (id, target) in rebalanced {
            if let Some(dist) = self.helpers.get_mut(&id) {
                dist.write_target = target.max(1);
            }
        }
    }

    // -- client-facing helpers -----------------------------------------

    fn send_to_client(&mut self, payload: Vec<u8>) {
        if let Some(id) = self.client {
            self.send_to_conn(id, payload);
        }
    }

    /// Ends the current session. The client connection itself is left
    /// alone here — `run_maintenance`'s idle-read check closes it once it
    /// has been silent for longer than `CLIENT_CLOSE_TIMEOUT` after RESULT
    /// was sent, giving a well-behaved client room to close first.
    fn end_session(&mut self) {
        self.current_factory = None;
        self.generation_info_version = 0;
        self.generation_info_payload = None;
        self.helpers.clear();
        let stale_helper_conns: Vec<ConnId> = self
            .roles
            .iter()
            .filter_map(|(&id, role)| matches!(role, PeerRole::Helper(_)).then_some(id))
            .collect();
        for id in stale_helper_conns {
            self.roles.remove(&id);
        }
    }

    fn run_maintenance(&mut self) {
        let stale: Vec<ConnId> = self
            .connections
            .iter()
            .filter(|(_, c)| c.idle_read_for() > timeouts::READ_TIMEOUT)
            .map(|(&id, _)| id)
            .collect();
        for id in stale {
            self.close_connection(id);
        }

        if let Some(client_id) = self.client {
            if self.current_factory.is_none() {
                if let Some(conn) = self.connections.get(&client_id) {
                    if conn.idle_read_for() > timeouts::CLIENT_CLOSE_TIMEOUT {
                        self.close_connection(client_id);
                    }
                }
            }
        }

        for conn in self.connections.values() {
            if conn.idle_write_for() >= timeouts::KEEPALIVE_INTERVAL {
                if let Ok(keepalive) = message::encode_bodyless(CommandId::Keepalive) {
                    let _ = conn.send(keepalive);
                }
            }
        }
    }

    fn send_to_conn(&self, id: ConnId, payload: Vec<u8>) {
        if let Some(conn) = self.connections.get(&id) {
            if let Err(e) = conn.send(payload) {
                tracing::debug!(conn = id, error = %e, "failed to queue outgoing frame");
            }
        }
    }

    fn close_connection(&mut self, id: ConnId) {
        self.forget_connection(id);
    }

    fn forget_connection(&mut self, id: ConnId) {
        self.connections.remove(&id);
        if let Some(PeerRole::Helper(helper_id)) = self.roles.remove(&id) {
            self.helpers.remove(&helper_id);
        }
        if self.client == Some(id) {
            self.client = None;
        }
    }

    /// Linear scan over `roles`: fine at the helper-pool sizes this
    /// coordinator targets (tens, not thousands), and avoids keeping a
    /// second index in sync with `roles`/`connections`.
    fn helper_conn_id(&self, helper_id: u64) -> Option<ConnId> {
        self.roles.iter().find_map(|(&conn_id, role)| match role {
            PeerRole::Helper(h) if *h == helper_id => Some(conn_id),
            _ => None,
        })
    }
}
