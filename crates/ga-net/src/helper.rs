//! The helper role (§4.9): connects to a coordinator, loads whichever
//! factory module the session names, and repeatedly evaluates batches of
//! genomes for it until the coordinator disconnects.

use crate::connection::{self, ConnEvent};
use ga_core::codec::MemoryBuffer;
use ga_core::factory::{Factory, FactoryRegistry};
use ga_error::{Result, ga_bail};
use ga_protocol::command::CommandId;
use ga_protocol::message;
use ga_protocol::timeouts;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const SELECT_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct HelperConfig {
    pub coordinator_addr: SocketAddr,
    pub verbosity: u8,
}

struct ActiveFactory {
    factory_id: i32,
    factory: Box<dyn Factory>,
}

/// Loads problem plug-ins out of a compile-time [`FactoryRegistry`]
/// standing in for the out-of-scope dynamic module loader (§9).
pub struct Helper {
    registry: FactoryRegistry,
}

impl Helper {
    pub fn new(registry: FactoryRegistry) -> Self {
        Self { registry }
    }

    /// Reconnects and re-announces itself whenever the coordinator
    /// connection drops, until the process is told to stop.
    pub async fn run(&self, config: &HelperConfig) -> Result<()> {
        loop {
            if let Err(e) = self.run_once(config.coordinator_addr).await {
                tracing::warn!(error = %e, "helper session ended, reconnecting");
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn run_once(&self, addr: SocketAddr) -> Result<()> {
        let stream = TcpStream::connect(addr).await?;
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let handle = connection::spawn(stream, 0, events_tx);
        tracing::info!(%addr, "helper connected");

        handle.send(message::encode_bodyless(CommandId::HelperHello)?)?;

        let mut current: Option<ActiveFactory> = None;

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    match event {
                        Some(ConnEvent::Frame(_, payload)) => {
                            self.handle_frame(&handle, payload, &mut current)?;
                        }
                        Some(ConnEvent::Closed(_)) | None => {
                            ga_bail!(Transport: "coordinator connection closed");
                        }
                    }
                }
                _ = tokio::time::sleep(SELECT_TICK) => {
                    if handle.idle_write_for() >= timeouts::KEEPALIVE_INTERVAL {
                        let _ = handle.send(message::encode_bodyless(CommandId::Keepalive)?);
                    }
                }
            }
        }
    }

    fn handle_frame(
        &self,
        handle: &connection::ConnHandle,
        payload: bytes::Bytes,
        current: &mut Option<ActiveFactory>,
    ) -> Result<()> {
        let mut buf = MemoryBuffer::from_vec(payload.to_vec());
        let command = message::read_command(&mut buf)?;

        match command {
            CommandId::Accept | CommandId::Busy | CommandId::Keepalive => Ok(()),
            CommandId::Factory => self.handle_factory(handle, &mut buf, current),
            CommandId::GenerationInfo => {
                let factory_id = buf.read_i32()?;
                if let Some(active) = current.as_mut() {
                    if active.factory_id == factory_id {
                        active.factory.read_common_generation_info(&mut buf)?;
                    }
                }
                Ok(())
            }
            CommandId::Calculate => self.handle_calculate(handle, &mut buf, current),
            other => {
                tracing::debug!(?other, "unexpected command at a helper");
                Ok(())
            }
        }
    }

    fn handle_factory(
        &self,
        handle: &connection::ConnHandle,
        buf: &mut MemoryBuffer,
        current: &mut Option<ActiveFactory>,
    ) -> Result<()> {
        let header = message::decode_factory_header(buf)?;

        // Unload whatever was previously loaded, regardless of whether the
        // new module can be brought up (§4.9).
        *current = None;

        let mut factory = self.registry.create(&header.module_name);
        let available = match factory.as_mut() {
            Some(f) => {
                let mut params = f.create_params_instance();
                match params.read(buf).and_then(|()| f.init(params.as_ref())) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, module = %header.module_name, "factory rejected its parameters");
                        false
                    }
                }
            }
            None => {
                tracing::warn!(module = %header.module_name, "no registered factory by that name");
                false
            }
        };

        if available {
            *current = factory.map(|f| ActiveFactory {
                factory_id: header.factory_id,
                factory: f,
            });
        }

        handle.send(message::encode_factory_result(header.factory_id, available)?)
    }

    fn handle_calculate(
        &self,
        handle: &connection::ConnHandle,
        buf: &mut MemoryBuffer,
        current: &mut Option<ActiveFactory>,
    ) -> Result<()> {
        let incoming_factory_id = buf.peek_i32()?;
        let Some(active) = current.as_mut() else {
            return Ok(());
        };
        if active.factory_id != incoming_factory_id {
            // Stale batch from a cancelled generation: discard silently.
            return Ok(());
        }

        let (factory_id, mut genomes) = message::decode_calculate(buf, active.factory.as_ref())?;

        for genome in genomes.iter_mut() {
            if handle.idle_write_for() >= timeouts::KEEPALIVE_INTERVAL {
                let _ = handle.send(message::encode_bodyless(CommandId::Keepalive)?);
            }
            genome.calculate_fitness();
        }

        let reply = message::encode_fitness(factory_id, &genomes, active.factory.as_ref())?;
        handle.send(reply)
    }
}
