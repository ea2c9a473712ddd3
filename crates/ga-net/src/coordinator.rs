//! The coordinator role (§4.8/§4.9): accepts one client session and any
//! number of helpers, drives a `GeneticEngine` whose fitness step is the
//! distributed evaluator, and streams periodic/final best-set reports
//! back to the client. Runs sessions back-to-back for the lifetime of the
//! process — exactly one client at a time, per §1's Non-goals.

use crate::evaluator::DistributedEvaluator;
use crate::manager::{self, FactoryAnnouncement, ManagerCmd};
use ga_core::codec::MemoryBuffer;
use ga_core::factory::FactoryRegistry;
use ga_core::genome::GenomeWrapper;
use ga_core::params::GaParams;
use ga_core::population::{MIN_POPULATION_SIZE, Population};
use ga_engines::GeneticEngine;
use ga_error::{Result, ga_bail, ga_ensure, ga_err};
use ga_protocol::command::CommandId;
use ga_protocol::message;
use ga_protocol::timeouts;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};

/// The coordinator's environmental surface (§6): no CLI framework, just a
/// plain struct built from `std::env::args()` by the binary that embeds
/// this crate.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    pub listen_addr: SocketAddr,
    pub verbosity: u8,
}

/// Drives sessions against a compile-time [`FactoryRegistry`] standing in
/// for the out-of-scope dynamic module loader (§9).
pub struct Coordinator {
    registry: Arc<FactoryRegistry>,
    stop: Arc<AtomicBool>,
}

impl Coordinator {
    pub fn new(registry: FactoryRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A clone of the atomic stop flag so a caller can wire it to a signal
    /// handler (out of scope here per §1, but the handle is provided so an
    /// embedding binary can do so) without this crate depending on signals.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Binds `addr` and serves sessions until the stop flag is set. Each
    /// iteration is one client session; a session's failure (a transport
    /// error, an exhausted helper pool, a malformed FACTORY) never takes
    /// the coordinator process down — it is logged and the coordinator
    /// goes back to accepting.
    pub async fn serve(&self, addr: SocketAddr) -> Result<()> {
        let manager = manager::spawn(addr).await?;
        tracing::info!(%addr, "coordinator listening");

        while !self.stop.load(Ordering::Relaxed) {
            let (reply_tx, reply_rx) = oneshot::channel();
            if manager.send(ManagerCmd::AwaitClient(reply_tx)).await.is_err() {
                ga_bail!(Transport: "connection manager task is gone");
            }
            let Ok(announcement) = reply_rx.await else {
                // The manager dropped the reply without ever getting a
                // client — only happens while tearing down.
                continue;
            };

            tracing::info!(factory = %announcement.module_name, population = announcement.population_size, "session started");
            if let Err(e) = self.run_session(&manager, announcement).await {
                tracing::warn!(error = %e, "session ended with an error");
            }
            let _ = manager.send(ManagerCmd::EndSession).await;
        }

        Ok(())
    }

    async fn run_session(&self, manager: &mpsc::Sender<ManagerCmd>, announcement: FactoryAnnouncement) -> Result<()> {
        ga_ensure!(
            announcement.population_size as usize >= MIN_POPULATION_SIZE,
            InvalidParameter: "population size {} is below the minimum of {}",
            announcement.population_size,
            MIN_POPULATION_SIZE
        );

        let mut engine_factory = self
            .registry
            .create(&announcement.module_name)
            .ok_or_else(|| ga_err!(Factory: "no registered factory named {}", announcement.module_name))?;
        let mut codec_factory = self
            .registry
            .create(&announcement.module_name)
            .ok_or_else(|| ga_err!(Factory: "no registered factory named {}", announcement.module_name))?;

        let mut params_buf = MemoryBuffer::from_vec(announcement.params_blob.clone());
        let mut factory_params = engine_factory.create_params_instance();
        factory_params.read(&mut params_buf)?;
        let ga_params = GaParams::read(&mut params_buf)?;

        engine_factory.init(factory_params.as_ref())?;
        engine_factory.set_ga_params(ga_params);
        codec_factory.init(factory_params.as_ref())?;

        let wrappers: Vec<GenomeWrapper> = (0..announcement.population_size as usize)
            .map(|i| GenomeWrapper::fresh(engine_factory.create_new_genome(), i))
            .collect();
        let population = Population::new(wrappers)?;

        let evaluator = DistributedEvaluator::new(codec_factory, announcement.factory_id, manager.clone());
        let mut engine = GeneticEngine::new(engine_factory, population, Box::new(evaluator));
        engine.init();

        let result = self.drive(manager, &mut engine).await;

        // Clean unwinding regardless of outcome (§5/§7): the factory's
        // `on_stop` always runs before the session ends.
        let teardown = engine.teardown();
        result?;
        teardown?;
        Ok(())
    }

    async fn drive(&self, manager: &mpsc::Sender<ManagerCmd>, engine: &mut GeneticEngine) -> Result<()> {
        let mut last_feedback = Instant::now();

        loop {
            let outcome = engine.step().await?;

            if last_feedback.elapsed() >= timeouts::CLIENT_FEEDBACK_INTERVAL {
                self.send_best(manager, engine, CommandId::CurrentBest).await;
                last_feedback = Instant::now();
            }

            if outcome.stop || self.stop.load(Ordering::Relaxed) {
                break;
            }
        }

        self.send_best(manager, engine, CommandId::Result).await;
        Ok(())
    }

    async fn send_best(&self, manager: &mpsc::Sender<ManagerCmd>, engine: &GeneticEngine, command: CommandId) {
        match message::encode_genome_fitness_list(command, engine.best_set().genomes(), engine.factory()) {
            Ok(payload) => {
                let _ = manager.send(ManagerCmd::SendToClient(payload)).await;
            }
            Err(e) => tracing::warn!(error = %e, ?command, "failed to encode best-set report"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_the_listen_address() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = CoordinatorConfig { listen_addr: addr, verbosity: 1 };
        assert_eq!(config.listen_addr, addr);
    }
}
