//! The client role (§4.9): submits one factory/parameter pair to a
//! coordinator, then watches periodic CURRENT_BEST reports until RESULT
//! arrives.

use crate::connection::{self, ConnEvent};
use ga_core::codec::MemoryBuffer;
use ga_core::factory::Factory;
use ga_core::genome::{FactoryParams, Genome};
use ga_core::params::GaParams;
use ga_error::{Result, ga_bail};
use ga_protocol::command::CommandId;
use ga_protocol::message;
use ga_protocol::timeouts;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const SELECT_TICK: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub coordinator_addr: SocketAddr,
    pub module_name: String,
    pub population_size: i32,
}

/// What a run produced once RESULT closed it out.
pub struct RunOutcome {
    pub final_best: Vec<Box<dyn Genome>>,
    pub generations_reported: u64,
}

/// Drives one coordinator session end to end. Decodes genome/fitness
/// payloads with its own `codec_factory` — a `Factory` instance the caller
/// has already `init`-ed with the same parameters it is about to submit,
/// used purely for decoding, never for breeding or sorting.
pub struct Client {
    codec_factory: Box<dyn Factory>,
}

impl Client {
    pub fn new(codec_factory: Box<dyn Factory>) -> Self {
        Self { codec_factory }
    }

    /// Submits `factory_params`/`ga_params` under `config` and blocks until
    /// the coordinator sends RESULT, calling `on_progress` for every
    /// CURRENT_BEST report in between.
    pub async fn run(
        &mut self,
        config: &ClientConfig,
        factory_params: &dyn FactoryParams,
        ga_params: &GaParams,
        mut on_progress: impl FnMut(&[Box<dyn Genome>]),
    ) -> Result<RunOutcome> {
        let stream = TcpStream::connect(config.coordinator_addr).await?;
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let handle = connection::spawn(stream, 0, events_tx);
        tracing::info!(addr = %config.coordinator_addr, "client connected");

        handle.send(message::encode_bodyless(CommandId::ClientHello)?)?;
        self.await_acceptance(&mut events_rx).await?;

        let factory_message =
            message::encode_factory(1, &config.module_name, config.population_size, factory_params, ga_params)?;
        handle.send(factory_message)?;

        let mut last_write = Instant::now();
        let mut generations_reported = 0u64;

        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    match event {
                        Some(ConnEvent::Frame(_, payload)) => {
                            let mut buf = MemoryBuffer::from_vec(payload.to_vec());
                            match message::read_command(&mut buf)? {
                                CommandId::Keepalive => {}
                                CommandId::NoHelpers => {
                                    ga_bail!(Exhaustion: "coordinator reports no helpers are available");
                                }
                                CommandId::CurrentBest => {
                                    let genomes = message::decode_genome_fitness_list(&mut buf, self.codec_factory.as_ref())?;
                                    generations_reported += 1;
                                    on_progress(&genomes);
                                }
                                CommandId::Result => {
                                    let genomes = message::decode_genome_fitness_list(&mut buf, self.codec_factory.as_ref())?;
                                    return Ok(RunOutcome { final_best: genomes, generations_reported });
                                }
                                other => ga_bail!(Protocol: "unexpected command {:?} mid-run", other),
                            }
                        }
                        Some(ConnEvent::Closed(_)) | None => {
                            ga_bail!(Transport: "coordinator closed the connection before sending a result");
                        }
                    }
                }
                _ = tokio::time::sleep(SELECT_TICK) => {
                    if last_write.elapsed() >= timeouts::KEEPALIVE_INTERVAL {
                        handle.send(message::encode_bodyless(CommandId::Keepalive)?)?;
                        last_write = Instant::now();
                    }
                }
            }
        }
    }

    async fn await_acceptance(&self, events_rx: &mut mpsc::Receiver<ConnEvent>) -> Result<()> {
        loop {
            match events_rx.recv().await {
                Some(ConnEvent::Frame(_, payload)) => {
                    let mut buf = MemoryBuffer::from_vec(payload.to_vec());
                    match message::read_command(&mut buf)? {
                        CommandId::Accept => return Ok(()),
                        CommandId::Busy => {
                            ga_bail!(Transport: "coordinator already has an active client session");
                        }
                        CommandId::Keepalive => continue,
                        other => ga_bail!(Protocol: "unexpected command {:?} before ACCEPT", other),
                    }
                }
                Some(ConnEvent::Closed(_)) | None => {
                    ga_bail!(Transport: "coordinator closed the connection before accepting");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_carries_the_submission_shape() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ClientConfig {
            coordinator_addr: addr,
            module_name: "sphere".to_string(),
            population_size: 128,
        };
        assert_eq!(config.population_size, 128);
        assert_eq!(config.module_name, "sphere");
    }
}
