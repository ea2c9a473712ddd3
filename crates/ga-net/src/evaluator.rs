//! The distributed fitness step (§4.8): dispatches a generation's
//! unevaluated genomes to the connection manager, which fans them out to
//! connected helpers, and writes the replies back onto the population.
//! Implements the same [`ga_engines::evaluator::FitnessEvaluator`] trait
//! as the serial evaluator so `GeneticEngine` never knows which one it's
//! driving.

use crate::manager::{FactoryAnnouncement, GenerationRequest, GenomePayload, ManagerCmd};
use ga_core::codec::{ByteReader, ByteWriter, MemoryBuffer};
use ga_core::factory::Factory;
use ga_core::population::Population;
use ga_error::{Result, ga_bail, ga_ensure, ga_err};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};

/// Evaluates a population by round-tripping it through the connection
/// manager instead of computing locally. Holds its own [`Factory`]
/// instance purely as a codec: it never calls `sort`/`breed`/`on_step` on
/// it, only `write_genome`/`read_genome_fitness`, the same subset a helper
/// uses against its own factory instance. Generation-info bytes come from
/// [`on_generation_info`](ga_engines::evaluator::FitnessEvaluator::on_generation_info),
/// which `GeneticEngine` calls against its own (non-codec) factory
/// instance, so this evaluator never has to reproduce that state itself.
pub struct DistributedEvaluator {
    codec_factory: Box<dyn Factory>,
    factory_id: i32,
    manager: mpsc::Sender<ManagerCmd>,
    pending_generation_info: Option<Vec<u8>>,
}

impl DistributedEvaluator {
    /// `codec_factory` must already be `init`-ed with the same parameters
    /// as the engine's own factory, so the two agree on wire layout.
    pub fn new(codec_factory: Box<dyn Factory>, factory_id: i32, manager: mpsc::Sender<ManagerCmd>) -> Self {
        Self {
            codec_factory,
            factory_id,
            manager,
            pending_generation_info: None,
        }
    }

    pub fn announcement(&self, module_name: &str, population_size: i32) -> Result<FactoryAnnouncement> {
        let mut params_buf = MemoryBuffer::new();
        self.codec_factory.current_parameters().write(&mut params_buf)?;
        self.codec_factory.ga_params().write(&mut params_buf)?;
        Ok(FactoryAnnouncement {
            factory_id: self.factory_id,
            module_name: module_name.to_string(),
            population_size,
            params_blob: params_buf.into_vec(),
        })
    }
}

impl ga_engines::evaluator::FitnessEvaluator for DistributedEvaluator {
    fn evaluate<'a>(
        &'a mut self,
        population: &'a mut Population,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut genomes = Vec::with_capacity(population.len());
            for wrapper in population.iter() {
                let mut buf = MemoryBuffer::new();
                self.codec_factory.write_genome(wrapper.genome.as_ref(), &mut buf)?;
                genomes.push(GenomePayload {
                    index: wrapper.position,
                    bytes: buf.into_vec(),
                });
            }

            let request = GenerationRequest {
                factory_id: self.factory_id,
                genomes,
                generation_info: self.pending_generation_info.take(),
            };

            let (reply_tx, reply_rx) = oneshot::channel();
            self.manager
                .send(ManagerCmd::RunGeneration { request, reply: reply_tx })
                .await
                .map_err(|_| ga_err!(Transport: "connection manager task is gone"))?;
            let deliveries = reply_rx
                .await
                .map_err(|_| ga_err!(Transport: "connection manager dropped the generation reply"))??;

            for delivery in deliveries {
                let mut buf = MemoryBuffer::from_vec(delivery.fitness_payload);
                let factory_id = buf.read_i32()?;
                ga_ensure!(
                    factory_id == self.factory_id,
                    Protocol: "fitness reply factory id {} does not match active factory {}",
                    factory_id,
                    self.factory_id
                );
                let count = buf.read_i32()?;
                ga_ensure!(
                    count as usize == delivery.indices.len(),
                    Protocol: "fitness reply count {} does not match dispatched batch size {}",
                    count,
                    delivery.indices.len()
                );
                for &index in &delivery.indices {
                    if index >= population.len() {
                        ga_bail!(Protocol: "fitness reply referenced out-of-range index {}", index);
                    }
                    self.codec_factory
                        .read_genome_fitness(population[index].genome.as_mut(), &mut buf)?;
                }
            }

            Ok(())
        })
    }

    fn on_generation_info(&mut self, payload: &[u8]) {
        self.pending_generation_info = Some(payload.to_vec());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::HelperDelivery;
    use ga_core::best_set::BestSet;
    use ga_core::genome::{EmptyParams, FactoryParams, Genome, GenomeWrapper};
    use ga_core::params::GaParams;
    use ga_engines::evaluator::FitnessEvaluator;
    use std::any::Any;
    use std::cell::Cell;

    struct Scalar(Cell<f64>);
    impl Genome for Scalar {
        fn calculate_fitness(&mut self) {}
        fn is_fitter_than(&self, other: &dyn Genome) -> bool {
            self.0.get() < other.as_any().downcast_ref::<Scalar>().unwrap().0.get()
        }
        fn set_active_fitness_component(&mut self, _index: usize) {}
        fn reproduce(&self, _other: &dyn Genome) -> Box<dyn Genome> {
            self.clone_genome()
        }
        fn clone_genome(&self) -> Box<dyn Genome> {
            Box::new(Scalar(Cell::new(self.0.get())))
        }
        fn mutate(&mut self) {}
        fn describe_fitness(&self) -> String {
            self.0.get().to_string()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct ScalarFactory;
    impl Factory for ScalarFactory {
        fn number_of_fitness_components(&self) -> usize {
            1
        }
        fn create_new_genome(&self) -> Box<dyn Genome> {
            Box::new(Scalar(Cell::new(0.0)))
        }
        fn create_params_instance(&self) -> Box<dyn FactoryParams> {
            Box::new(EmptyParams)
        }
        fn current_parameters(&self) -> Box<dyn FactoryParams> {
            Box::new(EmptyParams)
        }
        fn init(&mut self, _params: &dyn FactoryParams) -> Result<()> {
            Ok(())
        }
        fn maximal_genome_bytes(&self) -> usize {
            8
        }
        fn maximal_fitness_bytes(&self) -> usize {
            8
        }
        fn write_genome(&self, genome: &dyn Genome, w: &mut dyn ga_core::codec::ByteWriter) -> Result<()> {
            w.write_f64(genome.as_any().downcast_ref::<Scalar>().unwrap().0.get())
        }
        fn read_genome(&self, r: &mut dyn ByteReader) -> Result<Box<dyn Genome>> {
            Ok(Box::new(Scalar(Cell::new(r.read_f64()?))))
        }
        fn write_genome_fitness(&self, genome: &dyn Genome, w: &mut dyn ga_core::codec::ByteWriter) -> Result<()> {
            self.write_genome(genome, w)
        }
        fn read_genome_fitness(&self, genome: &mut dyn Genome, r: &mut dyn ByteReader) -> Result<()> {
            let value = r.read_f64()?;
            genome.as_any().downcast_ref::<Scalar>().unwrap().0.set(value);
            Ok(())
        }
        fn ga_params(&self) -> GaParams {
            GaParams::default()
        }
        fn set_ga_params(&mut self, _params: GaParams) {}
        fn sort(&self, _population: &mut Population) {}
        fn update_best_genomes(&self, _population: &Population, _best_set: &mut BestSet) {}
        fn breed(&self, _population: &Population) -> Population {
            unimplemented!()
        }
        fn introduce_mutations(&self, _population: &mut Population) {}
        fn select_preferred_genome<'a>(&self, best_set: &'a BestSet) -> Option<&'a dyn Genome> {
            best_set.genomes().first().map(|g| g.as_ref())
        }
    }

    #[tokio::test]
    async fn evaluate_round_trips_through_a_stub_manager() {
        let (cmd_tx, mut cmd_rx) = mpsc::channel(4);
        let mut evaluator = DistributedEvaluator::new(Box::new(ScalarFactory), 9, cmd_tx);

        let stub = tokio::spawn(async move {
            if let Some(ManagerCmd::RunGeneration { request, reply }) = cmd_rx.recv().await {
                assert_eq!(request.factory_id, 9);
                assert!(request.generation_info.is_some());

                // Mirror the wire format exactly: factory_id, count, then
                // one raw f64 per genome, doubled.
                let mut raw = MemoryBuffer::new();
                raw.write_i32(9).unwrap();
                raw.write_i32(request.genomes.len() as i32).unwrap();
                for genome in &request.genomes {
                    let mut inner = MemoryBuffer::from_vec(genome.bytes.clone());
                    let value = inner.read_f64().unwrap();
                    raw.write_f64(value * 2.0).unwrap();
                }
                let indices: Vec<usize> = request.genomes.iter().map(|g| g.index).collect();
                let delivery = HelperDelivery {
                    helper_id: 0,
                    indices,
                    fitness_payload: raw.into_vec(),
                };
                let _ = reply.send(Ok(vec![delivery]));
            }
        });

        let wrappers = (0..5)
            .map(|i| GenomeWrapper::fresh(Box::new(Scalar(Cell::new(i as f64 + 1.0))), i))
            .collect();
        let mut population = Population::new(wrappers).unwrap();

        evaluator.evaluate(&mut population).await.unwrap();
        stub.await.unwrap();

        for (i, wrapper) in population.iter().enumerate() {
            let value = wrapper.genome.as_any().downcast_ref::<Scalar>().unwrap().0.get();
            assert_eq!(value, (i as f64 + 1.0) * 2.0);
        }
    }
}
