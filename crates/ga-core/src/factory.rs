//! The Factory contract (§4.1): the capability set a problem plug-in
//! exposes to the generational engine.

use crate::best_set::BestSet;
use crate::codec::{ByteReader, ByteWriter};
use crate::genome::{FactoryParams, Genome};
use crate::params::GaParams;
use crate::population::Population;
use ga_error::Result;
use std::collections::HashMap;

/// The problem plug-in. Two standard policy implementations
/// (`SingleObjectiveDefaults`/`MultiObjectiveDefaults` in `ga-engines`) are
/// meant to be embedded as a field and delegated to, rather than
/// reimplemented, per the composition-over-virtual-inheritance design note
/// in §9.
pub trait Factory: Send + Sync {
    fn number_of_fitness_components(&self) -> usize;

    fn create_new_genome(&self) -> Box<dyn Genome>;
    fn create_params_instance(&self) -> Box<dyn FactoryParams>;
    fn current_parameters(&self) -> Box<dyn FactoryParams>;

    /// Must copy `params` — the caller may free them immediately after.
    fn init(&mut self, params: &dyn FactoryParams) -> Result<()>;

    /// Upper bound on a serialized genome's size, used only to pre-size
    /// wire buffers.
    fn maximal_genome_bytes(&self) -> usize;
    /// Upper bound on a serialized fitness vector's size.
    fn maximal_fitness_bytes(&self) -> usize;

    fn write_genome(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()>;
    fn read_genome(&self, r: &mut dyn ByteReader) -> Result<Box<dyn Genome>>;
    fn write_genome_fitness(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()>;
    fn read_genome_fitness(&self, genome: &mut dyn Genome, r: &mut dyn ByteReader) -> Result<()>;

    /// Optional per-generation side data broadcast to helpers ahead of a
    /// batch, whenever `on_step` flags it as changed.
    fn write_common_generation_info(&self, w: &mut dyn ByteWriter) -> Result<()> {
        let _ = w;
        Ok(())
    }
    fn read_common_generation_info(&mut self, r: &mut dyn ByteReader) -> Result<()> {
        let _ = r;
        Ok(())
    }

    fn ga_params(&self) -> GaParams;
    fn set_ga_params(&mut self, params: GaParams);

    fn sort(&self, population: &mut Population);
    fn update_best_genomes(&self, population: &Population, best_set: &mut BestSet);
    fn breed(&self, population: &Population) -> Population;
    fn introduce_mutations(&self, population: &mut Population);
    fn select_preferred_genome<'a>(&self, best_set: &'a BestSet) -> Option<&'a dyn Genome>;

    fn on_start(&mut self) {}
    fn on_step(
        &mut self,
        generation: u64,
        best_set: &BestSet,
        generation_info_changed: &mut bool,
        stop: &mut bool,
    ) {
        let _ = (generation, best_set, generation_info_changed, stop);
    }
    fn on_sorted_population(&mut self, population: &Population) {
        let _ = population;
    }
    fn on_stop(&mut self) {}
}

type FactoryConstructor = Box<dyn Fn() -> Box<dyn Factory> + Send + Sync>;

/// Stands in for the dynamic code-loading mechanism the original
/// implementation uses (out of scope per §1/§9): a compile-time table
/// mapping a module name to a constructor.
#[derive(Default)]
pub struct FactoryRegistry {
    constructors: HashMap<String, FactoryConstructor>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        module_name: impl Into<String>,
        constructor: impl Fn() -> Box<dyn Factory> + Send + Sync + 'static,
    ) -> &mut Self {
        self.constructors
            .insert(module_name.into(), Box::new(constructor));
        self
    }

    pub fn create(&self, module_name: &str) -> Option<Box<dyn Factory>> {
        self.constructors.get(module_name).map(|ctor| ctor())
    }

    pub fn contains(&self, module_name: &str) -> bool {
        self.constructors.contains_key(module_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_looks_up_by_module_name() {
        let mut registry = FactoryRegistry::new();
        assert!(!registry.contains("missing"));
        // Registration of a concrete Factory is exercised in ga-engines'
        // integration tests (a full Factory impl requires the default
        // policy structs defined there).
        registry.register("noop", || unimplemented!());
        assert!(registry.contains("noop"));
        assert!(!registry.contains("other"));
    }
}
