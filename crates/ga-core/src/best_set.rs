use crate::genome::Genome;

/// The set of genomes the engine has ever observed to be Pareto-optimal
/// (multi-objective) or simply the single fittest (single-objective).
///
/// Replaced wholesale (not merged in place) by the maintainer each
/// generation; owns clones of its genomes so their lifetime is independent
/// of the live population.
#[derive(Default)]
pub struct BestSet {
    genomes: Vec<Box<dyn Genome>>,
}

impl BestSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn genomes(&self) -> &[Box<dyn Genome>] {
        &self.genomes
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    pub fn clear(&mut self) {
        self.genomes.clear();
    }

    /// Replaces the contents wholesale. The caller (the best-set
    /// maintainer) is responsible for ensuring `genomes` is already an
    /// antichain.
    pub fn replace(&mut self, genomes: Vec<Box<dyn Genome>>) {
        self.genomes = genomes;
    }
}
