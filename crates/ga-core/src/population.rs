use crate::genome::GenomeWrapper;
use ga_error::{Result, ga_bail};
use std::ops::{Index, IndexMut};

/// The minimum legal population size (§3: `S >= 5 enforced`).
pub const MIN_POPULATION_SIZE: usize = 5;

/// An ordered, fixed-size sequence of [`GenomeWrapper`]. After the sort
/// step, index 0 holds the (or a) best genome.
pub struct Population {
    wrappers: Vec<GenomeWrapper>,
}

impl Population {
    pub fn new(wrappers: Vec<GenomeWrapper>) -> Result<Self> {
        if wrappers.len() < MIN_POPULATION_SIZE {
            ga_bail!(InvalidParameter: "population size {} is below the minimum of {}", wrappers.len(), MIN_POPULATION_SIZE);
        }
        Ok(Self { wrappers })
    }

    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenomeWrapper> {
        self.wrappers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GenomeWrapper> {
        self.wrappers.iter_mut()
    }

    pub fn as_slice(&self) -> &[GenomeWrapper] {
        &self.wrappers
    }

    pub fn as_mut_slice(&mut self) -> &mut [GenomeWrapper] {
        &mut self.wrappers
    }

    pub fn into_vec(self) -> Vec<GenomeWrapper> {
        self.wrappers
    }

    pub fn get_pair_mut(&mut self, i: usize, j: usize) -> (&mut GenomeWrapper, &mut GenomeWrapper) {
        crate::objective::get_pair_mut(&mut self.wrappers, i, j)
    }

    /// Hands ownership of the backing storage to a sorting strategy that
    /// needs to reorder it in place (`ga_sort::concatenate_layers` takes a
    /// `&mut Vec`, not a slice). Pair with [`Population::set_wrappers`].
    pub fn take_wrappers(&mut self) -> Vec<GenomeWrapper> {
        std::mem::take(&mut self.wrappers)
    }

    pub fn set_wrappers(&mut self, wrappers: Vec<GenomeWrapper>) {
        self.wrappers = wrappers;
    }
}

impl Index<usize> for Population {
    type Output = GenomeWrapper;
    fn index(&self, idx: usize) -> &GenomeWrapper {
        &self.wrappers[idx]
    }
}

impl IndexMut<usize> for Population {
    fn index_mut(&mut self, idx: usize) -> &mut GenomeWrapper {
        &mut self.wrappers[idx]
    }
}

impl IntoIterator for Population {
    type Item = GenomeWrapper;
    type IntoIter = std::vec::IntoIter<GenomeWrapper>;
    fn into_iter(self) -> Self::IntoIter {
        self.wrappers.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;
    use std::any::Any;

    struct Dummy;
    impl Genome for Dummy {
        fn calculate_fitness(&mut self) {}
        fn is_fitter_than(&self, _other: &dyn Genome) -> bool {
            false
        }
        fn set_active_fitness_component(&mut self, _index: usize) {}
        fn reproduce(&self, _other: &dyn Genome) -> Box<dyn Genome> {
            Box::new(Dummy)
        }
        fn clone_genome(&self) -> Box<dyn Genome> {
            Box::new(Dummy)
        }
        fn mutate(&mut self) {}
        fn describe_fitness(&self) -> String {
            String::new()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn wrappers(n: usize) -> Vec<GenomeWrapper> {
        (0..n)
            .map(|i| GenomeWrapper::fresh(Box::new(Dummy), i))
            .collect()
    }

    #[test]
    fn rejects_undersized_population() {
        assert!(Population::new(wrappers(4)).is_err());
        assert!(Population::new(wrappers(5)).is_ok());
    }
}
