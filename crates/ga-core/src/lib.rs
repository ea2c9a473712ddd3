//! Core traits and data types for the distributed genetic algorithm
//! runtime: the Factory contract, the genome capability set, population
//! storage, GA parameters, and the shared domination/selection primitives
//! the engine, sorter, and distribution layer all build on.

pub mod best_set;
pub mod codec;
pub mod factory;
pub mod genome;
pub mod objective;
pub mod params;
pub mod population;
pub mod random_provider;
pub mod selector;

pub use best_set::BestSet;
pub use codec::{ByteReader, ByteWriter, MemoryBuffer};
pub use factory::{Factory, FactoryRegistry};
pub use genome::{EmptyParams, FactoryParams, Genome, GenomeWrapper};
pub use objective::{dominates, get_pair_mut};
pub use params::GaParams;
pub use population::{MIN_POPULATION_SIZE, Population};
pub use selector::pick_index;

pub mod prelude {
    pub use super::best_set::BestSet;
    pub use super::codec::{ByteReader, ByteWriter, MemoryBuffer};
    pub use super::factory::{Factory, FactoryRegistry};
    pub use super::genome::{EmptyParams, FactoryParams, Genome, GenomeWrapper};
    pub use super::objective::{dominates, get_pair_mut};
    pub use super::params::GaParams;
    pub use super::population::{MIN_POPULATION_SIZE, Population};
    pub use super::random_provider;
    pub use super::selector::pick_index;
}
