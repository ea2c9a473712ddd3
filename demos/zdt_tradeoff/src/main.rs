//! Two-objective trade-off: minimize f1 = x^2 and f2 = (x-2)^2 at once.
//! The Pareto-optimal set is exactly x in [0, 2] — outside that range one
//! objective always has a strictly better point inside it on both
//! objectives. Exercises `MultiObjectiveDefaults` end to end: sorting into
//! `L0 ‖ L1 ‖ ...`, layered breeding, and best-set antichain maintenance.

use ga::prelude::*;
use std::any::Any;
use std::cell::Cell;

struct Candidate {
    x: f64,
    active: Cell<usize>,
    f1: Cell<f64>,
    f2: Cell<f64>,
}

impl Candidate {
    fn random() -> Self {
        Candidate {
            x: random_provider::range(-1.0..3.0),
            active: Cell::new(0),
            f1: Cell::new(f64::INFINITY),
            f2: Cell::new(f64::INFINITY),
        }
    }

    fn active_fitness(&self) -> f64 {
        if self.active.get() == 0 { self.f1.get() } else { self.f2.get() }
    }
}

impl Genome for Candidate {
    fn calculate_fitness(&mut self) {
        self.f1.set(self.x * self.x);
        self.f2.set((self.x - 2.0) * (self.x - 2.0));
    }

    fn is_fitter_than(&self, other: &dyn Genome) -> bool {
        let other = other.as_any().downcast_ref::<Candidate>().unwrap();
        self.active_fitness() < other.active_fitness()
    }

    fn set_active_fitness_component(&mut self, index: usize) {
        self.active.set(index);
    }

    fn reproduce(&self, other: &dyn Genome) -> Box<dyn Genome> {
        let other = other.as_any().downcast_ref::<Candidate>().unwrap();
        Box::new(Candidate {
            x: (self.x + other.x) / 2.0,
            active: Cell::new(0),
            f1: Cell::new(f64::INFINITY),
            f2: Cell::new(f64::INFINITY),
        })
    }

    fn clone_genome(&self) -> Box<dyn Genome> {
        Box::new(Candidate {
            x: self.x,
            active: Cell::new(self.active.get()),
            f1: Cell::new(self.f1.get()),
            f2: Cell::new(self.f2.get()),
        })
    }

    fn mutate(&mut self) {
        if random_provider::bool(0.3) {
            self.x += random_provider::range(-0.2..0.2);
        }
    }

    fn describe_fitness(&self) -> String {
        format!("x={:.4} f1={:.4} f2={:.4}", self.x, self.f1.get(), self.f2.get())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct ZdtFactory {
    defaults: MultiObjectiveDefaults,
}

impl ZdtFactory {
    fn new() -> Self {
        Self {
            defaults: MultiObjectiveDefaults::new(
                2,
                GaParams { beta: 2.5, elitism: true, ..GaParams::default() },
            ),
        }
    }
}

impl Factory for ZdtFactory {
    fn number_of_fitness_components(&self) -> usize {
        self.defaults.components()
    }

    fn create_new_genome(&self) -> Box<dyn Genome> {
        Box::new(Candidate::random())
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
        16
    }

    fn write_genome(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()> {
        w.write_f64(genome.as_any().downcast_ref::<Candidate>().unwrap().x)
    }

    fn read_genome(&self, r: &mut dyn ByteReader) -> Result<Box<dyn Genome>> {
        Ok(Box::new(Candidate {
            x: r.read_f64()?,
            active: Cell::new(0),
            f1: Cell::new(f64::INFINITY),
            f2: Cell::new(f64::INFINITY),
        }))
    }

    fn write_genome_fitness(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()> {
        let c = genome.as_any().downcast_ref::<Candidate>().unwrap();
        w.write_f64(c.f1.get())?;
        w.write_f64(c.f2.get())
    }

    fn read_genome_fitness(&self, genome: &mut dyn Genome, r: &mut dyn ByteReader) -> Result<()> {
        let f1 = r.read_f64()?;
        let f2 = r.read_f64()?;
        let c = genome.as_any().downcast_ref::<Candidate>().unwrap();
        c.f1.set(f1);
        c.f2.set(f2);
        Ok(())
    }

    fn ga_params(&self) -> GaParams {
        self.defaults.params()
    }

    fn set_ga_params(&mut self, params: GaParams) {
        self.defaults.set_params(params);
    }

    fn sort(&self, population: &mut Population) {
        self.defaults.sort(population);
    }

    fn update_best_genomes(&self, population: &Population, best_set: &mut BestSet) {
        self.defaults.update_best_genomes(population, best_set);
    }

    fn breed(&self, population: &Population) -> Population {
        self.defaults.breed(population)
    }

    fn introduce_mutations(&self, population: &mut Population) {
        self.defaults.introduce_mutations(population);
    }

    fn select_preferred_genome<'a>(&self, best_set: &'a BestSet) -> Option<&'a dyn Genome> {
        self.defaults.select_preferred_genome(best_set)
    }
}

fn initial_population(factory: &dyn Factory, size: usize) -> Population {
    let wrappers = (0..size)
        .map(|i| GenomeWrapper::fresh(factory.create_new_genome(), i))
        .collect();
    Population::new(wrappers).expect("zdt demo always seeds at least MIN_POPULATION_SIZE genomes")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let factory = Box::new(ZdtFactory::new());
    let population = initial_population(factory.as_ref(), 200);
    let mut engine = GeneticEngine::new(factory, population, Box::new(LocalEvaluator));

    let report = engine.run(200).await?;

    println!("generations={} best_set_size={}", report.generations_run, report.best_set_size);
    for genome in engine.best_set().genomes() {
        println!("  {}", genome.describe_fitness());
    }

    Ok(())
}
