//! Single-objective sphere function: minimize x^2 + y^2. A `Factory` this
//! small is mostly plumbing around `SingleObjectiveDefaults` — the problem
//! itself is only `calculate_fitness`, `reproduce`, and `mutate`.

use ga::prelude::*;
use std::any::Any;
use std::cell::Cell;

struct Point {
    x: f64,
    y: f64,
    fitness: Cell<f64>,
}

impl Point {
    fn random() -> Self {
        Point {
            x: random_provider::range(-10.0..10.0),
            y: random_provider::range(-10.0..10.0),
            fitness: Cell::new(f64::INFINITY),
        }
    }
}

impl Genome for Point {
    fn calculate_fitness(&mut self) {
        self.fitness.set(self.x * self.x + self.y * self.y);
    }

    fn is_fitter_than(&self, other: &dyn Genome) -> bool {
        self.fitness.get() < other.as_any().downcast_ref::<Point>().unwrap().fitness.get()
    }

    fn set_active_fitness_component(&mut self, _index: usize) {}

    fn reproduce(&self, other: &dyn Genome) -> Box<dyn Genome> {
        let other = other.as_any().downcast_ref::<Point>().unwrap();
        Box::new(Point {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            fitness: Cell::new(f64::INFINITY),
        })
    }

    fn clone_genome(&self) -> Box<dyn Genome> {
        Box::new(Point { x: self.x, y: self.y, fitness: Cell::new(self.fitness.get()) })
    }

    fn mutate(&mut self) {
        if random_provider::bool(0.2) {
            self.x += random_provider::range(-0.5..0.5);
        }
        if random_provider::bool(0.2) {
            self.y += random_provider::range(-0.5..0.5);
        }
    }

    fn describe_fitness(&self) -> String {
        format!("{:.6} (x={:.4}, y={:.4})", self.fitness.get(), self.x, self.y)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SphereFactory {
    defaults: SingleObjectiveDefaults,
}

impl SphereFactory {
    fn new() -> Self {
        Self {
            defaults: SingleObjectiveDefaults::new(GaParams {
                beta: 2.5,
                elitism: true,
                ..GaParams::default()
            }),
        }
    }
}

impl Factory for SphereFactory {
    fn number_of_fitness_components(&self) -> usize {
        1
    }

    fn create_new_genome(&self) -> Box<dyn Genome> {
        Box::new(Point::random())
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
        16
    }

    fn maximal_fitness_bytes(&self) -> usize {
        8
    }

    fn write_genome(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()> {
        let p = genome.as_any().downcast_ref::<Point>().unwrap();
        w.write_f64(p.x)?;
        w.write_f64(p.y)
    }

    fn read_genome(&self, r: &mut dyn ByteReader) -> Result<Box<dyn Genome>> {
        let x = r.read_f64()?;
        let y = r.read_f64()?;
        Ok(Box::new(Point { x, y, fitness: Cell::new(f64::INFINITY) }))
    }

    fn write_genome_fitness(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()> {
        w.write_f64(genome.as_any().downcast_ref::<Point>().unwrap().fitness.get())
    }

    fn read_genome_fitness(&self, genome: &mut dyn Genome, r: &mut dyn ByteReader) -> Result<()> {
        let value = r.read_f64()?;
        genome.as_any().downcast_ref::<Point>().unwrap().fitness.set(value);
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
    Population::new(wrappers).expect("sphere demo always seeds at least MIN_POPULATION_SIZE genomes")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let factory = Box::new(SphereFactory::new());
    let population = initial_population(factory.as_ref(), 128);
    let mut engine = GeneticEngine::new(factory, population, Box::new(LocalEvaluator));

    let report = engine.run(100).await?;

    let best = engine.best_set().genomes().first().expect("best-set is non-empty after a run");
    println!(
        "generations={} best_set_size={} best={}",
        report.generations_run, report.best_set_size, best.describe_fitness()
    );

    Ok(())
}
