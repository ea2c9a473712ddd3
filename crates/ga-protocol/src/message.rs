//! Message bodies (§5 / the command table). Genome and fitness payloads
//! are opaque to everything except the problem plug-in, so every function
//! that touches one takes a `&dyn Factory` to do the actual encoding —
//! `ga-protocol` only owns the command id, the counts, and the framing
//! around them.

use crate::command::CommandId;
use ga_core::codec::{ByteReader, ByteWriter, MemoryBuffer};
use ga_core::factory::Factory;
use ga_core::genome::{FactoryParams, Genome};
use ga_core::params::GaParams;
use ga_error::Result;

/// Encodes a command with no payload beyond its id: HELPER_HELLO,
/// CLIENT_HELLO, BUSY, ACCEPT, KEEPALIVE, NO_HELPERS.
pub fn encode_bodyless(command: CommandId) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(command.as_i32())?;
    Ok(buf.into_vec())
}

/// Reads the leading command id off a decoded frame's payload.
pub fn read_command(buf: &mut MemoryBuffer) -> Result<CommandId> {
    CommandId::from_i32(buf.read_i32()?)
}

pub fn encode_factory_result(factory_id: i32, available: bool) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::FactoryResult.as_i32())?;
    buf.write_i32(factory_id)?;
    buf.write_bool(available)?;
    Ok(buf.into_vec())
}

pub fn decode_factory_result(buf: &mut MemoryBuffer) -> Result<(i32, bool)> {
    Ok((buf.read_i32()?, buf.read_bool()?))
}

/// The factory-agnostic prefix of a FACTORY message. The caller reads
/// `factory_params` and `ga_params` itself, once it knows (from
/// `module_name`) which concrete `FactoryParams` to decode into.
pub struct FactoryHeader {
    pub factory_id: i32,
    pub module_name: String,
    pub population_size: i32,
}

pub fn encode_factory(
    factory_id: i32,
    module_name: &str,
    population_size: i32,
    factory_params: &dyn FactoryParams,
    ga_params: &GaParams,
) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::Factory.as_i32())?;
    buf.write_i32(factory_id)?;
    buf.write_string(module_name)?;
    buf.write_i32(population_size)?;
    factory_params.write(&mut buf)?;
    ga_params.write(&mut buf)?;
    Ok(buf.into_vec())
}

pub fn decode_factory_header(buf: &mut MemoryBuffer) -> Result<FactoryHeader> {
    Ok(FactoryHeader {
        factory_id: buf.read_i32()?,
        module_name: buf.read_string()?,
        population_size: buf.read_i32()?,
    })
}

pub fn encode_calculate(
    factory_id: i32,
    genomes: &[&dyn Genome],
    factory: &dyn Factory,
) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::Calculate.as_i32())?;
    buf.write_i32(factory_id)?;
    buf.write_i32(genomes.len() as i32)?;
    for genome in genomes {
        factory.write_genome(*genome, &mut buf)?;
    }
    Ok(buf.into_vec())
}

pub fn decode_calculate(
    buf: &mut MemoryBuffer,
    factory: &dyn Factory,
) -> Result<(i32, Vec<Box<dyn Genome>>)> {
    let factory_id = buf.read_i32()?;
    let count = buf.read_i32()?;
    ga_error::ga_ensure!(count >= 0, Protocol: "negative genome count {}", count);
    let mut genomes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        genomes.push(factory.read_genome(buf)?);
    }
    Ok((factory_id, genomes))
}

pub fn encode_fitness(
    factory_id: i32,
    genomes: &[Box<dyn Genome>],
    factory: &dyn Factory,
) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::Fitness.as_i32())?;
    buf.write_i32(factory_id)?;
    buf.write_i32(genomes.len() as i32)?;
    for genome in genomes {
        factory.write_genome_fitness(genome.as_ref(), &mut buf)?;
    }
    Ok(buf.into_vec())
}

/// Applies a FITNESS reply onto the genomes of an outstanding batch, in
/// the order they were sent — FITNESS carries only fitness values, so the
/// caller must still be holding the genomes CALCULATE was built from.
pub fn decode_fitness_into(
    buf: &mut MemoryBuffer,
    genomes: &mut [Box<dyn Genome>],
    factory: &dyn Factory,
) -> Result<i32> {
    let factory_id = buf.read_i32()?;
    let count = buf.read_i32()?;
    ga_error::ga_ensure!(
        count as usize == genomes.len(),
        Protocol: "fitness count {} does not match outstanding batch size {}",
        count,
        genomes.len()
    );
    for genome in genomes.iter_mut() {
        factory.read_genome_fitness(genome.as_mut(), buf)?;
    }
    Ok(factory_id)
}

/// Encodes a RESULT or CURRENT_BEST body: `int32 count, {genome,
/// fitness}·count`.
pub fn encode_genome_fitness_list(
    command: CommandId,
    genomes: &[Box<dyn Genome>],
    factory: &dyn Factory,
) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(command.as_i32())?;
    buf.write_i32(genomes.len() as i32)?;
    for genome in genomes {
        factory.write_genome(genome.as_ref(), &mut buf)?;
        factory.write_genome_fitness(genome.as_ref(), &mut buf)?;
    }
    Ok(buf.into_vec())
}

pub fn decode_genome_fitness_list(
    buf: &mut MemoryBuffer,
    factory: &dyn Factory,
) -> Result<Vec<Box<dyn Genome>>> {
    let count = buf.read_i32()?;
    ga_error::ga_ensure!(count >= 0, Protocol: "negative result count {}", count);
    let mut genomes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let mut genome = factory.read_genome(buf)?;
        factory.read_genome_fitness(genome.as_mut(), buf)?;
        genomes.push(genome);
    }
    Ok(genomes)
}

/// Builds a FACTORY payload directly from an already-serialized
/// `factory_params ‖ ga_params` blob rather than from live `FactoryParams`/
/// `GaParams` values — used by `ga-net`'s connection manager, which
/// relays a session's FACTORY descriptor to newly-joined or reconnecting
/// helpers without holding a `Factory` instance of its own to re-encode
/// the client's original submission.
pub fn encode_factory_from_parts(
    factory_id: i32,
    module_name: &str,
    population_size: i32,
    params_blob: &[u8],
) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::Factory.as_i32())?;
    buf.write_i32(factory_id)?;
    buf.write_string(module_name)?;
    buf.write_i32(population_size)?;
    let mut out = buf.into_vec();
    out.extend_from_slice(params_blob);
    Ok(out)
}

/// Builds a CALCULATE payload from each genome's pre-serialized bytes
/// (the caller's `Factory::write_genome` output) instead of `&dyn Genome`
/// references, for the same reason as [`encode_factory_from_parts`].
pub fn encode_calculate_from_parts(factory_id: i32, ordered_genome_bytes: &[Vec<u8>]) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::Calculate.as_i32())?;
    buf.write_i32(factory_id)?;
    buf.write_i32(ordered_genome_bytes.len() as i32)?;
    let mut out = buf.into_vec();
    for bytes in ordered_genome_bytes {
        out.extend_from_slice(bytes);
    }
    Ok(out)
}

/// Builds a GENERATION_INFO payload from an opaque
/// `writeCommonGenerationInfo` blob, for the same reason as
/// [`encode_factory_from_parts`].
pub fn encode_generation_info_from_bytes(factory_id: i32, payload: &[u8]) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::GenerationInfo.as_i32())?;
    buf.write_i32(factory_id)?;
    let mut out = buf.into_vec();
    out.extend_from_slice(payload);
    Ok(out)
}

pub fn encode_generation_info(factory_id: i32, factory: &dyn Factory) -> Result<Vec<u8>> {
    let mut buf = MemoryBuffer::new();
    buf.write_i32(CommandId::GenerationInfo.as_i32())?;
    buf.write_i32(factory_id)?;
    factory.write_common_generation_info(&mut buf)?;
    Ok(buf.into_vec())
}

pub fn decode_generation_info(buf: &mut MemoryBuffer, factory: &mut dyn Factory) -> Result<i32> {
    let factory_id = buf.read_i32()?;
    factory.read_common_generation_info(buf)?;
    Ok(factory_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ga_core::best_set::BestSet;
    use ga_core::genome::EmptyParams;
    use ga_core::population::Population;
    use std::any::Any;

    struct Scalar(f64);
    impl Genome for Scalar {
        fn calculate_fitness(&mut self) {}
        fn is_fitter_than(&self, other: &dyn Genome) -> bool {
            self.0 < other.as_any().downcast_ref::<Scalar>().unwrap().0
        }
        fn set_active_fitness_component(&mut self, _index: usize) {}
        fn reproduce(&self, _other: &dyn Genome) -> Box<dyn Genome> {
            self.clone_genome()
        }
        fn clone_genome(&self) -> Box<dyn Genome> {
            Box::new(Scalar(self.0))
        }
        fn mutate(&mut self) {}
        fn describe_fitness(&self) -> String {
            self.0.to_string()
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct DemoFactory;
    impl Factory for DemoFactory {
        fn number_of_fitness_components(&self) -> usize {
            1
        }
        fn create_new_genome(&self) -> Box<dyn Genome> {
            Box::new(Scalar(0.0))
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
        fn write_genome(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()> {
            w.write_f64(genome.as_any().downcast_ref::<Scalar>().unwrap().0)
        }
        fn read_genome(&self, r: &mut dyn ByteReader) -> Result<Box<dyn Genome>> {
            Ok(Box::new(Scalar(r.read_f64()?)))
        }
        fn write_genome_fitness(&self, genome: &dyn Genome, w: &mut dyn ByteWriter) -> Result<()> {
            self.write_genome(genome, w)
        }
        fn read_genome_fitness(&self, _genome: &mut dyn Genome, r: &mut dyn ByteReader) -> Result<()> {
            let _ = r.read_f64()?;
            Ok(())
        }
        fn ga_params(&self) -> GaParams {
            GaParams::default()
        }
        fn set_ga_params(&mut self, _params: GaParams) {}
        fn sort(&self, _population: &mut Population) {}
        fn update_best_genomes(&self, _population: &Population, _best_set: &mut BestSet) {}
        fn breed(&self, _population: &Population) -> Population {
            unimplemented!("breeding is not exercised by protocol round-trip tests")
        }
        fn introduce_mutations(&self, _population: &mut Population) {}
        fn select_preferred_genome<'a>(&self, best_set: &'a BestSet) -> Option<&'a dyn Genome> {
            best_set.genomes().first().map(|g| g.as_ref())
        }
    }

    #[test]
    fn factory_message_round_trips() {
        let factory_params = EmptyParams;
        let ga_params = GaParams::default();
        let encoded = encode_factory(7, "demo", 64, &factory_params, &ga_params).unwrap();

        let mut buf = MemoryBuffer::from_vec(encoded);
        assert_eq!(read_command(&mut buf).unwrap(), CommandId::Factory);
        let header = decode_factory_header(&mut buf).unwrap();
        assert_eq!(header.factory_id, 7);
        assert_eq!(header.module_name, "demo");
        assert_eq!(header.population_size, 64);

        let mut decoded_params = EmptyParams;
        decoded_params.read(&mut buf).unwrap();
        let decoded_ga_params = GaParams::read(&mut buf).unwrap();
        assert_eq!(decoded_ga_params, ga_params);
    }

    #[test]
    fn calculate_then_fitness_round_trips() {
        let factory = DemoFactory;
        let genomes: Vec<Box<dyn Genome>> =
            vec![Box::new(Scalar(1.0)), Box::new(Scalar(2.0)), Box::new(Scalar(3.0))];
        let refs: Vec<&dyn Genome> = genomes.iter().map(|g| g.as_ref()).collect();

        let calculate = encode_calculate(3, &refs, &factory).unwrap();
        let mut buf = MemoryBuffer::from_vec(calculate);
        assert_eq!(read_command(&mut buf).unwrap(), CommandId::Calculate);
        let (factory_id, decoded) = decode_calculate(&mut buf, &factory).unwrap();
        assert_eq!(factory_id, 3);
        assert_eq!(decoded.len(), 3);

        let mut batch = decoded;
        let fitness = encode_fitness(3, &batch, &factory).unwrap();
        let mut reply = MemoryBuffer::from_vec(fitness);
        assert_eq!(read_command(&mut reply).unwrap(), CommandId::Fitness);
        let factory_id = decode_fitness_into(&mut reply, &mut batch, &factory).unwrap();
        assert_eq!(factory_id, 3);
    }

    #[test]
    fn genome_fitness_list_round_trips() {
        let factory = DemoFactory;
        let genomes: Vec<Box<dyn Genome>> = vec![Box::new(Scalar(5.0)), Box::new(Scalar(6.0))];

        let encoded = encode_genome_fitness_list(CommandId::Result, &genomes, &factory).unwrap();
        let mut buf = MemoryBuffer::from_vec(encoded);
        assert_eq!(read_command(&mut buf).unwrap(), CommandId::Result);
        let decoded = decode_genome_fitness_list(&mut buf, &factory).unwrap();
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn calculate_from_parts_matches_calculate_from_genomes() {
        let factory = DemoFactory;
        let genomes: Vec<Box<dyn Genome>> = vec![Box::new(Scalar(1.0)), Box::new(Scalar(2.0))];
        let refs: Vec<&dyn Genome> = genomes.iter().map(|g| g.as_ref()).collect();
        let from_genomes = encode_calculate(9, &refs, &factory).unwrap();

        let parts: Vec<Vec<u8>> = genomes
            .iter()
            .map(|g| {
                let mut buf = MemoryBuffer::new();
                factory.write_genome(g.as_ref(), &mut buf).unwrap();
                buf.into_vec()
            })
            .collect();
        let from_parts = encode_calculate_from_parts(9, &parts).unwrap();

        assert_eq!(from_genomes, from_parts);
    }

    #[test]
    fn factory_from_parts_round_trips_through_the_header_decoder() {
        let factory_params = EmptyParams;
        let ga_params = GaParams::default();
        let encoded = encode_factory(5, "demo", 32, &factory_params, &ga_params).unwrap();

        let mut buf = MemoryBuffer::from_vec(encoded);
        read_command(&mut buf).unwrap();
        let header = decode_factory_header(&mut buf).unwrap();
        let blob = buf.remaining().to_vec();

        let rebuilt =
            encode_factory_from_parts(header.factory_id, &header.module_name, header.population_size, &blob)
                .unwrap();

        let mut reread = MemoryBuffer::from_vec(rebuilt);
        assert_eq!(read_command(&mut reread).unwrap(), CommandId::Factory);
        let reheader = decode_factory_header(&mut reread).unwrap();
        assert_eq!(reheader.factory_id, 5);
        assert_eq!(reheader.module_name, "demo");
        assert_eq!(reheader.population_size, 32);
    }

    #[test]
    fn bodyless_commands_round_trip() {
        for command in [
            CommandId::HelperHello,
            CommandId::ClientHello,
            CommandId::Busy,
            CommandId::Accept,
            CommandId::Keepalive,
            CommandId::NoHelpers,
        ] {
            let encoded = encode_bodyless(command).unwrap();
            let mut buf = MemoryBuffer::from_vec(encoded);
            assert_eq!(read_command(&mut buf).unwrap(), command);
        }
    }
}
