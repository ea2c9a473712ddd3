use crate::codec::{ByteReader, ByteWriter};
use ga_error::Result;

/// The four scalar knobs that govern selection pressure, recombination,
/// and elite preservation (§3).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaParams {
    pub beta: f64,
    pub crossover_rate: f64,
    pub elitism: bool,
    pub always_include_best: bool,
}

impl Default for GaParams {
    fn default() -> Self {
        Self {
            beta: 2.5,
            crossover_rate: 0.9,
            elitism: true,
            always_include_best: true,
        }
    }
}

impl GaParams {
    pub fn validate(&self) -> Result<()> {
        ga_error::ga_ensure!(
            self.beta >= 0.0,
            InvalidParameter: "beta must be >= 0, got {}",
            self.beta
        );
        ga_error::ga_ensure!(
            (0.0..=1.0).contains(&self.crossover_rate),
            InvalidParameter: "crossoverRate must be in [0, 1], got {}",
            self.crossover_rate
        );
        Ok(())
    }

    pub fn write(&self, w: &mut dyn ByteWriter) -> Result<()> {
        w.write_f64(self.beta)?;
        w.write_f64(self.crossover_rate)?;
        w.write_bool(self.elitism)?;
        w.write_bool(self.always_include_best)?;
        Ok(())
    }

    pub fn read(r: &mut dyn ByteReader) -> Result<Self> {
        let params = Self {
            beta: r.read_f64()?,
            crossover_rate: r.read_f64()?,
            elitism: r.read_bool()?,
            always_include_best: r.read_bool()?,
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MemoryBuffer;

    #[test]
    fn defaults_match_spec() {
        let p = GaParams::default();
        assert_eq!(p.beta, 2.5);
        assert_eq!(p.crossover_rate, 0.9);
        assert!(p.elitism);
        assert!(p.always_include_best);
    }

    #[test]
    fn round_trips_through_bytes() {
        let p = GaParams {
            beta: 1.25,
            crossover_rate: 0.75,
            elitism: false,
            always_include_best: true,
        };
        let mut buf = MemoryBuffer::new();
        p.write(&mut buf).unwrap();

        let mut reader = MemoryBuffer::from_vec(buf.into_vec());
        let read_back = GaParams::read(&mut reader).unwrap();
        assert_eq!(p, read_back);
    }

    #[test]
    fn rejects_out_of_range_crossover_rate() {
        let p = GaParams {
            crossover_rate: 1.5,
            ..GaParams::default()
        };
        assert!(p.validate().is_err());
    }
}
