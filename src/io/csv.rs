/*!
# I/O Utilities for Saving Chains to CSV

This module writes a finished (or partial) [`ChainState`] to CSV files. Enable via the `csv` feature.
*/

use std::error::Error;
use std::fs::File;

use csv::Writer;

use crate::core::ChainState;

/**
Saves the trajectory of a chain as a CSV file.

The file has a header row `sample,dim_0,dim_1,...` followed by one row per written state.

# Examples

```rust
use mixture_mh::distributions::{MultivariateNormal, RandomWalkGaussian};
use mixture_mh::io::csv::save_csv;
use mixture_mh::metropolis_hastings::MetropolisHastings;
use nalgebra::{DMatrix, DVector};

let target = MultivariateNormal::new(DVector::zeros(2), DMatrix::identity(2, 2)).unwrap();
let proposal = RandomWalkGaussian::isotropic(2, 1.0).unwrap();
let chain = MetropolisHastings::new(target, proposal, &[0.0, 0.0], 10)?.set_seed(1).run()?;

save_csv(&chain, "/tmp/mixture_mh_samples.csv")?;
# Ok::<(), Box<dyn std::error::Error>>(())
```
*/
pub fn save_csv(chain: &ChainState, filename: &str) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);

    let mut header: Vec<String> = vec!["sample".to_string()];
    header.extend((0..chain.dim()).map(|i| format!("dim_{}", i)));
    wtr.write_record(&header)?;

    for (sample_idx, sample) in chain.samples().outer_iter().enumerate() {
        let mut row = vec![sample_idx.to_string()];
        row.extend(sample.iter().map(|v| v.to_string()));
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Saves the per-step diagnostics as `step,alpha,accept_prob,accepted`.
pub fn save_diagnostics_csv(chain: &ChainState, filename: &str) -> Result<(), Box<dyn Error>> {
    let mut wtr = Writer::from_writer(File::create(filename)?);
    wtr.write_record(["step", "alpha", "accept_prob", "accepted"])?;

    let alphas = chain.alphas();
    let steps = alphas
        .iter()
        .zip(chain.accept_probs())
        .zip(chain.accepted());
    for (step, ((alpha, accept_prob), accepted)) in steps.enumerate() {
        wtr.write_record(&[
            step.to_string(),
            alpha.to_string(),
            accept_prob.to_string(),
            accepted.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{MultivariateNormal, RandomWalkGaussian};
    use crate::metropolis_hastings::MetropolisHastings;
    use nalgebra::{DMatrix, DVector};
    use std::fs;
    use tempfile::tempdir;

    fn short_chain() -> ChainState {
        let target = MultivariateNormal::new(DVector::zeros(3), DMatrix::identity(3, 3)).unwrap();
        let proposal = RandomWalkGaussian::isotropic(3, 0.5).unwrap();
        MetropolisHastings::new(target, proposal, &[0.0, 0.0, 0.0], 5)
            .unwrap()
            .set_seed(11)
            .run()
            .unwrap()
    }

    #[test]
    fn writes_header_and_one_row_per_state() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("samples.csv");
        let chain = short_chain();
        save_csv(&chain, path.to_str().unwrap())?;

        let contents = fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "sample,dim_0,dim_1,dim_2");
        assert_eq!(lines.len(), 6);

        let first: Vec<f64> = lines[1]
            .split(',')
            .skip(1)
            .map(|v| v.parse().unwrap())
            .collect();
        assert_eq!(first, chain.samples().row(0).to_vec());
        Ok(())
    }

    #[test]
    fn writes_diagnostics() -> Result<(), Box<dyn Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("diagnostics.csv");
        let chain = short_chain();
        save_diagnostics_csv(&chain, path.to_str().unwrap())?;

        let contents = fs::read_to_string(&path)?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "step,alpha,accept_prob,accepted");
        assert_eq!(lines.len(), 5);
        for line in &lines[1..] {
            let accepted = line.rsplit(',').next().unwrap();
            assert!(accepted == "true" || accepted == "false");
        }
        Ok(())
    }
}
