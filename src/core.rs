use indicatif::{ProgressBar, ProgressStyle};

use crate::error::Result;
use crate::gibbs::Assignment;

pub trait MarkovChain {
    /// Does one full Gibbs sweep over every sampled token.
    fn step(&mut self) -> Result<()>;

    /// Per-document token assignments after the last step.
    fn assignments(&self) -> &[Vec<Assignment>];
}

pub fn run_chain<M>(chain: &mut M, n_steps: usize) -> Result<()>
where
    M: MarkovChain + ?Sized,
{
    for i in 0..n_steps {
        chain.step()?;
        log::debug!("iter: {}", i + 1);
    }
    Ok(())
}

pub fn run_chain_with_progress<M>(chain: &mut M, n_steps: usize, pb: &ProgressBar) -> Result<()>
where
    M: MarkovChain + ?Sized,
{
    pb.set_length(n_steps as u64);

    for i in 0..n_steps {
        chain.step()?;
        log::debug!("iter: {}", i + 1);

        // Update progress bar
        pb.inc(1);
    }

    Ok(())
}

/// Running a chain for a number of sweeps, optionally behind a progress bar.
pub trait ChainRunner: MarkovChain {
    fn run(&mut self, n_steps: usize) -> Result<()> {
        run_chain(self, n_steps)
    }

    fn run_with_progress(&mut self, n_steps: usize, prefix: &str) -> Result<()> {
        let pb = ProgressBar::new(n_steps as u64);
        pb.set_prefix(prefix.to_string());
        pb.set_style(progress_style());

        run_chain_with_progress(self, n_steps, &pb)?;

        pb.finish_with_message("Done!");
        Ok(())
    }
}

impl<T: MarkovChain + ?Sized> ChainRunner for T {}

fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Counts its steps and fails on a chosen one.
    struct Counter {
        steps: usize,
        fail_at: Option<usize>,
        assignments: Vec<Vec<Assignment>>,
    }

    impl MarkovChain for Counter {
        fn step(&mut self) -> Result<()> {
            if self.fail_at == Some(self.steps) {
                return Err(Error::NotInitialized);
            }
            self.steps += 1;
            Ok(())
        }

        fn assignments(&self) -> &[Vec<Assignment>] {
            &self.assignments
        }
    }

    fn counter(fail_at: Option<usize>) -> Counter {
        Counter {
            steps: 0,
            fail_at,
            assignments: Vec::new(),
        }
    }

    #[test]
    fn test_run_steps_n_times() {
        let mut chain = counter(None);
        chain.run(17).unwrap();
        assert_eq!(chain.steps, 17, "Expected 17 steps, got {}", chain.steps);
        chain.run(3).unwrap();
        assert_eq!(chain.steps, 20);
    }

    #[test]
    fn test_run_with_progress() {
        let mut chain = counter(None);
        chain.run_with_progress(5, "test").unwrap();
        assert_eq!(chain.steps, 5);
    }

    #[test]
    fn test_run_stops_at_first_error() {
        let mut chain = counter(Some(4));
        assert!(chain.run(10).is_err());
        assert_eq!(chain.steps, 4);
    }

    #[test]
    fn test_progress_bar_length() {
        let mut chain = counter(None);
        let pb = ProgressBar::hidden();
        run_chain_with_progress(&mut chain, 8, &pb).unwrap();
        assert_eq!(pb.position(), 8);
        assert_eq!(pb.length(), Some(8));
    }
}
