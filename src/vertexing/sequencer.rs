use crate::errors::Error;
use log::info;
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Runs an algorithm over events in parallel
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequencer {
    /// Maximum number of events to process
    #[serde(default = "Sequencer::default_events")]
    pub events: usize,
    /// `-1` uses every core, otherwise a pool of exactly this many threads
    #[serde(default = "Sequencer::default_num_threads")]
    pub num_threads: i64,
}

impl Sequencer {
    fn default_events() -> usize {
        100
    }
    fn default_num_threads() -> i64 {
        -1
    }

    pub fn new(events: usize, num_threads: i64) -> Self {
        return Sequencer { events, num_threads };
    }

    /// Apply `algorithm` to the first `events` inputs
    ///
    /// Results are returned in input order. The first error stops the run.
    pub fn run<E, T, F>(&self, inputs: &[E], algorithm: F) -> Result<Vec<T>, Error>
    where
        E: Sync,
        T: Send,
        F: Fn(&E) -> Result<T, Error> + Sync + Send,
    {
        let n_events: usize = self.events.min(inputs.len());
        let inputs: &[E] = &inputs[..n_events];

        let start_time: Instant = Instant::now();
        let results: Result<Vec<T>, Error> = if self.num_threads > 0 {
            let pool = ThreadPoolBuilder::new().num_threads(self.num_threads as usize).build()?;
            pool.install(|| inputs.par_iter().map(|input| algorithm(input)).collect())
        } else {
            inputs.par_iter().map(|input| algorithm(input)).collect()
        };
        let duration: Duration = start_time.elapsed();
        info!("processed {} events in {:?}", n_events, duration);

        return results;
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self {
            events: Self::default_events(),
            num_threads: Self::default_num_threads(),
        }
    }
}

#[test]
fn test_sequencer_keeps_event_order() {
    let inputs: Vec<u64> = (0..500).collect();
    let sequencer: Sequencer = Sequencer::default();
    let squares: Vec<u64> = sequencer.run(&inputs, |x| Ok(x * x)).unwrap();
    assert_eq!(squares.len(), 100);
    assert!(squares.iter().enumerate().all(|(i, &square)| square == (i * i) as u64));
}

#[test]
fn test_sequencer_dedicated_pool_and_errors() {
    let inputs: Vec<u64> = (0..10).collect();
    let sequencer: Sequencer = Sequencer::new(1000, 2);
    let doubled: Vec<u64> = sequencer.run(&inputs, |x| Ok(2 * x)).unwrap();
    assert_eq!(doubled, (0..10).map(|x| 2 * x).collect::<Vec<u64>>());

    let failed = sequencer.run(&inputs, |x| {
        if *x == 7 {
            return Err(Error::EmptyInput { what: format!("event {}", x) });
        }
        return Ok(*x);
    });
    assert!(matches!(failed, Err(Error::EmptyInput { .. })));
}
