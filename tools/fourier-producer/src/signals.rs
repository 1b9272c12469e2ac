// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Synthetic signal shapes.

use fourier::DataPoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Shortest pause between two samples of one signal (ms)
const MIN_TICK_MS: u64 = 1500;
/// Longest pause between two samples of one signal (ms)
const MAX_TICK_MS: u64 = 3500;

/// Signals produced by an electrolyser plant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    PowerInput,
    WaterFlowRate,
    Temperature,
    HydrogenProductionRate,
    Efficiency,
}

impl Signal {
    pub const ALL: [Signal; 5] = [
        Signal::PowerInput,
        Signal::WaterFlowRate,
        Signal::Temperature,
        Signal::HydrogenProductionRate,
        Signal::Efficiency,
    ];

    /// Type tag carried by the published points
    pub fn name(self) -> &'static str {
        match self {
            Signal::PowerInput => "PowerInput",
            Signal::WaterFlowRate => "WaterFlowRate",
            Signal::Temperature => "Temperature",
            Signal::HydrogenProductionRate => "HydrogenProductionRate",
            Signal::Efficiency => "Efficiency",
        }
    }

    /// Value at `tick`, with `noise` uniform in `[0, 1)`.
    pub fn value(self, tick: u64, noise: f64) -> f64 {
        let i = tick as f64;
        match self {
            Signal::PowerInput => 1000.0 + 500.0 * (0.1 * i).sin(),
            Signal::WaterFlowRate => 50.0 + 10.0 * noise,
            Signal::Temperature => 25.0 + 5.0 * (0.2 * i).sin() + noise,
            Signal::HydrogenProductionRate => 10.0 + 0.1 * i + noise,
            Signal::Efficiency => 90.0 + 5.0 * noise,
        }
    }
}

/// Random pause before the next sample
pub fn tick_interval<R: Rng>(rng: &mut R) -> Duration {
    Duration::from_millis(rng.gen_range(MIN_TICK_MS..=MAX_TICK_MS))
}

/// Sample `signal` forever at random intervals.
///
/// Returns once the receiving side of `tx` is gone.
pub async fn run(signal: Signal, tx: mpsc::Sender<DataPoint>) {
    let mut rng = StdRng::from_entropy();
    let mut tick = 0u64;

    loop {
        tokio::time::sleep(tick_interval(&mut rng)).await;

        let point = DataPoint::now(signal.value(tick, rng.gen::<f64>()), signal.name());
        if tx.send(point).await.is_err() {
            debug!("{} producer stopped", signal.name());
            return;
        }
        tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_distinct() {
        let mut names: Vec<_> = Signal::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[test]
    fn test_value_ranges() {
        for tick in 0..1000 {
            for noise in [0.0, 0.5, 0.999] {
                let power = Signal::PowerInput.value(tick, noise);
                assert!((500.0..=1500.0).contains(&power));

                let flow = Signal::WaterFlowRate.value(tick, noise);
                assert!((50.0..60.0).contains(&flow));

                let temp = Signal::Temperature.value(tick, noise);
                assert!((20.0..31.0).contains(&temp));

                let eff = Signal::Efficiency.value(tick, noise);
                assert!((90.0..95.0).contains(&eff));
            }
        }
    }

    #[test]
    fn test_hydrogen_rate_ramps() {
        let first = Signal::HydrogenProductionRate.value(0, 0.0);
        let later = Signal::HydrogenProductionRate.value(100, 0.0);
        assert!((first - 10.0).abs() < 1e-9);
        assert!((later - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_tick_interval_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let interval = tick_interval(&mut rng);
            assert!(interval >= Duration::from_millis(1500));
            assert!(interval <= Duration::from_millis(3500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_emits_tagged_points() {
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(run(Signal::Temperature, tx));

        let point = rx.recv().await.unwrap();
        assert_eq!(point.data_type, "Temperature");
        assert!((25.0..26.0).contains(&point.value));

        drop(rx);
        task.await.unwrap();
    }
}
