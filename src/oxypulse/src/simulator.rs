use std::{io, time::Duration};

use oxypulse_codec::RawSample;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tokio::time::{Instant, sleep_until};

use crate::{ConnectionError, DeviceConnection, Transport};

/// Emits plausible readings at the sensor's line rate, without hardware.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    interval: Duration,
    warm_up: Duration,
    remove_finger_after: Option<Duration>,
    fail_open: bool,
    seed: Option<u64>,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            warm_up: Duration::from_secs(1),
            remove_finger_after: None,
            fail_open: false,
            seed: None,
        }
    }
}

impl SimulatedTransport {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// IR drops below the finger threshold once this much time has passed.
    pub fn remove_finger_after(mut self, after: Option<Duration>) -> Self {
        self.remove_finger_after = after;
        self
    }

    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Transport for SimulatedTransport {
    type Connection = SimulatedConnection;

    async fn open(&self, baud_rate: u32) -> Result<SimulatedConnection, ConnectionError> {
        if self.fail_open {
            return Err(ConnectionError::Unavailable(
                "simulated device refused to open".to_owned(),
            ));
        }

        debug!("Simulated device opened at {} baud", baud_rate);
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let now = Instant::now();

        Ok(SimulatedConnection {
            rng,
            interval: self.interval,
            opened: now,
            next_at: now + self.interval,
            warm_up: self.warm_up,
            remove_finger_after: self.remove_finger_after,
            bpm_total: 0.0,
            bpm_count: 0,
            pending: Vec::new(),
            closed: false,
        })
    }

    fn name(&self) -> String {
        "simulator".to_owned()
    }
}

pub struct SimulatedConnection {
    rng: StdRng,
    interval: Duration,
    opened: Instant,
    next_at: Instant,
    warm_up: Duration,
    remove_finger_after: Option<Duration>,
    bpm_total: f64,
    bpm_count: u32,
    pending: Vec<u8>,
    closed: bool,
}

impl SimulatedConnection {
    fn next_sample(&mut self, elapsed: Duration) -> RawSample {
        let finger_removed = self
            .remove_finger_after
            .is_some_and(|after| elapsed >= after);

        if finger_removed {
            return RawSample {
                ir: Some(self.rng.random_range(1_000..10_000)),
                red: Some(self.rng.random_range(1_000..8_000)),
                ..Default::default()
            };
        }

        let mut sample = RawSample {
            ir: Some(self.rng.random_range(50_000..=100_000)),
            red: Some(self.rng.random_range(40_000..=80_000)),
            ..Default::default()
        };

        // the firmware needs a few beats before it reports rates
        if elapsed < self.warm_up {
            return sample;
        }

        let bpm = tenths(self.rng.random_range(75.0..=80.0));
        self.bpm_total += bpm;
        self.bpm_count += 1;

        sample.bpm = Some(bpm);
        sample.spo2 = Some(tenths(self.rng.random_range(95.0..100.0)));
        sample.avg_bpm = Some((self.bpm_total / f64::from(self.bpm_count)).round() as u32);
        sample
    }
}

fn tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

impl DeviceConnection for SimulatedConnection {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Ok(0);
        }

        if self.pending.is_empty() {
            sleep_until(self.next_at).await;
            let elapsed = self.next_at.duration_since(self.opened);
            self.next_at += self.interval;

            let sample = self.next_sample(elapsed);
            self.pending = format!("{sample}\r\n").into_bytes();
        }

        let len = buf.len().min(self.pending.len());
        buf[..len].copy_from_slice(&self.pending[..len]);
        self.pending.drain(..len);
        Ok(len)
    }

    async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.pending.clear();
            debug!("Simulated device closed");
        }
    }
}
