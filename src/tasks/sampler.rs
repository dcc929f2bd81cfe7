//! Sensor sampler.
//!
//! Every sampling period: read the climate sensor and the soil probe,
//! publish the soil percentage to the shared cell, and queue the reading
//! for the broker link manager if it is valid.  The queue is never waited
//! on; a full queue drops the newest reading.

use log::{debug, warn};

use super::PeriodicTask;
use crate::app::channels::SensorQueue;
use crate::app::ports::SensorPort;
use crate::app::readings::SensorReading;
use crate::app::state::SoilMoistureCell;
use crate::config::SystemConfig;
use crate::sensors::soil::raw_to_percent;

/// What happened to one period's reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    Queued,
    /// Valid but the queue was full.
    Dropped,
    /// Failed screening; not queued.
    Invalid,
}

pub struct SensorSampler<'a, S: SensorPort> {
    sensors: S,
    soil: &'a SoilMoistureCell,
    queue: &'a SensorQueue,
    period_ms: u64,
    adc_dry: u16,
    adc_wet: u16,
}

impl<'a, S: SensorPort> SensorSampler<'a, S> {
    pub fn new(
        sensors: S,
        soil: &'a SoilMoistureCell,
        queue: &'a SensorQueue,
        config: &SystemConfig,
    ) -> Self {
        Self {
            sensors,
            soil,
            queue,
            period_ms: u64::from(config.sample_interval_ms),
            adc_dry: config.soil_adc_dry,
            adc_wet: config.soil_adc_wet,
        }
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn sample(&mut self) -> SampleOutcome {
        let climate = self
            .sensors
            .read_climate()
            .map_err(|e| warn!("Sampler: climate read failed: {}", e))
            .ok();

        let soil_percent = match self.sensors.read_soil_raw() {
            Ok(raw) => {
                let percent = raw_to_percent(raw, self.adc_dry, self.adc_wet);
                // Independent of overall validity: control only needs this field.
                self.soil.store(percent);
                Some(percent)
            }
            Err(e) => {
                warn!("Sampler: soil read failed: {}", e);
                None
            }
        };

        let Some(soil_percent) = soil_percent else {
            return SampleOutcome::Invalid;
        };

        let reading = SensorReading::new(climate, soil_percent);
        if !reading.valid {
            debug!("Sampler: discarding invalid reading {:?}", reading);
            return SampleOutcome::Invalid;
        }

        match self.queue.try_send(reading) {
            Ok(()) => SampleOutcome::Queued,
            Err(_) => {
                warn!("Sampler: sensor queue full, reading dropped");
                SampleOutcome::Dropped
            }
        }
    }
}

impl<S: SensorPort> PeriodicTask for SensorSampler<'_, S> {
    fn name(&self) -> &'static str {
        "sampler"
    }

    fn period_ms(&self) -> u64 {
        self.period_ms
    }

    fn run_once(&mut self) {
        self.sample();
    }
}
