//! Sensor subsystem — individual drivers and the aggregating [`SensorHub`].
//!
//! The hub owns both sensor drivers and is the sampler's [`SensorPort`].

pub mod climate;
pub mod soil;

use climate::ClimateSensor;
use soil::SoilMoistureSensor;

use crate::app::ports::SensorPort;
use crate::app::readings::ClimateReading;
use crate::error::SensorError;

/// Aggregates all sensor drivers behind one port.
pub struct SensorHub {
    pub climate: ClimateSensor,
    pub soil: SoilMoistureSensor,
}

impl SensorHub {
    /// Construct a new hub.  Drivers are built in main where peripheral
    /// ownership is established.
    pub fn new(climate: ClimateSensor, soil: SoilMoistureSensor) -> Self {
        Self { climate, soil }
    }
}

impl SensorPort for SensorHub {
    fn read_climate(&mut self) -> Result<ClimateReading, SensorError> {
        self.climate.read()
    }

    fn read_soil_raw(&mut self) -> Result<u16, SensorError> {
        self.soil.read_raw()
    }
}
