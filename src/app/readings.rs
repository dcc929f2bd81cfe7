//! Sensor reading types.

/// Plausible air temperature window (°C).
pub const TEMPERATURE_RANGE_C: core::ops::RangeInclusive<f32> = -40.0..=80.0;

/// Plausible relative humidity window (%).
pub const HUMIDITY_RANGE_PERCENT: core::ops::RangeInclusive<f32> = 0.0..=100.0;

/// Raw output of the climate sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_percent: f32,
}

/// One sampling period's worth of data, as queued for publication.
///
/// `None` in a climate field means the sub-reading was NaN, out of range,
/// or the sensor did not answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature_c: Option<f32>,
    pub air_humidity_percent: Option<f32>,
    pub soil_moisture_percent: u8,
    pub valid: bool,
}

impl SensorReading {
    /// Build a reading, screening each climate field for well-formedness.
    /// The reading is valid only if every field survives.
    pub fn new(climate: Option<ClimateReading>, soil_moisture_percent: u8) -> Self {
        let temperature_c = climate
            .map(|c| c.temperature_c)
            .filter(|t| TEMPERATURE_RANGE_C.contains(t));
        let air_humidity_percent = climate
            .map(|c| c.humidity_percent)
            .filter(|h| HUMIDITY_RANGE_PERCENT.contains(h));
        let soil_moisture_percent = soil_moisture_percent.min(100);

        Self {
            temperature_c,
            air_humidity_percent,
            soil_moisture_percent,
            valid: temperature_c.is_some() && air_humidity_percent.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn climate(t: f32, h: f32) -> Option<ClimateReading> {
        Some(ClimateReading {
            temperature_c: t,
            humidity_percent: h,
        })
    }

    #[test]
    fn well_formed_reading_is_valid() {
        let r = SensorReading::new(climate(24.5, 55.0), 42);
        assert!(r.valid);
        assert_eq!(r.temperature_c, Some(24.5));
        assert_eq!(r.air_humidity_percent, Some(55.0));
        assert_eq!(r.soil_moisture_percent, 42);
    }

    #[test]
    fn nan_marks_field_and_reading_invalid() {
        let r = SensorReading::new(climate(f32::NAN, 55.0), 42);
        assert!(!r.valid);
        assert_eq!(r.temperature_c, None);
        assert_eq!(r.air_humidity_percent, Some(55.0));
    }

    #[test]
    fn out_of_range_humidity_is_invalid() {
        let r = SensorReading::new(climate(20.0, 140.0), 10);
        assert!(!r.valid);
        assert_eq!(r.air_humidity_percent, None);
    }

    #[test]
    fn missing_climate_is_invalid() {
        let r = SensorReading::new(None, 70);
        assert!(!r.valid);
        assert_eq!(r.soil_moisture_percent, 70);
    }
}
