use super::Parameter;
use serde::{Deserialize, Serialize};

/// Aggregated weather inputs for one advisory request.
///
/// Any field may be unset; rules on an unset parameter are skipped rather
/// than treated as matched or failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// Precipitation in mm (4-day total)
    pub precipitation: Option<f64>,
    /// Relative humidity in percent (4-day average)
    pub humidity: Option<f64>,
    /// Air temperature in °C (4-day average)
    pub temperature: Option<f64>,
    /// Precipitation / potential evapotranspiration (10-day total)
    pub p_pet: Option<f64>,
}

impl WeatherReading {
    pub fn value_for(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Precipitation => self.precipitation,
            Parameter::RelativeHumidity => self.humidity,
            Parameter::Temperature => self.temperature,
            Parameter::PPet => self.p_pet,
        }
    }

    pub fn is_empty(&self) -> bool {
        Parameter::ALL.iter().all(|p| self.value_for(*p).is_none())
    }

    /// Fill fields that are unset here from `other`. Set fields win.
    pub fn or(self, other: &WeatherReading) -> WeatherReading {
        WeatherReading {
            precipitation: self.precipitation.or(other.precipitation),
            humidity: self.humidity.or(other.humidity),
            temperature: self.temperature.or(other.temperature),
            p_pet: self.p_pet.or(other.p_pet),
        }
    }
}
