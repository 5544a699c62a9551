//! Raw reading to engineering units.
//!
//! The transform is linear in two steps:
//!
//! ```text
//! voltage_mV    = raw * VREF_mV / (2^bits - 1)
//! temperature_C = REF_C - (voltage_mV - OFFSET_mV) / SLOPE_mV_per_C
//! ```
//!
//! Defaults are the on-chip temperature sensor constants of the reference
//! board.

use serde::{Deserialize, Serialize};
use tm_core::numeric::{ensure_finite, ensure_positive};
use tm_core::units::{Temperature, Voltage, degc, mv};

use crate::error::{SamplingError, SamplingResult};

/// Largest supported channel resolution.
pub const MAX_RESOLUTION_BITS: u8 = 24;

/// Conversion constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// ADC reference voltage in millivolts.
    pub vref_mv: f64,
    /// Sensor slope in millivolts per degree Celsius.
    pub slope_mv_per_c: f64,
    /// Sensor output at the reference temperature, in millivolts.
    pub offset_mv: f64,
    /// Reference temperature in degrees Celsius.
    pub reference_c: f64,
    /// Channel resolution in bits.
    pub resolution_bits: u8,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            vref_mv: 3300.0,
            slope_mv_per_c: 1.62,
            offset_mv: 716.0,
            reference_c: 25.0,
            resolution_bits: 12,
        }
    }
}

/// One converted reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub voltage_mv: f64,
    pub temperature_c: f64,
}

impl Conversion {
    pub fn voltage(&self) -> Voltage {
        mv(self.voltage_mv)
    }

    pub fn temperature(&self) -> Temperature {
        degc(self.temperature_c)
    }
}

impl ConversionConfig {
    /// # Errors
    ///
    /// `ConfigInvalid` for non-finite constants, a non-positive reference
    /// voltage, a zero slope, or a resolution outside `1..=24` bits.
    pub fn validate(&self) -> SamplingResult<()> {
        ensure_positive(self.vref_mv, "vref_mv")?;
        ensure_finite(self.offset_mv, "offset_mv")?;
        ensure_finite(self.reference_c, "reference_c")?;
        let slope = ensure_finite(self.slope_mv_per_c, "slope_mv_per_c")?;
        if slope == 0.0 {
            return Err(SamplingError::ConfigInvalid {
                what: "slope_mv_per_c must be non-zero".to_string(),
            });
        }
        self.full_scale()?;
        Ok(())
    }

    /// Largest raw value the channel can produce.
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` for a resolution outside `1..=24` bits.
    pub fn full_scale(&self) -> SamplingResult<u32> {
        match self.resolution_bits {
            bits @ 1..=MAX_RESOLUTION_BITS => Ok((1_u32 << bits) - 1),
            bits => Err(SamplingError::ConfigInvalid {
                what: format!("resolution_bits must be in 1..={MAX_RESOLUTION_BITS}, got {bits}"),
            }),
        }
    }

    fn millivolts(&self, raw: u32, full_scale: u32) -> f64 {
        f64::from(raw) * self.vref_mv / f64::from(full_scale)
    }

    pub fn temperature_c(&self, voltage_mv: f64) -> f64 {
        self.reference_c - (voltage_mv - self.offset_mv) / self.slope_mv_per_c
    }

    /// Convert a raw reading.
    ///
    /// # Errors
    ///
    /// - `RawOutOfRange` if `raw` exceeds the channel's full scale
    /// - `ConfigInvalid` if the resolution is unsupported
    pub fn convert(&self, raw: u32) -> SamplingResult<Conversion> {
        let full_scale = self.full_scale()?;
        if raw > full_scale {
            return Err(SamplingError::RawOutOfRange { raw, full_scale });
        }
        let voltage_mv = self.millivolts(raw, full_scale);
        Ok(Conversion {
            voltage_mv,
            temperature_c: self.temperature_c(voltage_mv),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tm_core::units::{as_degc, as_mv};

    #[test]
    fn default_constants_are_valid() {
        let config = ConversionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.full_scale().unwrap(), 4095);
    }

    #[test]
    fn mid_scale_reading() {
        let config = ConversionConfig::default();
        let c = config.convert(2048).unwrap();

        let expected_mv = 2048.0 * 3300.0 / 4095.0;
        let expected_c = 25.0 - (expected_mv - 716.0) / 1.62;
        assert!((c.voltage_mv - expected_mv).abs() < 1e-9);
        assert!((c.temperature_c - expected_c).abs() < 1e-9);

        // Board datasheet worked example, quoted to one decimal.
        assert!((c.voltage_mv - 1650.5).abs() < 0.2);
        assert!((c.temperature_c + 551.85).abs() < 0.1);
    }

    #[test]
    fn end_points() {
        let config = ConversionConfig::default();
        assert_eq!(config.convert(0).unwrap().voltage_mv, 0.0);
        assert!((config.convert(4095).unwrap().voltage_mv - 3300.0).abs() < 1e-9);
    }

    #[test]
    fn offset_voltage_maps_to_reference_temperature() {
        let config = ConversionConfig::default();
        assert!((config.temperature_c(716.0) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_raw_rejected() {
        let config = ConversionConfig::default();
        let err = config.convert(4096).unwrap_err();
        assert!(matches!(
            err,
            SamplingError::RawOutOfRange {
                raw: 4096,
                full_scale: 4095
            }
        ));
    }

    #[test]
    fn invalid_constants_rejected() {
        let zero_slope = ConversionConfig {
            slope_mv_per_c: 0.0,
            ..Default::default()
        };
        assert!(zero_slope.validate().is_err());

        let negative_vref = ConversionConfig {
            vref_mv: -3300.0,
            ..Default::default()
        };
        assert!(negative_vref.validate().is_err());

        let wide = ConversionConfig {
            resolution_bits: 32,
            ..Default::default()
        };
        assert!(wide.validate().is_err());

        let nan_offset = ConversionConfig {
            offset_mv: f64::NAN,
            ..Default::default()
        };
        assert!(nan_offset.validate().is_err());
    }

    #[test]
    fn unsupported_resolution_fails_instead_of_panicking() {
        for bits in [0_u8, 25, 32, 255] {
            let config = ConversionConfig {
                resolution_bits: bits,
                ..Default::default()
            };
            assert!(matches!(
                config.convert(0),
                Err(SamplingError::ConfigInvalid { .. })
            ));
            assert!(config.full_scale().is_err());
        }
        let widest = ConversionConfig {
            resolution_bits: MAX_RESOLUTION_BITS,
            ..Default::default()
        };
        assert_eq!(widest.full_scale().unwrap(), (1 << 24) - 1);
    }

    #[test]
    fn typed_units() {
        let c = ConversionConfig::default().convert(889).unwrap();
        assert!((as_mv(c.voltage()) - c.voltage_mv).abs() < 1e-9);
        assert!((as_degc(c.temperature()) - c.temperature_c).abs() < 1e-9);
    }
}
