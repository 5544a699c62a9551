// tm-core/src/units.rs

use uom::si::f64::{
    ElectricPotential as UomElectricPotential,
    ThermodynamicTemperature as UomThermodynamicTemperature,
};

// Public canonical unit types (SI, f64)
pub type Voltage = UomElectricPotential;
pub type Temperature = UomThermodynamicTemperature;

#[inline]
pub fn mv(v: f64) -> Voltage {
    use uom::si::electric_potential::millivolt;
    Voltage::new::<millivolt>(v)
}

#[inline]
pub fn degc(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn as_mv(v: Voltage) -> f64 {
    use uom::si::electric_potential::millivolt;
    v.get::<millivolt>()
}

#[inline]
pub fn as_degc(t: Temperature) -> f64 {
    use uom::si::thermodynamic_temperature::degree_celsius;
    t.get::<degree_celsius>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{Tolerances, nearly_equal};

    #[test]
    fn millivolts_round_trip() {
        let v = mv(1650.4);
        assert!(nearly_equal(as_mv(v), 1650.4, Tolerances::default()));
    }

    #[test]
    fn celsius_round_trip() {
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };
        assert!(nearly_equal(as_degc(degc(25.0)), 25.0, tol));
        assert!(nearly_equal(as_degc(degc(-40.0)), -40.0, tol));
    }
}
