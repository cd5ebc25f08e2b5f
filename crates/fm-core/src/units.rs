//! SI quantity types and the constructors used to read mission inputs.
//!
//! Solver internals work on plain `f64` in SI units; `uom` is used where
//! values enter from the outside (project files, power-train ratings).

use uom::si::f64::{
    Angle as UomAngle, Area as UomArea, Length as UomLength, Power as UomPower,
    Velocity as UomVelocity,
};

pub type Angle = UomAngle;
pub type Area = UomArea;
pub type Length = UomLength;
pub type Power = UomPower;
pub type Velocity = UomVelocity;

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn ft(v: f64) -> Length {
    use uom::si::length::foot;
    Length::new::<foot>(v)
}

#[inline]
pub fn nmi(v: f64) -> Length {
    use uom::si::length::nautical_mile;
    Length::new::<nautical_mile>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn kt(v: f64) -> Velocity {
    use uom::si::velocity::knot;
    Velocity::new::<knot>(v)
}

#[inline]
pub fn ft_per_min(v: f64) -> Velocity {
    use uom::si::velocity::foot_per_minute;
    Velocity::new::<foot_per_minute>(v)
}

#[inline]
pub fn deg(v: f64) -> Angle {
    use uom::si::angle::degree;
    Angle::new::<degree>(v)
}

/// Degrees at the interface, radians for every trigonometric evaluation.
#[inline]
pub fn deg_to_rad(v: f64) -> f64 {
    use uom::si::angle::radian;
    deg(v).get::<radian>()
}

#[inline]
pub fn rad_to_deg(v: f64) -> f64 {
    use uom::si::angle::{degree, radian};
    Angle::new::<radian>(v).get::<degree>()
}

/// d(rad)/d(deg), used to scale analytic partials taken in radians.
pub const RAD_PER_DEG: f64 = std::f64::consts::PI / 180.0;

pub mod constants {
    pub const G0_MPS2: f64 = 9.806_65;
    /// ISA sea-level density (kg/m^3)
    pub const RHO0_KGPM3: f64 = 1.225;
    /// Joules per kilowatt-hour
    pub const J_PER_KWH: f64 = 3.6e6;
}
