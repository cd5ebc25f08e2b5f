//! fm-powertrain: power-train models for flightmission.
//!
//! Provides the contract between the mission solver and propulsion:
//! - thrust demand in, fuel/energy consumption and slipstream increments out
//! - optional internal unknowns (battery current, state of charge) exposed as
//!   an implicit residual with analytic partials
//!
//! Reference models:
//! - `FuelPropeller`: piston engine with altitude lapse and part-load bsfc
//! - `BatteryElectric`: battery pack, motor and propeller
//! - `SerialHybrid`: battery and fuel generator on a common bus

pub mod battery;
pub mod common;
pub mod error;
pub mod fuel;
pub mod hybrid;
pub mod slipstream;
pub mod traits;

// Re-exports
pub use battery::{BatteryElectric, BatteryPack};
pub use error::{PowerTrainError, PowerTrainResult};
pub use fuel::{FuelPropeller, PistonEngine};
pub use hybrid::SerialHybrid;
pub use slipstream::{AeroDelta, Slipstream};
pub use traits::{
    OperatingMode, OperatingPoint, PointResponse, PowerDemand, PowerTrain, PowerTrainResponse,
    StatePartials, StateSolution, StateSystem, fuel_remaining, solve_states,
};
