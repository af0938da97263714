pub mod energy;
pub mod power;
pub mod probe;
pub mod sampler;

pub use energy::EnergyModel;
pub use power::PowerMeter;
pub use probe::{ProcProbe, ResourceProbe};
pub use sampler::{ResourceSample, Sampler};
