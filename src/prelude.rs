pub use crate::communication::Rank;
pub use crate::density::density_pass;
pub use crate::density::DensityQuery;
pub use crate::density::DensityResult;
pub use crate::density::DensityStats;
pub use crate::extent::Extent;
pub use crate::gradients::gradients_pass;
pub use crate::gradients::GradientQuery;
pub use crate::gradients::GradientResult;
pub use crate::gradients::GradientStats;
pub use crate::kernel::Kernel;
pub use crate::parameters::HydroParameters;
pub use crate::particle::GasState;
pub use crate::particle::Particle;
pub use crate::particle::ParticleId;
pub use crate::particle::ParticleKind;
pub use crate::particle::ParticleStore;
pub use crate::simulation_box::SimulationBox;
pub use crate::tree::NeighborTree;
pub use crate::tree::TreeConfig;
pub use crate::walk::NeighborWalk;
pub use crate::walk::WalkComms;
pub use crate::walk::WalkVisitor;
