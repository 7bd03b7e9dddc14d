pub mod agent;
pub mod factory;
pub mod tooling;

pub use agent::Agent;
pub use factory::build_agent;
