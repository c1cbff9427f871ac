pub mod config;
pub mod orchestrator;

pub use config::SimulationConfig;
pub use orchestrator::{
    frontier, simulate, Allocation, AssetWeight, FrontierReport, Simulation, SimulationReport,
};
