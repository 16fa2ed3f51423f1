pub mod agent_trait;
pub mod compliance;
pub mod forecasting;
pub mod fraud;
pub mod reconciliation;
pub mod routing;
pub mod simulation;
pub mod types;

pub use agent_trait::{run_bounded, Agent};
pub use compliance::ComplianceAgent;
pub use forecasting::ForecastingAgent;
pub use fraud::FraudAgent;
pub use reconciliation::ReconciliationAgent;
pub use routing::{agents_for, dispatch, Intent};
pub use simulation::SimulationAgent;
pub use types::{AgentResult, Evidence, GraphNeighborhood, TimeSeriesPoint, TimeSeriesWindow, VectorHit};
