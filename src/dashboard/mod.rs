//! Browser dashboard: dataset KPIs with a country filter on one side, the
//! chat assistant panel on the other. Live run progress reaches the page
//! over a WebSocket fed from a broadcast channel.

pub mod routes;
pub mod server;
pub mod state;
pub mod templates;
pub mod websocket;

pub use server::start_dashboard;
pub use state::{BroadcastSink, ChatEvent, DashboardState};
