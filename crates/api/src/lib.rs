//! VodWatch HTTP server: EventSub webhook receiver and health probe.

pub mod routes;
pub mod state;
