//! Composition root: loads configuration, constructs every core component, wires
//! the event bus subscriptions, runs the boot-time cleanup sweep, and starts the
//! download worker. The HTTP request surface that would sit on top of this is out
//! of scope — this crate stops at the point where a thin router would take
//! over translating requests into calls on [`AppContext`].

mod context;
mod subscriptions;

pub use context::AppContext;
pub use subscriptions::register_broadcaster_subscriptions;
