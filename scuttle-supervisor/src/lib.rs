//! Boots and monitors the HTTP/streaming server and the public tunnel as child
//! processes: restart on crash or stdout inactivity, tunnel URL
//! extraction, webhook notification, a best-effort sleep inhibitor, and an
//! optional TCP control port for cooperative shutdown.

mod child;
mod control;
mod error;
mod inhibitor;
mod setup;
mod shutdown;
mod state;
mod url_extract;
mod webhook;

pub use child::ManagedChild;
pub use control::serve as serve_control_port;
pub use error::{Result, SupervisorError};
pub use inhibitor::SleepInhibitor;
pub use setup::{run as run_setup, run_set_webhook};
pub use shutdown::ShutdownSignal;
pub use state::{Supervisor, SupervisorConfig};
pub use url_extract::extract_url;
