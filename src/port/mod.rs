pub mod conflict;
pub mod probe;

pub use conflict::ConflictDetector;
pub use probe::{find_pids_on_port, is_port_available};
