use std::fmt;

/// A process confirmed alive, either launched by us or rediscovered by probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningService {
    pub name: String,
    pub pid: u32,
    pub port: Option<u16>,
}

impl RunningService {
    pub fn new(name: impl Into<String>, pid: u32, port: Option<u16>) -> Self {
        Self {
            name: name.into(),
            pid,
            port,
        }
    }
}

impl fmt::Display for RunningService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{} (PID {}, port {})", self.name, self.pid, port),
            None => write!(f, "{} (PID {})", self.name, self.pid),
        }
    }
}

/// How a service went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Exited within the grace window after SIGTERM.
    Graceful,
    /// Needed SIGKILL.
    Forced,
    /// Already gone before any signal was sent.
    AlreadyExited,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Graceful => write!(f, "stopped"),
            Termination::Forced => write!(f, "killed"),
            Termination::AlreadyExited => write!(f, "already exited"),
        }
    }
}
