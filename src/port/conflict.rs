use crate::config::ServiceDescriptor;
use crate::error::{Error, PortConflict, Result};
use crate::process::ProcessOps;
use std::sync::Arc;

/// Pre-flight check that declared ports are free.
///
/// This is check-then-act: a port can still be taken between the check and
/// the launch. The supervisor's readiness timeout is what catches that.
#[derive(Clone)]
pub struct ConflictDetector {
    ops: Arc<dyn ProcessOps>,
}

impl ConflictDetector {
    pub fn new(ops: Arc<dyn ProcessOps>) -> Self {
        Self { ops }
    }

    /// Collect every occupied port among `services`. Never fails fast.
    pub async fn find_conflicts<'a, I>(&self, services: I) -> Vec<PortConflict>
    where
        I: IntoIterator<Item = &'a ServiceDescriptor>,
    {
        let mut conflicts = Vec::new();
        for service in services {
            let Some(port) = service.port else {
                continue;
            };
            if self.ops.is_port_free(port) {
                continue;
            }
            let pid = self.ops.owner_of_port(port).await;
            tracing::debug!(
                "Port {} for '{}' is occupied (owner: {:?})",
                port,
                service.name,
                pid
            );
            conflicts.push(PortConflict {
                service: service.name.clone(),
                port,
                pid,
            });
        }
        conflicts
    }

    /// Fail with one aggregate error if any port is taken.
    pub async fn check<'a, I>(&self, services: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a ServiceDescriptor>,
    {
        let conflicts = self.find_conflicts(services).await;
        if conflicts.is_empty() {
            Ok(())
        } else {
            Err(Error::PortConflicts(conflicts))
        }
    }
}
