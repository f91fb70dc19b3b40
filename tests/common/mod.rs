//! In-memory `ProcessOps` for deterministic orchestration tests.
//!
//! Processes are keyed by program name (first token of the command). Time is
//! read from `tokio::time::Instant`, so tests run with a paused clock.

#![allow(dead_code)]

use async_trait::async_trait;
use devswitch::process::{
    LaunchSpec, ProcessHandle, ProcessOps, SignalDelivery, TerminationSignal,
};
use devswitch::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Pid reported for the listening child of a `binds_via_child` process.
pub const CHILD_PID_OFFSET: u32 = 100_000;

/// How a fake program behaves once spawned.
#[derive(Debug, Clone, Default)]
pub struct Behaviour {
    /// `spawn` itself fails.
    pub spawn_fails: bool,
    /// Process dies this long after spawn.
    pub dies_after: Option<Duration>,
    /// Binds its port this long after spawn. `None` never binds.
    pub binds_after: Option<Duration>,
    pub ignores_sigterm: bool,
    /// Survives SIGKILL too.
    pub immortal: bool,
    /// The port is held by a child in the process's group, not by the process.
    pub binds_via_child: bool,
}

impl Behaviour {
    pub fn healthy() -> Self {
        Self {
            binds_after: Some(Duration::from_millis(300)),
            ..Self::default()
        }
    }

    pub fn crashes() -> Self {
        Self {
            dies_after: Some(Duration::from_millis(100)),
            ..Self::default()
        }
    }

    pub fn never_binds() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Spawned { program: String, pid: u32 },
    Signalled { pid: u32, signal: TerminationSignal },
}

#[derive(Debug, Clone)]
struct FakeProcess {
    program: String,
    args: Vec<String>,
    port: Option<u16>,
    spawned_at: Instant,
    killed: bool,
    behaviour: Behaviour,
}

impl FakeProcess {
    fn alive(&self, now: Instant) -> bool {
        !self.killed
            && self
                .behaviour
                .dies_after
                .map_or(true, |d| now < self.spawned_at + d)
    }

    fn bound(&self, now: Instant) -> bool {
        self.alive(now)
            && self
                .behaviour
                .binds_after
                .is_some_and(|d| now >= self.spawned_at + d)
    }
}

#[derive(Default)]
struct State {
    next_pid: u32,
    behaviours: HashMap<String, Behaviour>,
    /// A spawned process binds the port named by its `PORT` env var.
    processes: HashMap<u32, FakeProcess>,
    /// Ports held by processes outside our control.
    foreign_ports: HashMap<u16, Option<u32>>,
    launches: Vec<(LaunchSpec, Instant)>,
    events: Vec<Event>,
}

#[derive(Clone)]
pub struct FakeProcessOps {
    state: Arc<Mutex<State>>,
}

impl Default for FakeProcessOps {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeProcessOps {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                next_pid: 1000,
                ..State::default()
            })),
        }
    }

    pub fn set_behaviour(&self, program: &str, behaviour: Behaviour) {
        self.state
            .lock()
            .behaviours
            .insert(program.to_string(), behaviour);
    }

    /// Mark a port as held by an unrelated process.
    pub fn occupy_port(&self, port: u16, owner: Option<u32>) {
        self.state.lock().foreign_ports.insert(port, owner);
    }

    /// Register an already running process (as if started earlier).
    pub fn add_running(&self, program: &str, port: Option<u16>, behaviour: Behaviour) -> u32 {
        self.add_running_with_args(program, &[], port, behaviour)
    }

    pub fn add_running_with_args(
        &self,
        program: &str,
        args: &[&str],
        port: Option<u16>,
        behaviour: Behaviour,
    ) -> u32 {
        let mut state = self.state.lock();
        let pid = state.next_pid;
        state.next_pid += 1;
        state.processes.insert(
            pid,
            FakeProcess {
                program: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                port,
                spawned_at: Instant::now(),
                killed: false,
                behaviour: Behaviour {
                    binds_after: Some(Duration::ZERO),
                    ..behaviour
                },
            },
        );
        pid
    }

    pub fn launches(&self) -> Vec<(LaunchSpec, Instant)> {
        self.state.lock().launches.clone()
    }

    pub fn launch_of(&self, program: &str) -> Option<(LaunchSpec, Instant)> {
        self.launches().into_iter().find(|(spec, _)| spec.program == program)
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    pub fn signals_for(&self, pid: u32) -> Vec<TerminationSignal> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Signalled { pid: p, signal } if p == pid => Some(signal),
                _ => None,
            })
            .collect()
    }

    /// Pids in the order they received their first SIGTERM.
    pub fn termination_order(&self) -> Vec<u32> {
        let mut order = Vec::new();
        for event in self.events() {
            if let Event::Signalled {
                pid,
                signal: TerminationSignal::Graceful,
            } = event
            {
                if !order.contains(&pid) {
                    order.push(pid);
                }
            }
        }
        order
    }

    pub fn pid_of(&self, program: &str) -> Option<u32> {
        self.state
            .lock()
            .processes
            .iter()
            .find(|(_, p)| p.program == program)
            .map(|(pid, _)| *pid)
    }

    pub fn spawn_count(&self) -> usize {
        self.state.lock().launches.len()
    }
}

struct FakeHandle {
    pid: u32,
    state: Arc<Mutex<State>>,
}

impl ProcessHandle for FakeHandle {
    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }

    fn has_exited(&mut self) -> bool {
        let now = Instant::now();
        self.state
            .lock()
            .processes
            .get(&self.pid)
            .map_or(true, |p| !p.alive(now))
    }
}

#[async_trait]
impl ProcessOps for FakeProcessOps {
    fn spawn(&self, spec: &LaunchSpec) -> Result<Box<dyn ProcessHandle>> {
        let mut state = self.state.lock();
        let now = Instant::now();
        state.launches.push((spec.clone(), now));

        let behaviour = state
            .behaviours
            .get(&spec.program)
            .cloned()
            .unwrap_or_else(Behaviour::healthy);
        if behaviour.spawn_fails {
            return Err(Error::Process(format!("{}: not found", spec.program)));
        }

        let pid = state.next_pid;
        state.next_pid += 1;
        let port = spec.environment.get("PORT").and_then(|p| p.parse().ok());
        state.processes.insert(
            pid,
            FakeProcess {
                program: spec.program.clone(),
                args: spec.args.clone(),
                port,
                spawned_at: now,
                killed: false,
                behaviour,
            },
        );
        state.events.push(Event::Spawned {
            program: spec.program.clone(),
            pid,
        });

        Ok(Box::new(FakeHandle {
            pid,
            state: self.state.clone(),
        }))
    }

    fn is_alive(&self, pid: u32) -> bool {
        let now = Instant::now();
        self.state
            .lock()
            .processes
            .get(&pid)
            .is_some_and(|p| p.alive(now))
    }

    fn terminate(&self, pid: u32, signal: TerminationSignal) -> Result<SignalDelivery> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.events.push(Event::Signalled { pid, signal });

        let Some(process) = state.processes.get_mut(&pid) else {
            return Ok(SignalDelivery::NoSuchProcess);
        };
        if !process.alive(now) {
            return Ok(SignalDelivery::NoSuchProcess);
        }
        let dies = match signal {
            TerminationSignal::Graceful => !process.behaviour.ignores_sigterm,
            TerminationSignal::Forceful => !process.behaviour.immortal,
        };
        if dies {
            process.killed = true;
        }
        Ok(SignalDelivery::Delivered)
    }

    fn is_port_free(&self, port: u16) -> bool {
        let now = Instant::now();
        let state = self.state.lock();
        !state.foreign_ports.contains_key(&port)
            && !state
                .processes
                .values()
                .any(|p| p.port == Some(port) && p.bound(now))
    }

    async fn owner_of_port(&self, port: u16) -> Option<u32> {
        let now = Instant::now();
        let state = self.state.lock();
        if let Some(owner) = state.foreign_ports.get(&port) {
            return *owner;
        }
        state
            .processes
            .iter()
            .find(|(_, p)| p.port == Some(port) && p.bound(now))
            .map(|(pid, p)| {
                if p.behaviour.binds_via_child {
                    pid + CHILD_PID_OFFSET
                } else {
                    *pid
                }
            })
    }

    fn process_group_of(&self, pid: u32) -> Option<u32> {
        let state = self.state.lock();
        if state.processes.contains_key(&pid) {
            return Some(pid);
        }
        let leader = pid.checked_sub(CHILD_PID_OFFSET)?;
        state
            .processes
            .get(&leader)
            .filter(|p| p.behaviour.binds_via_child)
            .map(|_| leader)
    }

    async fn find_by_command(&self, program: &str, args: &[String]) -> Vec<u32> {
        let now = Instant::now();
        let state = self.state.lock();
        let mut pids: Vec<u32> = state
            .processes
            .iter()
            .filter(|(_, p)| p.program == program && p.args == args && p.alive(now))
            .map(|(pid, _)| *pid)
            .collect();
        pids.sort_unstable();
        pids
    }
}
