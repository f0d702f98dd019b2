// ABOUTME: Process entities: PIDs, mailboxes, and the scheduler table

use crate::env::Environment;
use crate::kont::Kont;
use crate::machine::Machine;
use crate::macros::MacroRegistry;
use crate::term::Term;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;
use std::time::Instant;

/// Integer process identity. PID 0 is the top-level process.
pub type Pid = u64;

#[derive(Debug, Clone)]
pub struct Message {
    pub from: Pid,
    pub data: Term,
}

/// What a process is doing from the scheduler's point of view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcState {
    Runnable,
    /// Parked on an empty mailbox; `deadline` set when `recv` had a timeout
    WaitingRecv { deadline: Option<Instant> },
    Dead,
}

/// One actor: its own machine, root environment, macro table, and mailbox.
/// Nothing here is shared with any other process; the only channel between
/// processes is message passing.
#[derive(Debug)]
pub struct Process {
    pub pid: Pid,
    pub machine: Machine,
    pub env: Rc<Environment>,
    pub macros: MacroRegistry,
    pub mailbox: VecDeque<Message>,
    pub state: ProcState,
    /// Continuations to feed the machine on its next slice, program order
    pub pending: Vec<Kont>,
}

impl Process {
    pub fn new(pid: Pid, env: Rc<Environment>, macros: MacroRegistry, pending: Vec<Kont>) -> Self {
        Process {
            pid,
            machine: Machine::new(env.clone()),
            env,
            macros,
            mailbox: VecDeque::new(),
            state: ProcState::Runnable,
            pending,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state != ProcState::Dead
    }

    /// Whether the scheduler can make progress on this process right now
    pub fn is_runnable(&self) -> bool {
        self.state == ProcState::Runnable
            && (!self.pending.is_empty() || self.machine.depth() > 0)
    }
}

/// Process table and PID allocator
#[derive(Debug, Default)]
pub struct Scheduler {
    procs: BTreeMap<Pid, Process>,
    next_pid: Pid,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            procs: BTreeMap::new(),
            next_pid: 0,
        }
    }

    /// Installs a process under a fresh PID and returns it
    pub fn spawn(&mut self, env: Rc<Environment>, macros: MacroRegistry, pending: Vec<Kont>) -> Pid {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.procs.insert(pid, Process::new(pid, env, macros, pending));
        pid
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.procs.get_mut(&pid)
    }

    pub fn is_alive(&self, pid: Pid) -> bool {
        self.procs.get(&pid).is_some_and(Process::is_alive)
    }

    /// PIDs in ascending order
    pub fn pids(&self) -> Vec<Pid> {
        self.procs.keys().copied().collect()
    }

    pub fn alive_pids(&self) -> Vec<Pid> {
        self.procs
            .values()
            .filter(|p| p.is_alive())
            .map(|p| p.pid)
            .collect()
    }

    /// Marks a process dead and discards its queue and mailbox. Returns
    /// false when the PID never existed or was already dead.
    pub fn kill(&mut self, pid: Pid) -> bool {
        match self.procs.get_mut(&pid) {
            Some(proc) if proc.is_alive() => {
                proc.state = ProcState::Dead;
                proc.machine.clear();
                proc.pending.clear();
                proc.mailbox.clear();
                true
            }
            _ => false,
        }
    }

    /// Delivers a message into a mailbox; caller has validated liveness
    pub fn enqueue(&mut self, to: Pid, message: Message) {
        if let Some(proc) = self.procs.get_mut(&to) {
            proc.mailbox.push_back(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_proc(scheduler: &mut Scheduler) -> Pid {
        scheduler.spawn(Environment::new(), MacroRegistry::new(), vec![])
    }

    #[test]
    fn test_pid_zero_first() {
        let mut scheduler = Scheduler::new();
        assert_eq!(empty_proc(&mut scheduler), 0);
        assert_eq!(empty_proc(&mut scheduler), 1);
        assert_eq!(scheduler.pids(), vec![0, 1]);
    }

    #[test]
    fn test_mailbox_is_fifo() {
        let mut scheduler = Scheduler::new();
        let pid = empty_proc(&mut scheduler);
        scheduler.enqueue(
            pid,
            Message {
                from: 9,
                data: Term::Num(1.0),
            },
        );
        scheduler.enqueue(
            pid,
            Message {
                from: 9,
                data: Term::Num(2.0),
            },
        );
        let proc = scheduler.get_mut(pid).unwrap();
        assert_eq!(proc.mailbox.pop_front().unwrap().data, Term::Num(1.0));
        assert_eq!(proc.mailbox.pop_front().unwrap().data, Term::Num(2.0));
    }

    #[test]
    fn test_kill_discards_everything() {
        let mut scheduler = Scheduler::new();
        let pid = empty_proc(&mut scheduler);
        scheduler.enqueue(
            pid,
            Message {
                from: 0,
                data: Term::Nil,
            },
        );
        assert!(scheduler.kill(pid));
        assert!(!scheduler.is_alive(pid));
        assert!(scheduler.get(pid).unwrap().mailbox.is_empty());
        // Killing twice reports false
        assert!(!scheduler.kill(pid));
    }
}
