//! Trap table and pending-signal bookkeeping.
//!
//! Handlers never run shell code: they set an atomic flag (via
//! signal-hook) and return. The executor polls between simple
//! commands and dispatches the recorded action strings at those safe
//! points. EXIT, ERR, DEBUG, and RETURN are pseudo-conditions fired
//! explicitly by the executor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use nix::sys::signal::Signal;
use signal_hook::SigId;

use crate::sys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrapCondition {
    Signal(Signal),
    Exit,
    Err,
    Debug,
    Return,
}

impl TrapCondition {
    /// Parse a trap operand: a number, a signal name, or one of the
    /// pseudo-conditions.
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_uppercase().as_str() {
            "EXIT" | "0" => Some(Self::Exit),
            "ERR" => Some(Self::Err),
            "DEBUG" => Some(Self::Debug),
            "RETURN" => Some(Self::Return),
            _ => sys::signal_by_name(text).map(Self::Signal),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Signal(sig) => sig.as_str().to_string(),
            Self::Exit => "EXIT".to_string(),
            Self::Err => "ERR".to_string(),
            Self::Debug => "DEBUG".to_string(),
            Self::Return => "RETURN".to_string(),
        }
    }
}

struct Registration {
    flag: Arc<AtomicBool>,
    id: SigId,
}

/// Per-shell trap state. An empty action string means "ignore";
/// absence means default disposition.
#[derive(Default)]
pub struct TrapState {
    actions: HashMap<TrapCondition, String>,
    registrations: HashMap<i32, Registration>,
    /// Set while a trap action runs, so nested dispatch is deferred.
    pub running: bool,
}

impl TrapState {
    /// Install or replace a trap. `None` restores the default
    /// disposition.
    pub fn set(&mut self, condition: TrapCondition, action: Option<String>) -> Result<(), String> {
        match action {
            None => {
                self.actions.remove(&condition);
                if let TrapCondition::Signal(sig) = condition {
                    self.unregister(sig);
                    sys::set_default(sig);
                }
            }
            Some(action) => {
                if let TrapCondition::Signal(sig) = condition {
                    if matches!(sig, Signal::SIGKILL | Signal::SIGSTOP) {
                        return Err(format!("cannot trap {}", sig.as_str()));
                    }
                    if action.is_empty() {
                        self.unregister(sig);
                        sys::set_ignore(sig);
                    } else {
                        self.register(sig)?;
                    }
                }
                self.actions.insert(condition, action);
            }
        }
        Ok(())
    }

    fn register(&mut self, sig: Signal) -> Result<(), String> {
        let signo = sig as i32;
        if self.registrations.contains_key(&signo) {
            return Ok(());
        }
        let flag = Arc::new(AtomicBool::new(false));
        let id = signal_hook::flag::register(signo, Arc::clone(&flag))
            .map_err(|e| format!("cannot trap {}: {e}", sig.as_str()))?;
        self.registrations.insert(signo, Registration { flag, id });
        Ok(())
    }

    fn unregister(&mut self, sig: Signal) {
        if let Some(registration) = self.registrations.remove(&(sig as i32)) {
            signal_hook::low_level::unregister(registration.id);
        }
    }

    pub fn action(&self, condition: TrapCondition) -> Option<&String> {
        self.actions.get(&condition)
    }

    pub fn has_action(&self, condition: TrapCondition) -> bool {
        self.actions
            .get(&condition)
            .map_or(false, |action| !action.is_empty())
    }

    /// All traps, for `trap` with no operands.
    pub fn listing(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .actions
            .iter()
            .map(|(condition, action)| (condition.name(), action.clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Drain pending signals that have non-empty actions, in signal
    /// order. Called at safe points only.
    pub fn take_pending(&mut self) -> Vec<(Signal, String)> {
        let mut fired = Vec::new();
        for (signo, registration) in &self.registrations {
            if registration.flag.swap(false, Ordering::SeqCst) {
                if let Ok(sig) = Signal::try_from(*signo) {
                    if let Some(action) = self.actions.get(&TrapCondition::Signal(sig)) {
                        if !action.is_empty() {
                            fired.push((sig, action.clone()));
                        }
                    }
                }
            }
        }
        fired.sort_by_key(|(sig, _)| *sig as i32);
        fired
    }

    /// Subshells reset traps to default, keeping explicit ignores.
    pub fn reset_for_subshell(&mut self) {
        let ignored: HashMap<TrapCondition, String> = self
            .actions
            .drain()
            .filter(|(_, action)| action.is_empty())
            .collect();
        let ids: Vec<i32> = self.registrations.keys().copied().collect();
        for signo in ids {
            if let Ok(sig) = Signal::try_from(signo) {
                self.unregister(sig);
                sys::set_default(sig);
            }
        }
        self.actions = ignored;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_conditions() {
        assert_eq!(TrapCondition::parse("EXIT"), Some(TrapCondition::Exit));
        assert_eq!(TrapCondition::parse("0"), Some(TrapCondition::Exit));
        assert_eq!(TrapCondition::parse("err"), Some(TrapCondition::Err));
        assert_eq!(
            TrapCondition::parse("INT"),
            Some(TrapCondition::Signal(Signal::SIGINT))
        );
        assert_eq!(
            TrapCondition::parse("2"),
            Some(TrapCondition::Signal(Signal::SIGINT))
        );
        assert_eq!(TrapCondition::parse("NOSUCH"), None);
    }

    #[test]
    fn exit_trap_recorded() {
        let mut traps = TrapState::default();
        traps.set(TrapCondition::Exit, Some("echo bye".into())).unwrap();
        assert!(traps.has_action(TrapCondition::Exit));
        traps.set(TrapCondition::Exit, None).unwrap();
        assert!(!traps.has_action(TrapCondition::Exit));
    }

    #[test]
    fn kill_stop_refused() {
        let mut traps = TrapState::default();
        assert!(traps
            .set(TrapCondition::Signal(Signal::SIGKILL), Some("x".into()))
            .is_err());
    }

    #[test]
    fn subshell_reset_keeps_ignores() {
        let mut traps = TrapState::default();
        traps.set(TrapCondition::Exit, Some("echo bye".into())).unwrap();
        traps
            .set(TrapCondition::Signal(Signal::SIGUSR1), Some(String::new()))
            .unwrap();
        traps.reset_for_subshell();
        assert!(!traps.has_action(TrapCondition::Exit));
        assert_eq!(
            traps.action(TrapCondition::Signal(Signal::SIGUSR1)).map(String::as_str),
            Some("")
        );
    }
}
