//! Generation lifecycle: `uninstalled → installing → installed → activating → active`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Lifecycle phase of the proxy for one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    #[default]
    Uninstalled,
    Installing,
    /// Installed and waiting to take over.
    Installed,
    Activating,
    Active,
}

impl LifecyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Uninstalled => "uninstalled",
            LifecyclePhase::Installing => "installing",
            LifecyclePhase::Installed => "installed",
            LifecyclePhase::Activating => "activating",
            LifecyclePhase::Active => "active",
        }
    }

    /// Whether `self → next` is a legal step.
    ///
    /// A failed install steps back from `Installing` to whatever phase
    /// preceded it, so `Installing → Uninstalled | Installed | Active` are
    /// all allowed.
    pub fn can_transition_to(self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;
        matches!(
            (self, next),
            (Uninstalled, Installing)
                | (Installed, Installing)
                | (Active, Installing)
                | (Installing, Installed)
                | (Installing, Uninstalled)
                | (Installing, Active)
                | (Installed, Activating)
                | (Activating, Active)
        )
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory registration: current phase plus the generations involved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub phase: LifecyclePhase,
    /// Store currently serving requests.
    pub active_store: Option<String>,
    /// Store installed and waiting to take over.
    pub waiting_store: Option<String>,
}

impl Registration {
    /// Move to `next`, rejecting illegal steps.
    pub fn transition(&mut self, next: LifecyclePhase) -> Result<LifecyclePhase, Error> {
        if !self.phase.can_transition_to(next) {
            return Err(Error::InvalidTransition { from: self.phase.to_string(), to: next.to_string() });
        }
        let previous = self.phase;
        self.phase = next;
        tracing::debug!(from = %previous, to = %next, "lifecycle transition");
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut reg = Registration::default();
        for next in [
            LifecyclePhase::Installing,
            LifecyclePhase::Installed,
            LifecyclePhase::Activating,
            LifecyclePhase::Active,
            LifecyclePhase::Installing,
        ] {
            reg.transition(next).unwrap();
        }
        assert_eq!(reg.phase, LifecyclePhase::Installing);
    }

    #[test]
    fn test_rejects_skipping_install() {
        let mut reg = Registration::default();
        let err = reg.transition(LifecyclePhase::Active).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(reg.phase, LifecyclePhase::Uninstalled);
    }

    #[test]
    fn test_rejects_concurrent_install() {
        let mut reg = Registration::default();
        reg.transition(LifecyclePhase::Installing).unwrap();
        assert!(reg.transition(LifecyclePhase::Installing).is_err());
    }

    #[test]
    fn test_activation_requires_installed() {
        assert!(!LifecyclePhase::Active.can_transition_to(LifecyclePhase::Activating));
        assert!(!LifecyclePhase::Uninstalled.can_transition_to(LifecyclePhase::Activating));
        assert!(LifecyclePhase::Installed.can_transition_to(LifecyclePhase::Activating));
    }

    #[test]
    fn test_failed_install_steps_back() {
        let mut reg = Registration { phase: LifecyclePhase::Active, ..Default::default() };
        let previous = reg.transition(LifecyclePhase::Installing).unwrap();
        reg.transition(previous).unwrap();
        assert_eq!(reg.phase, LifecyclePhase::Active);
    }
}
