use log::debug;
use serde::{Deserialize, Serialize};

/// Host application visibility as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppLifecycle {
    Active,
    /// Transitional: partially obscured (system dialog, app switcher).
    Inactive,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    Foregrounded,
    Backgrounded,
}

/// Turns raw lifecycle reports into foreground/background edges.
///
/// Repeated reports of the same state produce nothing, and `Inactive` is
/// never an edge on its own: `Active -> Inactive -> Active` is a no-op while
/// `Background -> Inactive -> Active` still reports `Foregrounded`.
pub struct LifecycleObserver {
    current: AppLifecycle,
    foreground: bool,
}

impl Default for LifecycleObserver {
    fn default() -> Self {
        Self::new(AppLifecycle::Active)
    }
}

impl LifecycleObserver {
    pub fn new(initial: AppLifecycle) -> Self {
        Self {
            current: initial,
            foreground: initial != AppLifecycle::Background,
        }
    }

    pub fn observe(&mut self, next: AppLifecycle) -> Option<LifecycleTransition> {
        let previous = self.current;
        self.current = next;

        let transition = match next {
            AppLifecycle::Active if !self.foreground => {
                self.foreground = true;
                Some(LifecycleTransition::Foregrounded)
            }
            AppLifecycle::Background if self.foreground => {
                self.foreground = false;
                Some(LifecycleTransition::Backgrounded)
            }
            AppLifecycle::Active | AppLifecycle::Inactive | AppLifecycle::Background => None,
        };

        if let Some(t) = transition {
            debug!("Lifecycle {previous:?} -> {next:?}: {t:?}");
        }
        transition
    }
}
