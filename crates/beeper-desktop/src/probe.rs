use std::io::IsTerminal;

use beeper_core::capability::{Capabilities, CapabilityProbe};

/// Exact alarms are always available to a desktop process. The status notice
/// needs an interactive terminal to live in.
pub struct TerminalProbe;

impl CapabilityProbe for TerminalProbe {
    fn probe(&self) -> Capabilities {
        Capabilities {
            exact_alarms: true,
            notifications: std::io::stdout().is_terminal(),
        }
    }
}
