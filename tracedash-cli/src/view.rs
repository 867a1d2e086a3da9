use colored::Colorize;
use std::io::Write;

use tracedash_core::dashboard::{DashboardPanel, DashboardTab, DashboardView, PLACEHOLDER};

const TABS: [DashboardTab; 2] = [DashboardTab::MachineStatus, DashboardTab::VehicleMetrics];

/// Prints the dashboard panel to a terminal, redrawing on every render
pub struct TerminalView<W: Write + Send> {
    out: W,
    machine_id: String,
    connected: bool,
    clear_screen: bool,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W, machine_id: impl Into<String>) -> Self {
        Self {
            out,
            machine_id: machine_id.into(),
            connected: false,
            clear_screen: true,
        }
    }

    /// Appends frames instead of redrawing (for logs and pipes)
    pub fn without_clearing(mut self) -> Self {
        self.clear_screen = false;
        self
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn draw(&mut self, panel: &DashboardPanel) -> std::io::Result<()> {
        if self.clear_screen {
            write!(self.out, "\x1B[2J\x1B[H")?;
        }

        let status = if self.connected {
            "connected".green()
        } else {
            "disconnected".red()
        };
        writeln!(self.out, "{} {} ({})", "Machine".bold(), self.machine_id, status)?;

        for tab in TABS {
            writeln!(self.out)?;
            writeln!(self.out, "{}", tab.to_string().bold().underline())?;
            for (field, value) in panel.tab(tab) {
                let value = if value == PLACEHOLDER {
                    value.dimmed()
                } else {
                    value.normal()
                };
                writeln!(self.out, "  {:<20} {}", field.label, value)?;
            }
        }

        writeln!(self.out)?;
        writeln!(
            self.out,
            "{}",
            "Commands: 1/2/3 switch tab, offline, online, q quit".dimmed()
        )?;
        self.out.flush()
    }
}

impl<W: Write + Send> DashboardView for TerminalView<W> {
    fn render(&mut self, panel: &DashboardPanel) {
        if let Err(e) = self.draw(panel) {
            log::warn!("Failed to draw dashboard: {}", e);
        }
    }

    fn connection_status(&mut self, connected: bool) {
        self.connected = connected;
        if connected {
            log::info!("Connected to machine {}", self.machine_id);
        } else {
            log::warn!("Disconnected from machine {}", self.machine_id);
        }
    }
}
