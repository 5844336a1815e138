//! Terminal-facing capability implementations: stdin confirmation and a
//! line-per-event progress display.

use std::io::{self, BufRead, Write};
use std::net::SocketAddr;

use proxyfleet_core::Confirm;
use proxyfleet_rollout::ProgressObserver;

/// Asks the operator on stdin. Anything other than `y`/`yes` declines.
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        println!("{prompt} y/n");
        print!("> ");
        let _ = io::stdout().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

/// Prints rollout progress as it happens.
pub struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_publish_started(&self, version: &str, groups: u32, total_servers: u32) {
        println!(
            "Publishing version '{version}' to {total_servers} nginx servers across {groups} server groups."
        );
    }

    fn on_ingress_ready(&self, addr: SocketAddr) {
        println!("Awaiting completion reports on {addr}...");
    }

    fn on_report(&self, group: &str, group_done: u32, fleet_done: u32, total_servers: u32) {
        println!("{group}: {group_done} server(s) done ({fleet_done}/{total_servers} fleet-wide).");
    }

    fn on_group_completed(&self, group: &str) {
        println!("{group} Completed Version Publishing!");
    }
}
