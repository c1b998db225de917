use sysinfo::{System, get_current_pid};
use tracing::debug;

/// Tente de retrouver le nom du processus courant.
///
/// Retourne `None` si le PID courant ou le processus ne peuvent pas être
/// inspectés (plateforme non supportée, droits insuffisants...).
pub fn current_process_name() -> Option<String> {
    let pid = match get_current_pid() {
        Ok(pid) => pid,
        Err(e) => {
            debug!("Cannot read current pid: {}", e);
            return None;
        }
    };

    let mut system = System::new();
    if !system.refresh_process(pid) {
        debug!("Cannot refresh process {}", pid);
        return None;
    }

    let name = system.process(pid)?.name().to_string();
    if name.is_empty() { None } else { Some(name) }
}
