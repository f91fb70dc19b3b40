//! Port occupancy and owner lookup.
//!
//! Occupancy is decided by trying to bind; owner lookup shells out to `ss`
//! and then `lsof` and is strictly best-effort.

use std::collections::HashSet;
use tokio::process::Command;

/// Check if a port is available (can bind to it).
///
/// On macOS, binding to 127.0.0.1 can succeed even when 0.0.0.0 is in use,
/// so both addresses are checked.
pub fn is_port_available(port: u16) -> bool {
    std::net::TcpListener::bind(("127.0.0.1", port)).is_ok()
        && std::net::TcpListener::bind(("0.0.0.0", port)).is_ok()
}

/// Find every PID listening on a port (cross-platform, best-effort).
pub async fn find_pids_on_port(port: u16) -> Vec<u32> {
    let mut pids = Vec::new();

    #[cfg(target_os = "linux")]
    {
        pids.extend(find_pids_ss(port).await);
    }

    // lsof fills gaps on Linux and is the only source on macOS
    let seen: HashSet<u32> = pids.iter().copied().collect();
    for pid in find_pids_lsof(port).await {
        if !seen.contains(&pid) {
            pids.push(pid);
        }
    }

    pids
}

#[cfg(target_os = "linux")]
async fn find_pids_ss(port: u16) -> Vec<u32> {
    let output = match Command::new("ss")
        .args(["-tlnpH", &format!("sport = :{}", port)])
        .output()
        .await
    {
        Ok(o) if o.status.success() => o,
        _ => return Vec::new(),
    };

    parse_ss_output(&String::from_utf8_lossy(&output.stdout))
}

async fn find_pids_lsof(port: u16) -> Vec<u32> {
    let output = match Command::new("lsof")
        .args(["-iTCP", &format!("-i:{}", port), "-sTCP:LISTEN", "-P", "-n", "-F", "p"])
        .output()
        .await
    {
        Ok(o) if o.status.success() => o,
        _ => return Vec::new(),
    };

    parse_lsof_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `ss -p` output: the users column looks like
/// `users:(("postgres",pid=812,fd=5),("postgres",pid=813,fd=5))`.
fn parse_ss_output(stdout: &str) -> Vec<u32> {
    let mut pids = Vec::new();
    let mut seen = HashSet::new();

    for line in stdout.lines() {
        for part in line.split(',') {
            if let Some(pid_str) = part.strip_prefix("pid=") {
                if let Ok(pid) = pid_str.trim_end_matches(')').parse::<u32>() {
                    if seen.insert(pid) {
                        pids.push(pid);
                    }
                }
            }
        }
    }

    pids
}

/// Parse `lsof -F p` field output: one `p<PID>` line per process.
fn parse_lsof_output(stdout: &str) -> Vec<u32> {
    let mut pids = Vec::new();
    let mut seen = HashSet::new();

    for line in stdout.lines() {
        if let Some(stripped) = line.strip_prefix('p') {
            if let Ok(pid) = stripped.parse::<u32>() {
                if seen.insert(pid) {
                    pids.push(pid);
                }
            }
        }
    }

    pids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_port_is_not_available() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        assert!(!is_port_available(port));
        drop(listener);
    }

    #[test]
    fn test_parse_ss_output() {
        let out = "LISTEN 0 244 0.0.0.0:5432 0.0.0.0:* users:((\"postgres\",pid=812,fd=5),(\"postgres\",pid=813,fd=5))\n\
                   LISTEN 0 244 [::]:5432 [::]:* users:((\"postgres\",pid=812,fd=6))";
        assert_eq!(parse_ss_output(out), vec![812, 813]);
        assert!(parse_ss_output("").is_empty());
    }

    #[test]
    fn test_parse_lsof_output() {
        let out = "p4021\np4021\np77\nfoo\n";
        assert_eq!(parse_lsof_output(out), vec![4021, 77]);
    }
}
