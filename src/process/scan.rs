//! Process lookup by command line.
//!
//! Linux reads `/proc/<pid>/cmdline`. Elsewhere, or when `/proc` cannot be
//! listed, `ps` is asked instead.

use std::time::Duration;
use tokio::process::Command;

const PS_TIMEOUT: Duration = Duration::from_secs(5);

/// Pids whose argument vector is `program` followed by exactly `args`,
/// lowest first. The calling process is never included.
pub async fn find_pids_by_command(program: &str, args: &[String]) -> Vec<u32> {
    #[cfg(target_os = "linux")]
    if let Some(table) = read_proc_cmdlines() {
        return matching(table, program, args);
    }

    matching(read_ps_table().await, program, args)
}

/// Exact argv comparison, the same tokens a launch would pass.
pub fn matches_command(argv: &[String], program: &str, args: &[String]) -> bool {
    match argv.split_first() {
        Some((first, rest)) => first.as_str() == program && rest == args,
        None => false,
    }
}

fn matching(table: Vec<(u32, Vec<String>)>, program: &str, args: &[String]) -> Vec<u32> {
    let own = std::process::id();
    let mut pids: Vec<u32> = table
        .into_iter()
        .filter(|(pid, argv)| *pid != own && matches_command(argv, program, args))
        .map(|(pid, _)| pid)
        .collect();
    pids.sort_unstable();
    pids
}

#[cfg(target_os = "linux")]
fn read_proc_cmdlines() -> Option<Vec<(u32, Vec<String>)>> {
    let entries = std::fs::read_dir("/proc").ok()?;
    let mut table = Vec::new();
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };
        // Gone already, or not ours to read
        let Ok(raw) = std::fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        let argv = parse_cmdline(&raw);
        if !argv.is_empty() {
            table.push((pid, argv));
        }
    }
    Some(table)
}

async fn read_ps_table() -> Vec<(u32, Vec<String>)> {
    let output = match tokio::time::timeout(
        PS_TIMEOUT,
        Command::new("ps").args(["-axo", "pid=,args="]).output(),
    )
    .await
    {
        Ok(Ok(o)) if o.status.success() => o,
        _ => {
            tracing::debug!("ps unavailable, command lookup found nothing");
            return Vec::new();
        }
    };

    parse_ps_output(&String::from_utf8_lossy(&output.stdout))
}

/// NUL-separated argv; kernel threads have an empty one.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_cmdline(raw: &[u8]) -> Vec<String> {
    raw.split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect()
}

/// `ps -o pid=,args=` lines: `  812 postgres -D ./data`.
fn parse_ps_output(stdout: &str) -> Vec<(u32, Vec<String>)> {
    stdout
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let pid = tokens.next()?.parse::<u32>().ok()?;
            let argv: Vec<String> = tokens.map(str::to_string).collect();
            (!argv.is_empty()).then_some((pid, argv))
        })
        .collect()
}
