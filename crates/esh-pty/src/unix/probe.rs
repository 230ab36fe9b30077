//! Process-table probes.
//!
//! Used after teardown to confirm that the shell under test and everything
//! it started are gone. Zombies count as gone: in a container without a
//! reaping init, an orphaned and killed job can linger as `Z` indefinitely.

use std::fs;

use rustix::io::Errno;
use rustix::process::{Pid, test_kill_process, test_kill_process_group};

/// Check whether a process exists and has not terminated.
#[must_use]
pub fn is_process_alive(pid: u32) -> bool {
    let Some(target) = to_pid(pid) else {
        return false;
    };

    match test_kill_process(target) {
        Ok(()) | Err(Errno::PERM) => {}
        Err(_) => return false,
    }

    // Without procfs the signal probe is the best answer available
    proc_stat(pid).is_none_or(|stat| !stat.is_dead())
}

/// Check whether any live process remains in the process group `pgid`.
#[must_use]
pub fn is_group_alive(pgid: u32) -> bool {
    let Some(target) = to_pid(pgid) else {
        return false;
    };

    match test_kill_process_group(target) {
        Ok(()) | Err(Errno::PERM) => {}
        Err(_) => return false,
    }

    let Ok(entries) = fs::read_dir("/proc") else {
        return true;
    };

    entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter_map(proc_stat)
        .any(|stat| stat.pgrp == pgid && !stat.is_dead())
}

fn to_pid(raw: u32) -> Option<Pid> {
    Pid::from_raw(i32::try_from(raw).ok()?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProcStat {
    state: char,
    pgrp: u32,
}

impl ProcStat {
    const fn is_dead(self) -> bool {
        matches!(self.state, 'Z' | 'X' | 'x')
    }
}

fn proc_stat(pid: u32) -> Option<ProcStat> {
    let raw = fs::read_to_string(format!("/proc/{pid}/stat")).ok()?;
    parse_stat(&raw)
}

/// Parse `pid (comm) state ppid pgrp ...`; `comm` may itself contain spaces
/// and parentheses.
fn parse_stat(raw: &str) -> Option<ProcStat> {
    let rest = &raw[raw.rfind(')')? + 1..];
    let mut fields = rest.split_whitespace();

    let state = fields.next()?.chars().next()?;
    let _ppid = fields.next()?;
    let pgrp = fields.next()?.parse().ok()?;

    Some(ProcStat { state, pgrp })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_stat_line() {
        let stat = parse_stat("4242 (esh) S 1 4242 4242 34816 4242 0").unwrap();
        assert_eq!(stat, ProcStat { state: 'S', pgrp: 4242 });
        assert!(!stat.is_dead());
    }

    #[test]
    fn parse_stat_with_awkward_comm() {
        let stat = parse_stat("77 (a) b (c)) Z 1 70 70 0").unwrap();
        assert_eq!(stat.state, 'Z');
        assert_eq!(stat.pgrp, 70);
        assert!(stat.is_dead());
    }

    #[test]
    fn parse_stat_rejects_garbage() {
        assert!(parse_stat("").is_none());
        assert!(parse_stat("12 (x)").is_none());
    }

    #[test]
    fn current_process_is_alive() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn nonexistent_process_is_not_alive() {
        // Above the default pid_max
        assert!(!is_process_alive(4_000_000));
        assert!(!is_group_alive(4_000_000));
        assert!(!is_process_alive(0));
    }

    #[tokio::test]
    async fn killed_group_is_not_alive() {
        let config = crate::PtyConfig::default();
        let (_master, mut child) = crate::spawn("sleep", ["30"], &config).await.unwrap();
        let pgid = child.pgid();
        assert!(is_group_alive(pgid));

        child.kill().unwrap();
        child.wait().await.unwrap();
        assert!(!is_group_alive(pgid));
    }
}
