//! Job table: background and stopped pipelines under interactive
//! control.
//!
//! Each job is one pipeline: a process group with member processes
//! and their states. Completed children are reaped non-blockingly at
//! prompt boundaries and during `wait`; "Done" notifications are
//! deferred to the next prompt so script mode stays silent.

use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;

use crate::sys;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Running,
    Stopped,
    Done(i32),
}

#[derive(Debug, Clone)]
pub struct JobProcess {
    pub pid: Pid,
    pub state: ProcessState,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub id: usize,
    pub pgid: Pid,
    pub processes: Vec<JobProcess>,
    pub command: String,
    /// Completion already reported at a prompt.
    pub notified: bool,
}

impl Job {
    pub fn is_done(&self) -> bool {
        self.processes
            .iter()
            .all(|p| matches!(p.state, ProcessState::Done(_)))
    }

    pub fn is_stopped(&self) -> bool {
        !self.is_done()
            && self
                .processes
                .iter()
                .all(|p| !matches!(p.state, ProcessState::Running))
    }

    /// Pipeline status: the last member's exit status.
    pub fn status(&self) -> i32 {
        match self.processes.last().map(|p| p.state) {
            Some(ProcessState::Done(code)) => code,
            _ => 0,
        }
    }

    fn state_label(&self) -> String {
        if self.is_done() {
            let status = self.status();
            if status == 0 {
                "Done".to_string()
            } else {
                format!("Exit {status}")
            }
        } else if self.is_stopped() {
            "Stopped".to_string()
        } else {
            "Running".to_string()
        }
    }
}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    /// Job ids for `%+` and `%-`.
    current: Option<usize>,
    previous: Option<usize>,
}

impl JobTable {
    pub fn add(&mut self, pgid: Pid, pids: Vec<Pid>, command: String) -> usize {
        let id = self.jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1;
        self.jobs.push(Job {
            id,
            pgid,
            processes: pids
                .into_iter()
                .map(|pid| JobProcess {
                    pid,
                    state: ProcessState::Running,
                })
                .collect(),
            command,
            notified: false,
        });
        self.previous = self.current;
        self.current = Some(id);
        id
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }

    pub fn current_id(&self) -> Option<usize> {
        self.current
    }

    /// Record a wait status for whichever job owns the pid. Returns
    /// true when a tracked process changed state.
    pub fn update(&mut self, status: &WaitStatus) -> bool {
        let pid = match status.pid() {
            Some(pid) => pid,
            None => return false,
        };
        for job in &mut self.jobs {
            for process in &mut job.processes {
                if process.pid == pid {
                    process.state = match status {
                        WaitStatus::Exited(_, code) => ProcessState::Done(*code),
                        WaitStatus::Signaled(_, sig, _) => ProcessState::Done(128 + *sig as i32),
                        WaitStatus::Stopped(_, _) => ProcessState::Stopped,
                        WaitStatus::Continued(_) => ProcessState::Running,
                        _ => return true,
                    };
                    return true;
                }
            }
        }
        false
    }

    /// Non-blocking reap of every waitable child.
    pub fn reap(&mut self) {
        while let Ok(Some(status)) = sys::wait_any_nonblocking() {
            self.update(&status);
        }
    }

    /// Resolve a jobspec: `%n`, `%%`/`%+`, `%-`, `%string`,
    /// `%?substring`.
    pub fn resolve(&self, spec: &str) -> Option<usize> {
        let body = spec.strip_prefix('%')?;
        match body {
            "" | "%" | "+" => self.current,
            "-" => self.previous.or(self.current),
            _ => {
                if let Ok(n) = body.parse::<usize>() {
                    return self.get(n).map(|j| j.id);
                }
                if let Some(substring) = body.strip_prefix('?') {
                    return self
                        .jobs
                        .iter()
                        .find(|j| j.command.contains(substring))
                        .map(|j| j.id);
                }
                self.jobs
                    .iter()
                    .find(|j| j.command.starts_with(body))
                    .map(|j| j.id)
            }
        }
    }

    /// One `jobs`-style line.
    pub fn format_job(&self, job: &Job) -> String {
        let mark = if Some(job.id) == self.current {
            '+'
        } else if Some(job.id) == self.previous {
            '-'
        } else {
            ' '
        };
        format!("[{}]{}  {}\t{}", job.id, mark, job.state_label(), job.command)
    }

    /// Report newly finished jobs (interactive prompt boundary) and
    /// drop them from the table.
    pub fn notify_and_sweep(&mut self, mut report: impl FnMut(&str)) {
        let mut done_ids = Vec::new();
        for job in &mut self.jobs {
            if job.is_done() && !job.notified {
                job.notified = true;
                done_ids.push(job.id);
            }
        }
        for id in &done_ids {
            if let Some(job) = self.jobs.iter().find(|j| j.id == *id) {
                report(&self.format_job(job));
            }
        }
        self.sweep();
    }

    /// Drop finished jobs without reporting (script mode).
    pub fn sweep(&mut self) {
        self.jobs.retain(|j| !j.is_done());
        if self.current.map_or(false, |id| self.get(id).is_none()) {
            self.current = self.previous.take();
        }
        if self.previous.map_or(false, |id| self.get(id).is_none()) {
            self.previous = None;
        }
        if self.current.is_none() {
            self.current = self.jobs.last().map(|j| j.id);
        }
    }

    pub fn remove(&mut self, id: usize) {
        self.jobs.retain(|j| j.id != id);
        if self.current == Some(id) {
            self.current = self.previous.take();
        }
        if self.previous == Some(id) {
            self.previous = None;
        }
    }

    /// Find the job containing a pid.
    pub fn job_of_pid(&self, pid: Pid) -> Option<usize> {
        self.jobs
            .iter()
            .find(|j| j.processes.iter().any(|p| p.pid == pid))
            .map(|j| j.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_two() -> JobTable {
        let mut table = JobTable::default();
        table.add(Pid::from_raw(100), vec![Pid::from_raw(100)], "sleep 10".into());
        table.add(
            Pid::from_raw(200),
            vec![Pid::from_raw(200), Pid::from_raw(201)],
            "cat | wc".into(),
        );
        table
    }

    #[test]
    fn jobspec_resolution() {
        let table = table_with_two();
        assert_eq!(table.resolve("%1"), Some(1));
        assert_eq!(table.resolve("%2"), Some(2));
        assert_eq!(table.resolve("%%"), Some(2));
        assert_eq!(table.resolve("%+"), Some(2));
        assert_eq!(table.resolve("%-"), Some(1));
        assert_eq!(table.resolve("%sleep"), Some(1));
        assert_eq!(table.resolve("%?wc"), Some(2));
        assert_eq!(table.resolve("%9"), None);
        assert_eq!(table.resolve("nope"), None);
    }

    #[test]
    fn update_and_done() {
        let mut table = table_with_two();
        assert!(table.update(&WaitStatus::Exited(Pid::from_raw(200), 0)));
        assert!(!table.get(2).unwrap().is_done());
        assert!(table.update(&WaitStatus::Exited(Pid::from_raw(201), 3)));
        let job = table.get(2).unwrap();
        assert!(job.is_done());
        assert_eq!(job.status(), 3);
    }

    #[test]
    fn signal_death_status() {
        let mut table = JobTable::default();
        table.add(Pid::from_raw(300), vec![Pid::from_raw(300)], "x".into());
        table.update(&WaitStatus::Signaled(
            Pid::from_raw(300),
            nix::sys::signal::Signal::SIGKILL,
            false,
        ));
        assert_eq!(table.get(1).unwrap().status(), 137);
    }

    #[test]
    fn stopped_detection() {
        let mut table = JobTable::default();
        table.add(Pid::from_raw(400), vec![Pid::from_raw(400)], "vi".into());
        table.update(&WaitStatus::Stopped(
            Pid::from_raw(400),
            nix::sys::signal::Signal::SIGTSTP,
        ));
        assert!(table.get(1).unwrap().is_stopped());
    }

    #[test]
    fn sweep_removes_done() {
        let mut table = table_with_two();
        table.update(&WaitStatus::Exited(Pid::from_raw(100), 0));
        table.sweep();
        assert!(table.get(1).is_none());
        assert!(table.get(2).is_some());
    }
}
