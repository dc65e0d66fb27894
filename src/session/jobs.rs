//! Background job table: `PID -> job` for `jobs`/`fg`/`bg`/`kill`.

use std::collections::BTreeMap;

use super::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub pid: u32,
    pub command: String,
    pub status: JobStatus,
    pub user: String,
    /// Messages queued for the job (e.g. signals), an uncapped FIFO.
    pub messages: Vec<String>,
}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: BTreeMap<u32, Job>,
    next_pid: u32,
}

impl JobTable {
    pub fn new() -> Self {
        Self { jobs: BTreeMap::new(), next_pid: 100 }
    }

    pub fn spawn(&mut self, command: &str, user: &str) -> u32 {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.jobs.insert(
            pid,
            Job { pid, command: command.to_string(), status: JobStatus::Running, user: user.to_string(), messages: Vec::new() },
        );
        pid
    }

    pub fn get(&self, pid: u32) -> Option<&Job> {
        self.jobs.get(&pid)
    }

    pub fn list(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn set_status(&mut self, pid: u32, status: JobStatus) -> Result<()> {
        self.jobs.get_mut(&pid).ok_or(Error::NoSuchJob)?.status = status;
        Ok(())
    }

    pub fn send_message(&mut self, pid: u32, message: &str) -> Result<()> {
        self.jobs.get_mut(&pid).ok_or(Error::NoSuchJob)?.messages.push(message.to_string());
        Ok(())
    }

    pub fn remove(&mut self, pid: u32) -> Result<Job> {
        self.jobs.remove(&pid).ok_or(Error::NoSuchJob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_signal_job() {
        let mut table = JobTable::new();
        let pid = table.spawn("sleep 10", "alice");
        table.set_status(pid, JobStatus::Stopped).unwrap();
        assert_eq!(table.get(pid).unwrap().status, JobStatus::Stopped);
        table.send_message(pid, "CONT").unwrap();
        assert_eq!(table.get(pid).unwrap().messages, vec!["CONT".to_string()]);
    }
}
