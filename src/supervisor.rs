use std::collections::BTreeMap;
use std::io;
use std::process::Child;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Result, TunnelError};
use crate::interrupt::Interrupts;
use crate::store::Store;
use crate::tunnel::TunnelRecord;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Detached; survives this process, output discarded.
    Background,
    /// Attached to the terminal; the caller waits for exit.
    Foreground,
}

/// Starts tunnel processes. Implemented by the cloudflared adapter.
pub trait Launcher {
    fn ensure_authenticated(&self) -> Result<()>;
    fn launch(&self, record: &TunnelRecord, mode: RunMode) -> Result<Child>;
}

struct Entry {
    /// `None` once the handle can no longer be polled; the pid is used instead.
    child: Option<Child>,
    pid: u32,
    started: Instant,
}

/// Table of tunnel processes started by this run of the tool, at most one
/// per name. Not persisted.
pub struct Supervisor {
    running: BTreeMap<String, Entry>,
    grace: Duration,
}

impl Supervisor {
    pub fn new(grace: Duration) -> Self {
        Self {
            running: BTreeMap::new(),
            grace,
        }
    }

    /// Start the named tunnel. Logs in first if the launcher needs it.
    /// Returns the child's pid.
    pub fn start(
        &mut self,
        store: &Store,
        name: &str,
        launcher: &dyn Launcher,
        mode: RunMode,
    ) -> Result<u32> {
        self.reap();

        let record = store
            .get(name)
            .ok_or_else(|| TunnelError::NotFound(name.to_string()))?;
        if self.running.contains_key(name) {
            return Err(TunnelError::AlreadyRunning(name.to_string()));
        }

        launcher.ensure_authenticated()?;
        let child = launcher.launch(&record, mode)?;
        let pid = child.id();
        self.running.insert(
            name.to_string(),
            Entry {
                child: Some(child),
                pid,
                started: Instant::now(),
            },
        );
        info!(name, pid, ?mode, "tunnel started");
        Ok(pid)
    }

    /// Terminate the named tunnel and forget it.
    pub fn stop(&mut self, name: &str) -> Result<()> {
        let mut entry = self
            .running
            .remove(name)
            .ok_or_else(|| TunnelError::NotRunning(name.to_string()))?;
        terminate(&mut entry, self.grace)?;
        info!(name, pid = entry.pid, "tunnel stopped");
        Ok(())
    }

    /// Stop everything, reporting each outcome.
    pub fn stop_all(&mut self) -> Vec<(String, Result<()>)> {
        self.list_running()
            .into_iter()
            .map(|name| {
                let res = self.stop(&name);
                (name, res)
            })
            .collect()
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }

    /// Names with a live entry, sorted.
    pub fn list_running(&self) -> Vec<String> {
        self.running.keys().cloned().collect()
    }

    pub fn pid(&self, name: &str) -> Option<u32> {
        self.running.get(name).map(|e| e.pid)
    }

    pub fn uptime(&self, name: &str) -> Option<Duration> {
        self.running.get(name).map(|e| e.started.elapsed())
    }

    /// Exit notification: drop the entry for a process that ended.
    pub fn on_exit(&mut self, name: &str) {
        if let Some(entry) = self.running.remove(name) {
            info!(name, pid = entry.pid, "tunnel process exited");
        }
    }

    /// Poll every child and deregister the ones that exited. Returns their names.
    pub fn reap(&mut self) -> Vec<String> {
        let mut exited = Vec::new();
        for (name, entry) in self.running.iter_mut() {
            if has_exited(entry) {
                exited.push(name.clone());
            }
        }
        for name in &exited {
            self.on_exit(name);
        }
        exited
    }

    /// Block until a foreground tunnel exits. Ctrl-C received meanwhile is
    /// relayed to the child as SIGTERM; normal interrupt handling resumes
    /// when this returns. Returns the exit code if there is one.
    pub fn wait_foreground(&mut self, name: &str, interrupts: &Interrupts) -> Result<Option<i32>> {
        let _guard = interrupts.forward();

        loop {
            let entry = self
                .running
                .get_mut(name)
                .ok_or_else(|| TunnelError::NotRunning(name.to_string()))?;

            let code = match entry.child.as_mut() {
                Some(child) => match child.try_wait()? {
                    Some(status) => Some(status.code()),
                    None if interrupts.take_pending() => {
                        debug!(name, pid = entry.pid, "relaying interrupt to tunnel");
                        send_signal(entry.pid, libc::SIGTERM)?;
                        let status = wait_with_grace(child, self.grace)?;
                        Some(status.and_then(|s| s.code()))
                    }
                    None => None,
                },
                None => {
                    if interrupts.take_pending() {
                        send_signal(entry.pid, libc::SIGTERM)?;
                    }
                    (!is_pid_alive(entry.pid)).then_some(None)
                }
            };

            if let Some(code) = code {
                self.on_exit(name);
                return Ok(code);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

fn has_exited(entry: &mut Entry) -> bool {
    match entry.child.as_mut() {
        Some(child) => match child.try_wait() {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                warn!(pid = entry.pid, error = %e, "lost process handle, tracking by pid");
                entry.child = None;
                !is_pid_alive(entry.pid)
            }
        },
        None => !is_pid_alive(entry.pid),
    }
}

/// SIGTERM, then SIGKILL after `grace`. A process that is already gone is fine.
fn terminate(entry: &mut Entry, grace: Duration) -> Result<()> {
    match entry.child.as_mut() {
        Some(child) => {
            if child.try_wait()?.is_some() {
                return Ok(());
            }
            send_signal(entry.pid, libc::SIGTERM)?;
            wait_with_grace(child, grace)?;
            Ok(())
        }
        None => send_signal(entry.pid, libc::SIGTERM),
    }
}

fn wait_with_grace(child: &mut Child, grace: Duration) -> Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            warn!(pid = child.id(), "tunnel ignored SIGTERM, killing");
            match child.kill() {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                Err(e) => return Err(e.into()),
            }
            return Ok(Some(child.wait()?));
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Check if a process with the given PID is running.
fn is_pid_alive(pid: u32) -> bool {
    unsafe { libc::kill(pid as i32, 0) == 0 }
}

fn send_signal(pid: u32, signal: libc::c_int) -> Result<()> {
    let ret = unsafe { libc::kill(pid as i32, signal) };
    if ret == 0 {
        return Ok(());
    }
    let err = io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::process::Command;

    /// Spawns `sh -c <script>` in place of cloudflared.
    struct FakeLauncher {
        script: &'static str,
        authenticated: bool,
        launches: Cell<usize>,
    }

    impl FakeLauncher {
        fn sleeping() -> Self {
            Self {
                script: "sleep 30",
                authenticated: true,
                launches: Cell::new(0),
            }
        }

        fn stubborn() -> Self {
            Self {
                script: "trap '' TERM; sleep 30",
                ..Self::sleeping()
            }
        }

        fn exiting() -> Self {
            Self {
                script: "exit 3",
                ..Self::sleeping()
            }
        }
    }

    impl Launcher for FakeLauncher {
        fn ensure_authenticated(&self) -> Result<()> {
            if self.authenticated {
                Ok(())
            } else {
                Err(TunnelError::Auth("login exited with 1".into()))
            }
        }

        fn launch(&self, _record: &TunnelRecord, _mode: RunMode) -> Result<Child> {
            self.launches.set(self.launches.get() + 1);
            Ok(Command::new("sh").args(["-c", self.script]).spawn()?)
        }
    }

    fn store_with(names: &[&str]) -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("tunnels.json"));
        for name in names {
            store
                .add(TunnelRecord::new(name, None, Some("http://localhost:80".into()), None))
                .unwrap();
        }
        (dir, store)
    }

    fn supervisor() -> Supervisor {
        Supervisor::new(Duration::from_secs(2))
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn start_unknown_is_not_found() {
        let (_dir, store) = store_with(&[]);
        let launcher = FakeLauncher::sleeping();
        let err = supervisor()
            .start(&store, "ghost", &launcher, RunMode::Background)
            .unwrap_err();
        assert!(matches!(err, TunnelError::NotFound(_)));
        assert_eq!(launcher.launches.get(), 0);
    }

    #[test]
    fn double_start_is_rejected() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher::sleeping();
        let mut sup = supervisor();

        sup.start(&store, "web", &launcher, RunMode::Background).unwrap();
        let err = sup.start(&store, "web", &launcher, RunMode::Background).unwrap_err();

        assert!(matches!(err, TunnelError::AlreadyRunning(_)));
        assert_eq!(launcher.launches.get(), 1);
        sup.stop("web").unwrap();
    }

    #[test]
    fn stop_then_start_again() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher::sleeping();
        let mut sup = supervisor();

        let pid = sup.start(&store, "web", &launcher, RunMode::Background).unwrap();
        assert!(sup.is_running("web"));
        sup.stop("web").unwrap();
        assert!(!sup.is_running("web"));
        assert!(!is_pid_alive(pid));

        sup.start(&store, "web", &launcher, RunMode::Background).unwrap();
        assert!(sup.is_running("web"));
        sup.stop("web").unwrap();
    }

    #[test]
    fn stop_not_running() {
        let mut sup = supervisor();
        assert!(matches!(sup.stop("web"), Err(TunnelError::NotRunning(_))));
    }

    #[test]
    fn list_running_tracks_entries() {
        let (_dir, store) = store_with(&["alpha", "beta", "gamma"]);
        let launcher = FakeLauncher::sleeping();
        let mut sup = supervisor();

        sup.start(&store, "gamma", &launcher, RunMode::Background).unwrap();
        sup.start(&store, "alpha", &launcher, RunMode::Background).unwrap();
        assert_eq!(sup.list_running(), vec!["alpha", "gamma"]);

        sup.stop("gamma").unwrap();
        assert_eq!(sup.list_running(), vec!["alpha"]);

        let results = sup.stop_all();
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_ok());
        assert!(sup.list_running().is_empty());
    }

    #[test]
    fn auth_failure_leaves_no_entry() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher {
            authenticated: false,
            ..FakeLauncher::sleeping()
        };
        let mut sup = supervisor();
        let err = sup.start(&store, "web", &launcher, RunMode::Background).unwrap_err();
        assert!(matches!(err, TunnelError::Auth(_)));
        assert!(!sup.is_running("web"));
        assert_eq!(launcher.launches.get(), 0);
    }

    #[test]
    fn exited_process_is_reaped() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher::exiting();
        let mut sup = supervisor();

        sup.start(&store, "web", &launcher, RunMode::Background).unwrap();
        assert!(wait_until(|| !sup.reap().is_empty() || !sup.is_running("web")));
        assert!(!sup.is_running("web"));

        // A fresh start is allowed once the old entry is gone.
        sup.start(&store, "web", &launcher, RunMode::Background).unwrap();
    }

    #[test]
    fn stop_kills_after_grace_when_term_is_ignored() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher::stubborn();
        let mut sup = Supervisor::new(Duration::from_secs(1));

        let pid = sup.start(&store, "web", &launcher, RunMode::Background).unwrap();
        // let the shell install its trap before the first signal
        std::thread::sleep(Duration::from_millis(300));

        let began = Instant::now();
        sup.stop("web").unwrap();

        assert!(began.elapsed() >= Duration::from_millis(900));
        assert!(!sup.is_running("web"));
        assert!(!is_pid_alive(pid));
    }

    #[test]
    fn stop_tolerates_already_dead_process() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher::exiting();
        let mut sup = supervisor();

        sup.start(&store, "web", &launcher, RunMode::Background).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        sup.stop("web").unwrap();
        assert!(!sup.is_running("web"));
    }

    #[test]
    fn foreground_wait_returns_exit_code() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher::exiting();
        let mut sup = supervisor();
        let ints = Interrupts::new();

        sup.start(&store, "web", &launcher, RunMode::Foreground).unwrap();
        let code = sup.wait_foreground("web", &ints).unwrap();

        assert_eq!(code, Some(3));
        assert!(!sup.is_running("web"));
        assert!(!ints.is_forwarding());
    }

    #[test]
    fn foreground_interrupt_is_relayed() {
        let (_dir, store) = store_with(&["web"]);
        let launcher = FakeLauncher::sleeping();
        let mut sup = supervisor();
        let ints = Interrupts::new();

        let pid = sup.start(&store, "web", &launcher, RunMode::Foreground).unwrap();
        let remote = ints.clone();
        let raiser = std::thread::spawn(move || {
            assert!(wait_until(|| remote.is_forwarding()));
            remote.raise()
        });

        let code = sup.wait_foreground("web", &ints).unwrap();
        assert!(raiser.join().unwrap());

        // Killed by SIGTERM: no exit code.
        assert_eq!(code, None);
        assert!(!sup.is_running("web"));
        assert!(!is_pid_alive(pid));
        assert!(!ints.is_forwarding());
        assert!(!ints.raise());
    }
}
