//! Scriptable host for facade tests

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use procshim_process::{Host, Platform, ProcessError, ProcessIdentity, Result};

pub const SELF_PID: u32 = 4242;

pub struct FakeHost {
    pub platform: Platform,
    pub millis: Mutex<f64>,
    pub exits: Mutex<Vec<i32>>,
    pub kills: Mutex<Vec<(i32, i32)>>,
    pub live_pids: Vec<i32>,
    /// stdout of the identity command; `None` makes it fail
    pub id_output: Option<String>,
    pub native: Option<ProcessIdentity>,
    pub commands: Mutex<Vec<String>>,
    pub load: (f64, f64),
    pub env: BTreeMap<String, String>,
    pub cwd: Mutex<PathBuf>,
}

impl FakeHost {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            millis: Mutex::new(0.0),
            exits: Mutex::new(Vec::new()),
            kills: Mutex::new(Vec::new()),
            live_pids: vec![SELF_PID as i32, 1],
            id_output: Some(
                "uid=501(alice) gid=20(staff) groups=20(staff),12(everyone),61(localaccounts)\n"
                    .to_string(),
            ),
            native: None,
            commands: Mutex::new(Vec::new()),
            load: (1.5, 0.75),
            env: BTreeMap::from([("HOME".to_string(), "/home/alice".to_string())]),
            cwd: Mutex::new(PathBuf::from("/work")),
        }
    }

    pub fn linux() -> Self {
        Self::new(Platform::Linux)
    }

    pub fn advance(&self, millis: f64) {
        *self.millis.lock() += millis;
    }
}

impl Host for FakeHost {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn arch(&self) -> &str {
        "x64"
    }

    fn pid(&self) -> u32 {
        SELF_PID
    }

    fn ppid(&self) -> u32 {
        1
    }

    fn env(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.env.clone())
    }

    fn args(&self) -> Result<Vec<String>> {
        Ok(vec!["script.js".to_string(), "--flag".to_string()])
    }

    fn argv0(&self) -> Result<String> {
        Ok("procshim".to_string())
    }

    fn exec_path(&self) -> Result<PathBuf> {
        Ok(PathBuf::from("/usr/local/bin/procshim"))
    }

    fn cwd(&self) -> Result<PathBuf> {
        Ok(self.cwd.lock().clone())
    }

    fn chdir(&self, dir: &Path) -> Result<()> {
        *self.cwd.lock() = dir.to_path_buf();
        Ok(())
    }

    fn exit(&self, code: i32) {
        self.exits.lock().push(code);
    }

    fn kill(&self, pid: i32, signal: i32) -> Result<()> {
        if !self.live_pids.contains(&pid) {
            return Err(ProcessError::ProcessNotFound { pid });
        }
        self.kills.lock().push((pid, signal));
        Ok(())
    }

    fn monotonic_millis(&self) -> f64 {
        *self.millis.lock()
    }

    fn exec_capture(&self, command: &str, _args: &[String]) -> Result<Vec<u8>> {
        self.commands.lock().push(command.to_string());
        match &self.id_output {
            Some(out) => Ok(out.clone().into_bytes()),
            None => Err(ProcessError::CommandFailed {
                command: command.to_string(),
                reason: "exit status: 1".to_string(),
            }),
        }
    }

    fn load_average(&self) -> (f64, f64) {
        self.load
    }

    fn native_identity(&self) -> Option<Result<ProcessIdentity>> {
        self.native.clone().map(Ok)
    }
}
