//! Scoped remote execution session.
//!
//! One session is opened per run and every directory command goes through
//! it. Over SSH the session is an OpenSSH control master: it is started
//! once, later commands are multiplexed over its control socket, and it is
//! shut down when the session is closed or dropped.

use crate::error::{Error, Result};
use crate::types::Credential;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// ssh exits with 255 when the connection itself failed.
const SSH_CONNECTION_FAILURE: i32 = 255;

/// Command run on the directory host; the script is read from stdin.
const POWERSHELL: [&str; 4] = ["powershell", "-NoProfile", "-NonInteractive", "-Command"];

/// Options for opening a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// ssh executable
    pub ssh_program: String,
    /// ssh port, if not the default
    pub port: Option<u16>,
    /// Seconds to wait for the connection
    pub connect_timeout: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            port: None,
            connect_timeout: 10,
        }
    }
}

/// How scripts reach the directory host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Multiplexed OpenSSH connection
    Ssh {
        /// Directory host
        host: String,
        /// Control socket of the master connection
        control_path: PathBuf,
        /// Login for the host
        credential: Credential,
        /// Connection options
        options: SessionOptions,
    },
    /// PowerShell on this machine (running on the domain controller itself)
    Local,
}

/// What a script printed and how it exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Exit code, `None` if terminated by a signal
    pub status: Option<i32>,
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
}

impl ScriptOutput {
    /// Check if the script exited with code 0.
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// An open session to a directory host.
///
/// The session is released on `close` or, failing that, on drop.
#[derive(Debug)]
pub struct RemoteSession {
    transport: Transport,
    open: bool,
}

impl RemoteSession {
    /// Open a session to `target`.
    ///
    /// `localhost` and `.` run PowerShell locally; anything else starts an
    /// ssh control master. Fails with a connectivity error if the host
    /// cannot be reached or the login is rejected.
    pub fn open(target: &str, credential: &Credential, options: &SessionOptions) -> Result<Self> {
        let target = target.trim();
        if target.is_empty() {
            return Err(Error::connectivity("no directory host given"));
        }

        if is_local(target) {
            log::info!("Using local PowerShell session");
            return Ok(Self {
                transport: Transport::Local,
                open: true,
            });
        }

        let transport = Transport::Ssh {
            host: target.to_string(),
            control_path: control_path(),
            credential: credential.clone(),
            options: options.clone(),
        };

        log::info!("Opening session to {target}");
        let args = master_args(&transport);
        log::debug!("ssh {}", args.join(" "));

        let output = Command::new(&options.ssh_program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                Error::connectivity(format!("failed to execute {}: {e}", options.ssh_program))
            })?;

        if !output.status.success() {
            return Err(Error::connectivity(format!(
                "could not open session to {target}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(Self {
            transport,
            open: true,
        })
    }

    /// The transport used by this session.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Run a PowerShell script on the directory host.
    ///
    /// Only transport failures are errors here (as connectivity errors);
    /// what the script itself reported is left to the caller.
    pub fn run_script(&self, script: &str) -> Result<ScriptOutput> {
        if !self.open {
            return Err(Error::connectivity("session already closed"));
        }

        let output = self.spawn_script(script)?;
        let result = ScriptOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        };

        if matches!(self.transport, Transport::Ssh { .. })
            && result.status == Some(SSH_CONNECTION_FAILURE)
        {
            return Err(Error::connectivity(result.stderr));
        }
        Ok(result)
    }

    fn spawn_script(&self, script: &str) -> Result<Output> {
        let mut command = match &self.transport {
            Transport::Local => {
                let mut command = Command::new(POWERSHELL[0]);
                command.args(&POWERSHELL[1..]).arg("-");
                command
            }
            Transport::Ssh { options, .. } => {
                let mut command = Command::new(&options.ssh_program);
                command.args(exec_args(&self.transport));
                command
            }
        };

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::connectivity(format!("failed to start session command: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes())?;
        }

        Ok(child.wait_with_output()?)
    }

    /// Release the session.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let Transport::Ssh { options, host, .. } = &self.transport else {
            return Ok(());
        };

        log::info!("Closing session to {host}");
        let output = Command::new(&options.ssh_program)
            .args(exit_args(&self.transport))
            .stdin(Stdio::null())
            .output()?;

        if !output.status.success() {
            return Err(Error::connectivity(format!(
                "could not close session to {host}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

impl Drop for RemoteSession {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            log::warn!("Session teardown failed: {e}");
        }
    }
}

fn is_local(target: &str) -> bool {
    matches!(target.to_lowercase().as_str(), "localhost" | "." | "127.0.0.1")
}

/// Control socket for this process.
///
/// Unix sockets are limited to about 100 bytes of path and ssh appends a
/// 17-byte suffix while binding, so the name stays short: ssh replaces `%C`
/// with a 40-character hash of the local host, remote host, port and user.
fn control_path() -> PathBuf {
    let dir = if cfg!(unix) {
        PathBuf::from("/tmp")
    } else {
        std::env::temp_dir()
    };
    dir.join(format!("adsync-{}-%C", std::process::id()))
}

/// Options shared by every ssh invocation of a session.
fn common_args(transport: &Transport) -> Vec<String> {
    let Transport::Ssh {
        control_path,
        credential,
        options,
        ..
    } = transport
    else {
        return Vec::new();
    };

    let mut args = vec![
        "-S".to_string(),
        control_path.display().to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", options.connect_timeout),
    ];
    if let Some(port) = options.port {
        args.push("-p".to_string());
        args.push(port.to_string());
    }
    if let Some(user) = &credential.user {
        args.push("-l".to_string());
        args.push(user.clone());
    }
    if let Some(identity) = &credential.identity_file {
        args.push("-i".to_string());
        args.push(identity.display().to_string());
    }
    args
}

fn host(transport: &Transport) -> String {
    match transport {
        Transport::Ssh { host, .. } => host.clone(),
        Transport::Local => "localhost".to_string(),
    }
}

/// Start a background control master without running a command.
fn master_args(transport: &Transport) -> Vec<String> {
    let mut args = vec!["-M".to_string()];
    args.extend(common_args(transport));
    args.extend([
        "-o".to_string(),
        "ControlPersist=yes".to_string(),
        "-f".to_string(),
        "-N".to_string(),
        host(transport),
    ]);
    args
}

/// Run PowerShell over the control master, script on stdin.
fn exec_args(transport: &Transport) -> Vec<String> {
    let mut args = common_args(transport);
    args.push(host(transport));
    args.extend(POWERSHELL.iter().map(ToString::to_string));
    args.push("-".to_string());
    args
}

/// Ask the control master to exit.
fn exit_args(transport: &Transport) -> Vec<String> {
    let mut args = common_args(transport);
    args.extend(["-O".to_string(), "exit".to_string(), host(transport)]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssh_transport(credential: Credential) -> Transport {
        Transport::Ssh {
            host: "dc01.corp.example".to_string(),
            control_path: PathBuf::from("/tmp/adsync-1-dc01.ctl"),
            credential,
            options: SessionOptions {
                port: Some(2222),
                ..Default::default()
            },
        }
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn test_master_args() {
        let args = master_args(&ssh_transport(Credential {
            user: Some("CORP\\admin".to_string()),
            identity_file: Some(PathBuf::from("/home/op/.ssh/id_ed25519")),
        }));

        assert_eq!(args[0], "-M");
        assert!(has_pair(&args, "-S", "/tmp/adsync-1-dc01.ctl"));
        assert!(has_pair(&args, "-p", "2222"));
        assert!(has_pair(&args, "-l", "CORP\\admin"));
        assert!(has_pair(&args, "-i", "/home/op/.ssh/id_ed25519"));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        assert_eq!(args.last().unwrap(), "dc01.corp.example");
    }

    #[test]
    fn test_exec_args_read_script_from_stdin() {
        let args = exec_args(&ssh_transport(Credential::default()));
        let tail: Vec<&str> = args[args.len() - 6..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "dc01.corp.example",
                "powershell",
                "-NoProfile",
                "-NonInteractive",
                "-Command",
                "-"
            ]
        );
        assert!(!args.contains(&"-l".to_string()));
    }

    #[test]
    fn test_exit_args() {
        let args = exit_args(&ssh_transport(Credential::default()));
        let tail: Vec<&str> = args[args.len() - 3..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["-O", "exit", "dc01.corp.example"]);
    }

    #[test]
    fn test_script_output_success() {
        let ok = ScriptOutput {
            status: Some(0),
            stdout: "true".to_string(),
            stderr: String::new(),
        };
        assert!(ok.success());
        let killed = ScriptOutput {
            status: None,
            ..ok
        };
        assert!(!killed.success());
    }

    #[test]
    fn test_local_targets() {
        assert!(is_local("localhost"));
        assert!(is_local("."));
        assert!(!is_local("dc01"));
    }

    #[test]
    fn test_control_path_fits_a_unix_socket() {
        // Hash expansion plus the temporary suffix ssh adds while binding
        const EXPANSION: usize = 40 - 2 + 17;
        const SUN_PATH_MAX: usize = 104;

        let path = control_path().display().to_string();
        assert!(path.ends_with("-%C"), "{path}");
        assert!(path.len() + EXPANSION < SUN_PATH_MAX, "{path}");
    }

    #[test]
    fn test_open_rejects_empty_target() {
        let err =
            RemoteSession::open("  ", &Credential::default(), &SessionOptions::default()).unwrap_err();
        assert!(err.is_fatal());
    }

    /// An ssh stand-in that logs its arguments and always succeeds
    #[cfg(unix)]
    fn fake_ssh(dir: &std::path::Path) -> (String, PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let log = dir.join("ssh.log");
        let program = dir.join("ssh");
        std::fs::write(
            &program,
            format!("#!/bin/sh\necho \"$@\" >> '{}'\nexit 0\n", log.display()),
        )
        .unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();
        (program.display().to_string(), log)
    }

    #[cfg(unix)]
    #[test]
    fn test_dropped_session_stops_the_master() {
        let dir = tempfile::TempDir::new().unwrap();
        let (ssh_program, log) = fake_ssh(dir.path());
        let options = SessionOptions {
            ssh_program,
            ..Default::default()
        };

        let session = RemoteSession::open("dc01", &Credential::default(), &options).unwrap();
        drop(session);

        let calls = std::fs::read_to_string(&log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(lines.len(), 2, "{calls}");
        assert!(lines[0].starts_with("-M "), "{calls}");
        assert!(lines[1].ends_with("-O exit dc01"), "{calls}");
    }

    #[cfg(unix)]
    #[test]
    fn test_closed_session_is_not_stopped_twice() {
        let dir = tempfile::TempDir::new().unwrap();
        let (ssh_program, log) = fake_ssh(dir.path());
        let options = SessionOptions {
            ssh_program,
            ..Default::default()
        };

        let session = RemoteSession::open("dc01", &Credential::default(), &options).unwrap();
        session.close().unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls.matches("-O exit dc01").count(), 1, "{calls}");
    }

    #[test]
    fn test_local_session_closes_cleanly() {
        let session =
            RemoteSession::open("localhost", &Credential::default(), &SessionOptions::default())
                .unwrap();
        assert_eq!(*session.transport(), Transport::Local);
        session.close().unwrap();
    }
}
