//! Test daemon management.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A running `pingwired` with its own config and data directory.
pub struct TestDaemon {
    child: Child,
    port: u16,
    data_dir: PathBuf,
    dir: Option<TempDir>,
}

impl TestDaemon {
    /// Spawn a daemon storing its target list in a fresh directory.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_in(tempfile::tempdir()?).await
    }

    /// Spawn a daemon in `dir`, reusing any target list already there.
    pub async fn spawn_in(dir: TempDir) -> anyhow::Result<Self> {
        let port = free_port()?;
        let config_path = write_config(dir.path(), port)?;
        let child = Command::new(env!("CARGO_BIN_EXE_pingwired"))
            .arg(&config_path)
            .spawn()?;

        let daemon = Self {
            child,
            port,
            data_dir: dir.path().to_path_buf(),
            dir: Some(dir),
        };
        daemon.wait_until_ready().await?;
        Ok(daemon)
    }

    /// Run the daemon against `dir` and wait for it to exit on its own.
    pub async fn run_to_exit(dir: &Path) -> anyhow::Result<ExitStatus> {
        let config_path = write_config(dir, free_port()?)?;
        let mut child = Command::new(env!("CARGO_BIN_EXE_pingwired"))
            .arg(&config_path)
            .spawn()?;

        for _ in 0..50 {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            sleep(Duration::from_millis(100)).await;
        }
        let _ = child.kill();
        let _ = child.wait();
        anyhow::bail!("daemon kept running")
    }

    /// Wait until the bridge listener accepts connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(self.address()).await.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("daemon failed to start within 5 seconds")
    }

    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("targets.txt")
    }

    /// Wait for the target list file to read `expected`.
    ///
    /// Lifecycle handlers run on their own tasks, so their writes can land
    /// after later frames have already been answered.
    pub async fn wait_for_store(&self, expected: &str) -> anyhow::Result<()> {
        let mut last = String::new();
        for _ in 0..50 {
            last = std::fs::read_to_string(self.store_path()).unwrap_or_default();
            if last == expected {
                return Ok(());
            }
            sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("target list never became {expected:?}, last saw {last:?}")
    }

    /// Connect a bridge that announces itself as `self_id`.
    pub async fn connect(&self, self_id: u64) -> anyhow::Result<super::bridge::TestBridge> {
        super::bridge::TestBridge::connect(&self.address(), self_id).await
    }

    /// Kill the process, keeping its data directory.
    pub fn stop(mut self) -> TempDir {
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.dir.take().expect("data directory already taken")
    }
}

impl Drop for TestDaemon {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

fn write_config(dir: &Path, port: u16) -> anyhow::Result<PathBuf> {
    let config_path = dir.join("config.toml");
    let config = format!(
        r#"
[store]
path = "{store}"

[notify]
ping_text = "aaaayyyyy"
ack_expire_secs = 0

[bridge]
listen = "127.0.0.1:{port}"
send_timeout_ms = 2000

[logging]
filter = "info,pingwired=debug"
"#,
        store = dir.join("targets.txt").display(),
    );
    std::fs::write(&config_path, config)?;
    Ok(config_path)
}
