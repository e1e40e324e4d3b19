//! Redirected-pipe child processes via `tokio::process`.

use std::process::Stdio;

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::{
    ChildIo, ChildProcess, Launcher, ProcessExit, SpawnSpec, INPUT_CHANNEL_CAPACITY,
    OUTPUT_CHANNEL_CAPACITY, READ_BUFFER_SIZE,
};
use crate::error::BridgeError;
use crate::Result;

/// Launches children with all three standard streams piped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipeLauncher;

impl PipeLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for PipeLauncher {
    fn launch(&self, spec: &SpawnSpec) -> Result<ChildIo> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| BridgeError::Spawn(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BridgeError::Spawn("stdin was not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Spawn("stdout was not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BridgeError::Spawn("stderr was not captured".into()))?;

        let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
        let (stdout_tx, stdout_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (stderr_tx, stderr_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);

        tokio::spawn(pump_writer(stdin, input_rx));
        tokio::spawn(pump_reader(stdout, stdout_tx, "stdout"));
        tokio::spawn(pump_reader(stderr, stderr_tx, "stderr"));

        debug!(pid = ?child.id(), command = %spec.display(), "spawned piped child");

        Ok(ChildIo {
            input: input_tx,
            stdout: stdout_rx,
            stderr: Some(stderr_rx),
            child: Box::new(PipeChild(child)),
        })
    }
}

struct PipeChild(Child);

impl ChildProcess for PipeChild {
    fn id(&self) -> Option<u32> {
        self.0.id()
    }

    fn start_kill(&mut self) -> std::io::Result<()> {
        self.0.start_kill()
    }

    fn wait(&mut self) -> BoxFuture<'_, std::io::Result<ProcessExit>> {
        Box::pin(async move {
            let status = self.0.wait().await?;
            Ok(ProcessExit::from(status))
        })
    }
}

/// Copy chunks from `reader` into `tx` until EOF, a read error, or the
/// receiver goes away.
pub async fn pump_reader<R>(mut reader: R, tx: mpsc::Sender<Vec<u8>>, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                debug!(stream, "reader: EOF");
                break;
            }
            Ok(n) => {
                trace!(stream, "reader: read {} bytes", n);
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    debug!(stream, "reader: channel closed");
                    break;
                }
            }
            Err(e) => {
                warn!(stream, "reader error: {}", e);
                break;
            }
        }
    }
}

/// Write every chunk received on `rx` to `writer`.
///
/// Returns when the channel closes or the write side breaks; dropping the
/// receiver then makes further sends fail, which is how callers learn that
/// the input is no longer writable.
pub async fn pump_writer<W>(mut writer: W, mut rx: mpsc::Receiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(data) = rx.recv().await {
        trace!("writer: writing {} bytes", data.len());
        if let Err(e) = writer.write_all(&data).await {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                debug!("writer: broken pipe");
            } else {
                warn!("writer error: {}", e);
            }
            return;
        }
        if let Err(e) = writer.flush().await {
            debug!("writer flush error: {}", e);
            return;
        }
    }
    debug!("writer: channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_pump_reader_forwards_chunks_in_order() {
        let reader = Builder::new().read(b"ready\n").read(b"> ").build();
        let (tx, mut rx) = mpsc::channel(8);

        pump_reader(reader, tx, "stdout").await;

        assert_eq!(rx.recv().await.unwrap(), b"ready\n");
        assert_eq!(rx.recv().await.unwrap(), b"> ");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_reader_stops_on_error() {
        let reader = Builder::new()
            .read(b"partial")
            .read_error(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
            .build();
        let (tx, mut rx) = mpsc::channel(8);

        pump_reader(reader, tx, "stderr").await;

        assert_eq!(rx.recv().await.unwrap(), b"partial");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pump_writer_writes_bytes() {
        let writer = Builder::new().write(b"1\n").write(b"2\n").build();
        let (tx, rx) = mpsc::channel(8);

        tx.send(b"1\n".to_vec()).await.unwrap();
        tx.send(b"2\n".to_vec()).await.unwrap();
        drop(tx);

        pump_writer(writer, rx).await;
    }

    #[tokio::test]
    async fn test_pump_writer_closes_channel_on_broken_pipe() {
        let writer = Builder::new()
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "closed",
            ))
            .build();
        let (tx, rx) = mpsc::channel(8);
        tx.send(b"lost".to_vec()).await.unwrap();

        let handle = tokio::spawn(pump_writer(writer, rx));
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(tx.is_closed());
        assert!(tx.send(b"after".to_vec()).await.is_err());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_pipe_launcher_cat_roundtrip() {
        let spec = SpawnSpec::new("cat");
        let mut io = PipeLauncher::new().launch(&spec).unwrap();

        io.input.send(b"hello\n".to_vec()).await.unwrap();
        let chunk = tokio::time::timeout(Duration::from_secs(5), io.stdout.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk, b"hello\n");

        io.child.start_kill().unwrap();
        let exit = io.child.wait().await.unwrap();
        assert!(!exit.success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_pipe_launcher_stderr_and_exit_code() {
        let spec = SpawnSpec::new("sh").args(["-c", "echo oops >&2; exit 3"]);
        let mut io = PipeLauncher::new().launch(&spec).unwrap();

        let mut stderr = io.stderr.take().unwrap();
        let chunk = tokio::time::timeout(Duration::from_secs(5), stderr.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chunk, b"oops\n");

        let exit = io.child.wait().await.unwrap();
        assert_eq!(exit.code, Some(3));
    }

    #[tokio::test]
    async fn test_pipe_launcher_missing_binary() {
        let spec = SpawnSpec::new("no-such-interpreter-binary-xyz");
        let err = PipeLauncher::new().launch(&spec).unwrap_err();
        assert!(matches!(err, BridgeError::Spawn(_)));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_pipe_launcher_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let spec = SpawnSpec::new("sh")
            .args(["-c", "printf '%s:' \"$PYTHONIOENCODING\"; pwd"])
            .cwd(dir.path())
            .env("PYTHONIOENCODING", "utf-8");
        let mut io = PipeLauncher::new().launch(&spec).unwrap();

        let mut out = Vec::new();
        while let Ok(Some(chunk)) =
            tokio::time::timeout(Duration::from_secs(5), io.stdout.recv()).await
        {
            out.extend(chunk);
        }
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("utf-8:"));
        let expected = dir.path().canonicalize().unwrap();
        assert!(text.trim_end().ends_with(expected.file_name().unwrap().to_str().unwrap()));

        io.child.wait().await.unwrap();
    }
}
