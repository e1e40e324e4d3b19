//! Channel adapters for blocking readers and writers.
//!
//! PTY handles only offer `std::io` blocking I/O. These adapters move that
//! I/O onto tokio's blocking pool and expose it as byte channels so the
//! runtime is never stalled.

use std::io::{Read, Write};

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use super::READ_BUFFER_SIZE;

/// Reads from a blocking source and sends chunks through a channel.
pub struct BlockingReader<R: Read + Send + 'static> {
    reader: R,
    tx: mpsc::Sender<Vec<u8>>,
    buffer_size: usize,
}

impl<R: Read + Send + 'static> BlockingReader<R> {
    pub fn new(reader: R, tx: mpsc::Sender<Vec<u8>>) -> Self {
        Self {
            reader,
            tx,
            buffer_size: READ_BUFFER_SIZE,
        }
    }

    /// Create with custom buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Run the read loop on the blocking pool.
    ///
    /// Returns on EOF, on any read error (a closed PTY surfaces as `EIO`),
    /// or when the receiver is dropped.
    pub async fn run(self) {
        let buffer_size = self.buffer_size;
        let mut reader = self.reader;
        let tx = self.tx;

        let result = tokio::task::spawn_blocking(move || {
            let mut buf = vec![0u8; buffer_size];

            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!("blocking reader: EOF");
                        break;
                    }
                    Ok(n) => {
                        trace!("blocking reader: read {} bytes", n);
                        if tx.blocking_send(buf[..n].to_vec()).is_err() {
                            debug!("blocking reader: channel closed");
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("blocking reader: closed ({})", e);
                        break;
                    }
                }
            }
        })
        .await;

        if let Err(e) = result {
            error!("blocking reader task panicked: {}", e);
        }
    }
}

/// Receives chunks from a channel and writes them to a blocking sink.
pub struct BlockingWriter<W: Write + Send + 'static> {
    writer: W,
    rx: mpsc::Receiver<Vec<u8>>,
}

impl<W: Write + Send + 'static> BlockingWriter<W> {
    pub fn new(writer: W, rx: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { writer, rx }
    }

    /// Run the write loop on the blocking pool.
    ///
    /// Returns when the channel closes or a write fails. The receiver is
    /// dropped either way, so later sends report the input as gone.
    pub async fn run(self) {
        let mut writer = self.writer;
        let mut rx = self.rx;

        let result = tokio::task::spawn_blocking(move || {
            while let Some(data) = rx.blocking_recv() {
                trace!("blocking writer: writing {} bytes", data.len());
                if let Err(e) = writer.write_all(&data).and_then(|_| writer.flush()) {
                    if e.kind() == std::io::ErrorKind::BrokenPipe {
                        debug!("blocking writer: broken pipe");
                    } else {
                        error!("blocking writer error: {}", e);
                    }
                    return;
                }
            }
            debug!("blocking writer: channel closed");
        })
        .await;

        if let Err(e) = result {
            error!("blocking writer task panicked: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test]
    async fn test_blocking_reader_basic() {
        let data = b"Hello, World!\nTest line 2\n";
        let (tx, mut rx) = mpsc::channel(32);
        let reader = BlockingReader::new(Cursor::new(data.to_vec()), tx);

        let handle = tokio::spawn(reader.run());

        let mut received = Vec::new();
        while let Ok(Some(chunk)) =
            tokio::time::timeout(Duration::from_millis(500), rx.recv()).await
        {
            received.extend(chunk);
        }
        let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;

        assert_eq!(received, data);
    }

    #[tokio::test]
    async fn test_blocking_reader_small_buffer_keeps_order() {
        let (tx, mut rx) = mpsc::channel(32);
        let reader = BlockingReader::new(Cursor::new(b"abcdef".to_vec()), tx).with_buffer_size(2);

        reader.run().await;

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.recv().await {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec![b"ab".to_vec(), b"cd".to_vec(), b"ef".to_vec()]);
    }

    #[tokio::test]
    async fn test_blocking_reader_empty() {
        let (tx, mut rx) = mpsc::channel(32);
        let reader = BlockingReader::new(Cursor::new(Vec::new()), tx);

        let handle = tokio::spawn(reader.run());

        let result = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(result.unwrap().is_none());

        let _ = handle.await;
    }

    #[tokio::test]
    async fn test_blocking_reader_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        let reader = BlockingReader::new(Cursor::new(vec![b'x'; 64]), tx).with_buffer_size(1);
        drop(rx);

        let handle = tokio::spawn(reader.run());
        let result = tokio::time::timeout(Duration::from_millis(500), handle).await;
        assert!(result.is_ok());
    }

    /// Cloneable in-memory sink, optionally failing every write.
    #[derive(Clone, Default)]
    struct SharedSink {
        bytes: Arc<Mutex<Vec<u8>>>,
        broken: bool,
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.broken {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"));
            }
            self.bytes.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_blocking_writer_basic() {
        let sink = SharedSink::default();
        let (tx, rx) = mpsc::channel(32);
        let writer = BlockingWriter::new(sink.clone(), rx);

        tx.send(b"1\n".to_vec()).await.unwrap();
        tx.send(b"2\n".to_vec()).await.unwrap();
        drop(tx);

        writer.run().await;
        assert_eq!(*sink.bytes.lock().unwrap(), b"1\n2\n");
    }

    #[tokio::test]
    async fn test_blocking_writer_broken_pipe_drops_receiver() {
        let sink = SharedSink {
            broken: true,
            ..SharedSink::default()
        };
        let (tx, rx) = mpsc::channel(32);
        tx.send(b"lost".to_vec()).await.unwrap();

        tokio::time::timeout(Duration::from_millis(500), BlockingWriter::new(sink, rx).run())
            .await
            .unwrap();

        assert!(tx.is_closed());
        assert!(tx.send(b"after".to_vec()).await.is_err());
    }
}
