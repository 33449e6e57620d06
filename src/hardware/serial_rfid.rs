//! RFID reader that reports tags as text lines over a serial device

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::Mutex;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use super::{HardwareError, RfidReader};

type LineSource = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// Reader emitting one identifier per line
pub struct SerialRfidReader {
    name: String,
    lines: Mutex<LineSource>,
}

impl SerialRfidReader {
    /// Open the serial device at `path` in raw mode, 8N1 at `baud_rate`
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(path: &Path, baud_rate: u32) -> Result<Self, HardwareError> {
        let port = tokio_serial::new(path.to_string_lossy(), baud_rate)
            .open_native_async()
            .map_err(|source| HardwareError::Serial {
                device: path.to_owned(),
                source,
            })?;
        info!(?path, baud_rate, "RFID reader opened");
        Ok(Self::from_reader(path.display().to_string(), port))
    }

    pub fn from_reader(
        name: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            name: name.into(),
            lines: Mutex::new(BufReader::new(reader).lines()),
        }
    }
}

#[async_trait]
impl RfidReader for SerialRfidReader {
    async fn poll(&self, timeout: Duration) -> Result<Option<String>, HardwareError> {
        let mut lines = self.lines.lock().await;
        // `next_line` is cancel safe, so a timed-out read loses no data.
        match tokio::time::timeout(timeout, lines.next_line()).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(Some(line))) => {
                let id = line.trim();
                if id.is_empty() {
                    return Ok(None);
                }
                debug!(reader = %self.name, id, "tag scanned");
                Ok(Some(id.to_string()))
            }
            Ok(Ok(None)) => Err(HardwareError::Disconnected(self.name.clone())),
            Ok(Err(e)) => Err(HardwareError::io(&self.name, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use tokio::io::AsyncWriteExt;
    use tokio_serial::SerialStream;

    use super::*;

    #[tokio::test]
    async fn test_reads_trimmed_identifiers() {
        let reader = SerialRfidReader::from_reader("mock", &b"AABB\r\n 1234 \n"[..]);

        let first = reader.poll(Duration::from_millis(250)).await.unwrap();
        assert_eq!(first.as_deref(), Some("AABB"));
        let second = reader.poll(Duration::from_millis(250)).await.unwrap();
        assert_eq!(second.as_deref(), Some("1234"));
    }

    #[tokio::test]
    async fn test_blank_line_is_a_miss() {
        let reader = SerialRfidReader::from_reader("mock", &b"\nAABB\n"[..]);

        assert_eq!(reader.poll(Duration::from_millis(250)).await.unwrap(), None);
        assert_eq!(
            reader.poll(Duration::from_millis(250)).await.unwrap().as_deref(),
            Some("AABB")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_none_and_keeps_partial_line() {
        let (mut tx, rx) = tokio::io::duplex(64);
        let reader = SerialRfidReader::from_reader("mock", rx);

        tx.write_all(b"AA").await.unwrap();
        assert_eq!(reader.poll(Duration::from_millis(250)).await.unwrap(), None);

        tx.write_all(b"BB\n").await.unwrap();
        assert_eq!(
            reader.poll(Duration::from_millis(250)).await.unwrap().as_deref(),
            Some("AABB")
        );
    }

    #[tokio::test]
    async fn test_eof_is_disconnect() {
        let reader = SerialRfidReader::from_reader("mock", &b""[..]);
        let result = reader.poll(Duration::from_millis(250)).await;
        assert!(matches!(result, Err(HardwareError::Disconnected(_))));
    }

    #[test]
    fn test_idle_port_does_not_block_runtime_shutdown() {
        let (done_tx, done_rx) = mpsc::channel();

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();

            // Keep both ends of the pty open so the read stays pending.
            let ports = runtime.block_on(async {
                let (device, host) = SerialStream::pair().unwrap();
                let reader = SerialRfidReader::from_reader("pty", device);
                assert_eq!(reader.poll(Duration::from_millis(50)).await.unwrap(), None);
                (reader, host)
            });

            drop(runtime);
            drop(ports);
            let _ = done_tx.send(());
        });

        assert!(
            done_rx.recv_timeout(Duration::from_secs(3)).is_ok(),
            "runtime shutdown blocked on an idle serial read"
        );
    }

    #[tokio::test]
    async fn test_reads_tags_from_pty() {
        let (device, mut host) = SerialStream::pair().unwrap();
        let reader = SerialRfidReader::from_reader("pty", device);

        host.write_all(b"AABB\n").await.unwrap();
        assert_eq!(
            reader.poll(Duration::from_millis(500)).await.unwrap().as_deref(),
            Some("AABB")
        );
    }
}
