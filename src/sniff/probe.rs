//! Bounded capture of the leading bytes of a connection.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{self, Instant};

use crate::net::replay::{ProbeBuffer, MAX_PROBE_LEN};

/// Read up to `limit` bytes from `conn`, stopping early on end-of-stream,
/// a read error, or once `budget` has elapsed.
///
/// Short reads are not errors: whatever arrived in time, possibly nothing,
/// becomes the probe. The deadline only covers this call; later reads on
/// `conn` are unbounded again.
pub async fn capture<S>(conn: &mut S, limit: usize, budget: Duration) -> ProbeBuffer
where
    S: AsyncRead + Unpin,
{
    let limit = limit.min(MAX_PROBE_LEN);
    let mut buf = vec![0u8; limit];
    let mut filled = 0;
    let deadline = Instant::now() + budget;

    while filled < limit {
        // `read` is cancel safe: a timed-out read consumes nothing.
        match time::timeout_at(deadline, conn.read(&mut buf[filled..])).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => filled += n,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, captured = filled, "Probe read failed");
                break;
            }
            Err(_) => {
                tracing::trace!(captured = filled, "Probe deadline elapsed");
                break;
            }
        }
    }

    buf.truncate(filled);
    ProbeBuffer::new(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn stops_at_limit() {
        let mut conn = tokio_test::io::Builder::new()
            .read(&[b'a'; 300])
            .read(&[b'b'; 300])
            .build();

        let probe = capture(&mut conn, 512, Duration::from_millis(500)).await;
        assert_eq!(probe.len(), 512);
        assert_eq!(&probe.as_bytes()[..300], &[b'a'; 300][..]);
        assert_eq!(&probe.as_bytes()[300..], &[b'b'; 212][..]);

        // The rest of the second chunk stays on the stream.
        let mut rest = Vec::new();
        conn.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest.len(), 88);
    }

    #[tokio::test]
    async fn stops_at_end_of_stream() {
        let mut conn = tokio_test::io::Builder::new().read(b"GET / ").read(b"HTTP/1.1\r\n").build();
        let probe = capture(&mut conn, 512, Duration::from_millis(500)).await;
        assert_eq!(probe.as_bytes(), b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_deadline_keeping_partial_data() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(b"\x16\x03\x01").await.unwrap();

        let started = Instant::now();
        let probe = capture(&mut server, 512, Duration::from_millis(500)).await;
        assert_eq!(probe.as_bytes(), b"\x16\x03\x01");
        assert!(started.elapsed() >= Duration::from_millis(500));

        // Later reads are not bound by the probe deadline.
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(5)).await;
            client.write_all(b"late").await.unwrap();
        });
        let mut late = [0u8; 4];
        server.read_exact(&mut late).await.unwrap();
        assert_eq!(&late, b"late");
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_yields_empty_probe() {
        let (_client, mut server) = tokio::io::duplex(64);
        let probe = capture(&mut server, 512, Duration::from_millis(500)).await;
        assert!(probe.is_empty());
    }

    #[tokio::test]
    async fn limit_is_capped() {
        let mut conn = tokio_test::io::Builder::new().read(&[7u8; 1024]).build();
        let probe = capture(&mut conn, 4096, Duration::from_millis(500)).await;
        assert_eq!(probe.len(), MAX_PROBE_LEN);

        let mut rest = Vec::new();
        conn.read_to_end(&mut rest).await.unwrap();
        assert_eq!(rest.len(), 1024 - MAX_PROBE_LEN);
    }
}
