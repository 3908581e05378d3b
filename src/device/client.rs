use crate::prelude::*;

use {
    bytes::BytesMut,
    std::time::Duration,
    tokio::io::{AsyncReadExt, AsyncWriteExt},
    tokio::net::TcpStream,
};

const ACK_BYTE: &[u8] = b"."; // the device expects this before we hang up
const ACK_TIMEOUT_MS: u64 = 500;
const READ_CHUNK_SIZE: usize = 4096;
pub const MAX_RESPONSE_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryState {
    Connecting,
    Streaming,
    Completed(QueryOutcome),
}

/// Runs one query round trip against `target`.
///
/// Connects, writes `payload` once, then accumulates the reply until the
/// configured delimiter is seen or the peer closes. The whole attempt is
/// bounded by `options.timeout`. Whatever the outcome, a single `.` is
/// written back before the connection is dropped.
pub async fn query(target: &DeviceTarget, payload: &[u8], options: &QueryOptions) -> QueryOutcome {
    let mut session = Session::new(target, options);
    session.run(payload).await
}

struct Session<'a> {
    target: &'a DeviceTarget,
    options: &'a QueryOptions,
    state: QueryState,
    stream: Option<TcpStream>,
    buf: BytesMut,
    scanned: usize,
}

impl<'a> Session<'a> {
    fn new(target: &'a DeviceTarget, options: &'a QueryOptions) -> Self {
        Self {
            target,
            options,
            state: QueryState::Connecting,
            stream: None,
            buf: BytesMut::with_capacity(READ_CHUNK_SIZE),
            scanned: 0,
        }
    }

    async fn run(&mut self, payload: &[u8]) -> QueryOutcome {
        let limit = self.options.timeout;

        let outcome = match tokio::time::timeout(limit, self.exchange(payload)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(QueryError::Timeout(limit.as_millis())),
        };

        self.complete(outcome);
        self.release().await;
        self.outcome()
    }

    async fn exchange(&mut self, payload: &[u8]) -> QueryOutcome {
        debug!("device {}: connecting", self.target);

        let stream = TcpStream::connect((self.target.host(), self.target.port()))
            .await
            .map_err(|err| QueryError::Socket(err.to_string()))?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("device {}: failed to set TCP_NODELAY: {}", self.target, e);
        }

        let stream = self.stream.insert(stream);
        self.state = QueryState::Streaming;

        stream
            .write_all(payload)
            .await
            .map_err(|err| QueryError::Write(err.to_string()))?;
        trace!("device {}: TX {} bytes", self.target, payload.len());

        loop {
            self.buf.reserve(READ_CHUNK_SIZE);
            let len = stream
                .read_buf(&mut self.buf)
                .await
                .map_err(|err| QueryError::Socket(err.to_string()))?;

            if len == 0 {
                debug!(
                    "device {}: peer closed after {} bytes",
                    self.target,
                    self.buf.len()
                );
                return Ok(self.buf.split().freeze());
            }
            trace!("device {}: RX {} bytes", self.target, len);

            if let Some(delimiter) = self.options.delimiter() {
                if let Some(pos) = find_delimiter(&self.buf, delimiter, self.scanned) {
                    return Ok(self.buf.split_to(pos).freeze());
                }
                self.scanned = self.buf.len();
            }

            if self.buf.len() > MAX_RESPONSE_SIZE {
                return Err(QueryError::Oversize(MAX_RESPONSE_SIZE));
            }
        }
    }

    // Only the first call has any effect.
    fn complete(&mut self, outcome: QueryOutcome) -> bool {
        if let QueryState::Completed(_) = self.state {
            trace!("device {}: ignoring outcome after completion", self.target);
            return false;
        }

        match &outcome {
            Ok(bytes) => debug!("device {}: received {} bytes", self.target, bytes.len()),
            Err(err) => debug!("device {}: {}", self.target, err),
        }
        self.state = QueryState::Completed(outcome);
        true
    }

    fn outcome(&self) -> QueryOutcome {
        match &self.state {
            QueryState::Completed(outcome) => outcome.clone(),
            state => Err(QueryError::Socket(format!(
                "query ended in state {:?}",
                state
            ))),
        }
    }

    // Safe to call on every exit path, including when we never connected.
    async fn release(&mut self) {
        let Some(mut stream) = self.stream.take() else {
            return;
        };

        match tokio::time::timeout(
            Duration::from_millis(ACK_TIMEOUT_MS),
            stream.write_all(ACK_BYTE),
        )
        .await
        {
            Ok(Ok(())) => trace!("device {}: TX ack", self.target),
            Ok(Err(e)) => debug!("device {}: ack write failed: {}", self.target, e),
            Err(_) => debug!(
                "device {}: ack write timed out after {}ms",
                self.target, ACK_TIMEOUT_MS
            ),
        }

        if let Err(e) = stream.shutdown().await {
            trace!("device {}: shutdown: {}", self.target, e);
        }
    }
}

// Searches from just before `from` so a delimiter split across reads is found.
fn find_delimiter(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }

    let start = from.saturating_sub(needle.len() - 1);
    haystack[start..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + start)
}
