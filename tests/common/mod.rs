#![allow(dead_code)]

pub use async_trait::async_trait;
pub use std::sync::{Arc, Mutex};
pub use std::time::Duration;
pub use wifibat_bridge::prelude::*;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const QUERY: &[u8] = b"wifilocalMonitor:get dev real infor";

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub struct Factory();
impl Factory {
    pub fn target(port: u16) -> DeviceTarget {
        DeviceTarget::new("127.0.0.1", port)
    }

    pub fn options(timeout_ms: u64) -> QueryOptions {
        QueryOptions::default()
            .with_timeout(Duration::from_millis(timeout_ms))
            .with_delimiter(b"}")
    }

    pub fn options_without_delimiter(timeout_ms: u64) -> QueryOptions {
        QueryOptions::default().with_timeout(Duration::from_millis(timeout_ms))
    }

    /// A port nothing is listening on.
    pub async fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }
}

/// How a mock device answers once it has read the query.
#[derive(Clone)]
pub enum Behaviour {
    /// Send the chunks (with a short pause between them) and keep the socket open.
    Reply(Vec<&'static str>),
    /// Send the chunks, then close our write side.
    ReplyAndClose(Vec<&'static str>),
    /// Stream this many filler bytes (no delimiter) and keep the socket open.
    Flood(usize),
    /// Never answer.
    Silent,
}

pub struct MockDevice {
    pub port: u16,
    /// Resolves to everything the client wrote after its query, once it closes.
    pub handle: JoinHandle<Vec<u8>>,
}

impl MockDevice {
    pub async fn spawn(behaviour: Behaviour) -> MockDevice {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut query = vec![0u8; QUERY.len()];
            socket.read_exact(&mut query).await.unwrap();
            assert_eq!(query, QUERY);

            match behaviour {
                Behaviour::Reply(chunks) => {
                    write_chunks(&mut socket, chunks).await;
                }
                Behaviour::ReplyAndClose(chunks) => {
                    write_chunks(&mut socket, chunks).await;
                    socket.shutdown().await.unwrap();
                }
                Behaviour::Flood(len) => {
                    socket.write_all(&vec![b'a'; len]).await.unwrap();
                }
                Behaviour::Silent => {}
            }

            let mut rest = Vec::new();
            socket.read_to_end(&mut rest).await.unwrap();
            rest
        });

        MockDevice { port, handle }
    }

    pub fn target(&self) -> DeviceTarget {
        Factory::target(self.port)
    }

    pub async fn client_trailer(self) -> Vec<u8> {
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("mock device never saw the connection close")
            .unwrap()
    }
}

async fn write_chunks(socket: &mut tokio::net::TcpStream, chunks: Vec<&'static str>) {
    for chunk in chunks {
        socket.write_all(chunk.as_bytes()).await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Publisher that records everything instead of sending it.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<Message>>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub fn payload(&self, topic: &str) -> Option<String> {
        self.messages()
            .into_iter()
            .find(|m| m.topic == topic)
            .map(|m| m.payload)
    }

    pub fn topics_for(&self, prefix: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic.starts_with(prefix))
            .map(|m| m.topic)
            .collect()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, message: Message) -> Result<()> {
        self.messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Publisher whose every publish fails.
pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, message: Message) -> Result<()> {
        bail!("broker unavailable for {}", message.topic)
    }
}
