//! Test bridge: speaks the JSON line protocol from the platform side.

use pingwire_proto::Outbound;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

pub const GUILD: u64 = 100;
pub const CHANNEL: u64 = 55;

pub struct TestBridge {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    next_message: u64,
}

impl TestBridge {
    /// Connect and complete the `ready` handshake.
    pub async fn connect(address: &str, self_id: u64) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        let mut bridge = Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
            next_message: 900,
        };
        bridge
            .send(json!({ "type": "ready", "self_id": self_id.to_string() }))
            .await?;
        Ok(bridge)
    }

    pub async fn send(&mut self, frame: Value) -> anyhow::Result<()> {
        self.writer.write_all(frame.to_string().as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Announce the test guild channel and who is in it.
    pub async fn announce_channel(&mut self, members: &[u64]) -> anyhow::Result<()> {
        self.send(json!({
            "type": "channel_upsert",
            "context": guild_context(),
            "name": "general",
            "members": ids(members),
        }))
        .await
    }

    /// Post a message in the test guild channel.
    pub async fn say(&mut self, author: u64, mentions: &[u64], content: &str) -> anyhow::Result<()> {
        self.next_message += 1;
        self.send(json!({
            "type": "message_create",
            "id": self.next_message.to_string(),
            "context": guild_context(),
            "author": author.to_string(),
            "mentions": ids(mentions),
            "content": content,
        }))
        .await
    }

    /// Receive the next outbound send and report it delivered.
    pub async fn expect_send(&mut self) -> anyhow::Result<Outbound> {
        let frame = self.recv_timeout(Duration::from_secs(5)).await?;
        let Outbound::Send { nonce, .. } = &frame;
        self.send(json!({
            "type": "send_result",
            "nonce": nonce,
            "outcome": { "status": "delivered" },
        }))
        .await?;
        Ok(frame)
    }

    /// Assert that nothing is sent for a while.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_timeout(dur).await {
            Ok(frame) => anyhow::bail!("unexpected frame: {frame:?}"),
            Err(_) => Ok(()),
        }
    }

    async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Outbound> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("daemon closed the connection");
        }
        Ok(serde_json::from_str(line.trim_end())?)
    }
}

pub fn guild_context() -> Value {
    json!({
        "kind": "guild_text",
        "guild_id": GUILD.to_string(),
        "channel_id": CHANNEL.to_string(),
    })
}

fn ids(raw: &[u64]) -> Vec<String> {
    raw.iter().map(u64::to_string).collect()
}
