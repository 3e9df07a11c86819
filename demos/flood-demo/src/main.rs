//! Flood demo - a handful of UDP nodes on loopback
//!
//! Starts a few nodes in one process, wires them into a full mesh, publishes
//! a couple of messages from the first node and logs what the others
//! deliver.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::info;

use murmur_core::NodeId;
use murmur_flood::{FloodConfig, FloodEngine};
use murmur_transport::UdpTransport;

const NODES: usize = 4;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut transports = Vec::with_capacity(NODES);
    for _ in 0..NODES {
        let transport = UdpTransport::bind("127.0.0.1:0".parse()?).await?;
        transports.push(Arc::new(transport));
    }

    // Full mesh: every node knows every other node
    let addrs: Vec<_> = transports.iter().map(|t| t.local_addr()).collect();
    for (i, transport) in transports.iter().enumerate() {
        for (j, addr) in addrs.iter().enumerate() {
            if i != j {
                transport.add_peer(*addr);
            }
        }
    }

    let mut engines = Vec::with_capacity(NODES);
    for (i, transport) in transports.iter().enumerate() {
        let id = NodeId::new(i as u64 + 1);
        let engine = FloodEngine::new(id, Arc::clone(transport), FloodConfig::default());
        engine.run()?;

        let mut deliveries = engine.subscribe();
        tokio::spawn(async move {
            while let Some(delivery) = deliveries.recv().await {
                info!(
                    node = %id,
                    origin = %delivery.origin,
                    payload = %String::from_utf8_lossy(&delivery.payload),
                    "delivered"
                );
            }
        });
        engines.push(engine);
    }

    for round in 1..=3 {
        let payload = format!("gossip round {round}");
        info!(node = %engines[0].identity(), %payload, "publishing");
        engines[0].publish(Bytes::from(payload.into_bytes()))?;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    for engine in &engines {
        let stats = engine.stats();
        info!(
            node = %engine.identity(),
            delivered = stats.delivered,
            duplicates = stats.duplicates,
            "final stats"
        );
        engine.stop();
    }

    Ok(())
}
