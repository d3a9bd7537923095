use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::broker::{Framing, Message, Registry};
use crate::config::{BrokerSettings, Transport};
use crate::transport::Listener;

async fn start(settings: BrokerSettings) -> (SocketAddr, Arc<Registry>) {
    let registry = Arc::new(Registry::with_framing(settings.framing));
    let listener = Listener::bind(Transport::Tcp, "127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(listener.serve(registry.clone(), settings));
    (addr, registry)
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn integration_fan_out_to_many_subscribers() {
    let (addr, registry) = start(BrokerSettings::default()).await;

    let mut subscribers = Vec::new();
    for _ in 0..10 {
        let mut stream = TcpStream::connect(addr).await.expect("subscriber connect");
        stream.write_all(b"SUBSCRIBE weather\n").await.unwrap();
        subscribers.push(stream);
    }
    let mut bystander = TcpStream::connect(addr).await.expect("bystander connect");
    bystander.write_all(b"SUBSCRIBE sports\n").await.unwrap();
    wait_until(|| {
        registry.subscriber_count("weather") == 10 && registry.subscriber_count("sports") == 1
    })
    .await;

    let mut publisher = TcpStream::connect(addr).await.expect("publisher connect");
    publisher
        .write_all(b"PUBLISH weather\nMESSAGE rain\nMESSAGE clear\n")
        .await
        .unwrap();

    let received = join_all(subscribers.into_iter().map(|stream| async move {
        let mut lines = BufReader::new(stream).lines();
        let first = lines.next_line().await.unwrap();
        let second = lines.next_line().await.unwrap();
        (first, second)
    }));
    let received = tokio::time::timeout(Duration::from_secs(5), received)
        .await
        .expect("subscribers did not receive both messages");

    for (first, second) in received {
        assert_eq!(first.as_deref(), Some("weather: rain"));
        assert_eq!(second.as_deref(), Some("weather: clear"));
    }

    // the sports subscriber only sees sports traffic
    let mut sports_pub = TcpStream::connect(addr).await.expect("publisher connect");
    sports_pub
        .write_all(b"PUBLISH sports\nMESSAGE kickoff\n")
        .await
        .unwrap();
    let mut lines = BufReader::new(bystander).lines();
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(line.as_deref(), Some("sports: kickoff"));
}

#[tokio::test]
async fn integration_json_framing() {
    let settings = BrokerSettings {
        framing: Framing::Json,
        ..BrokerSettings::default()
    };
    let (addr, registry) = start(settings).await;

    let mut sub = TcpStream::connect(addr).await.expect("subscriber connect");
    sub.write_all(b"SUBSCRIBE sports\n").await.unwrap();
    wait_until(|| registry.subscriber_count("sports") == 1).await;

    let mut publisher = TcpStream::connect(addr).await.expect("publisher connect");
    publisher
        .write_all(b"PUBLISH sports\nMESSAGE final score 3-1\n")
        .await
        .unwrap();

    let mut lines = BufReader::new(sub).lines();
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timed out")
        .unwrap()
        .expect("stream ended");
    let msg: Message = serde_json::from_str(&line).unwrap();
    assert_eq!(msg.topic, "sports");
    assert_eq!(msg.payload, "final score 3-1");
}

#[tokio::test]
async fn integration_closed_subscriber_receives_nothing() {
    let (addr, registry) = start(BrokerSettings::default()).await;

    let mut gone = TcpStream::connect(addr).await.expect("subscriber connect");
    gone.write_all(b"SUBSCRIBE news\n").await.unwrap();
    let mut live = TcpStream::connect(addr).await.expect("subscriber connect");
    live.write_all(b"SUBSCRIBE news\n").await.unwrap();
    wait_until(|| registry.subscriber_count("news") == 2).await;

    drop(gone);
    wait_until(|| registry.subscriber_count("news") == 1).await;

    let mut publisher = TcpStream::connect(addr).await.expect("publisher connect");
    publisher
        .write_all(b"PUBLISH news\nMESSAGE headline\n")
        .await
        .unwrap();

    let mut lines = BufReader::new(live).lines();
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timed out")
        .unwrap();
    assert_eq!(line.as_deref(), Some("news: headline"));
    assert_eq!(registry.subscriber_count("news"), 1);
}
