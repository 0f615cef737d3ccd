//! Loopback benchmark suite.
//!
//! Benchmarks the transport against an in-process echo server:
//! - Connect latency (handshake through `ConnectFuture` resolution)
//! - Binary write/echo round trips at several payload sizes
//!
//! Run with: cargo bench --bench loopback
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;

use wamp_ws_transport::{EngineConfig, TungsteniteEngine, WebSocketTransport};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[16, 1024, 64 * 1024];
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Echo Server
// ============================================================================

/// Starts an echo server accepting any number of connections.
fn start_echo_server(rt: &Runtime) -> String {
    let listener = rt
        .block_on(TcpListener::bind("127.0.0.1:0"))
        .expect("bind echo server");
    let port = listener.local_addr().expect("local addr").port();

    rt.spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let negotiate = |request: &Request, mut response: Response| {
                    if let Some(offered) = request.headers().get(SEC_WEBSOCKET_PROTOCOL).cloned() {
                        response.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, offered);
                    }
                    Ok::<Response, ErrorResponse>(response)
                };
                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, negotiate).await
                else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Binary(data) = message
                        && ws.send(Message::Binary(data)).await.is_err()
                    {
                        return;
                    }
                }
            });
        }
    });

    format!("ws://127.0.0.1:{port}/ws")
}

// ============================================================================
// Benchmark: Connect
// ============================================================================

fn bench_connect(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let url = start_echo_server(&rt);
    let engine = Arc::new(TungsteniteEngine::new(EngineConfig::default()).unwrap());

    let mut group = c.benchmark_group("connect");
    group.sample_size(20);

    group.bench_function("open_close", |b| {
        b.to_async(&rt).iter(|| async {
            let transport = WebSocketTransport::new(Arc::clone(&engine));
            transport.connect(&url).await.unwrap();
            transport.close().unwrap();
            black_box(transport.is_connected());
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Echo Round Trip
// ============================================================================

fn bench_echo_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let url = start_echo_server(&rt);
    let engine = Arc::new(TungsteniteEngine::new(EngineConfig::default()).unwrap());

    let transport = WebSocketTransport::new(engine);
    let (tx, rx) = mpsc::channel::<usize>();
    transport.set_message_handler(move |payload| {
        let _ = tx.send(payload.len());
    });
    transport.connect(&url).wait().unwrap();

    let mut group = c.benchmark_group("echo_round_trip");

    for &size in PAYLOAD_SIZES {
        let payload = vec![0xa5_u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("binary", size), &payload, |b, payload| {
            b.iter(|| {
                transport.write(black_box(payload)).unwrap();
                let echoed = rx.recv_timeout(RECV_TIMEOUT).unwrap();
                assert_eq!(echoed, payload.len());
            });
        });
    }

    group.finish();
    transport.close().unwrap();
}

criterion_group!(benches, bench_connect, bench_echo_round_trip);
criterion_main!(benches);
