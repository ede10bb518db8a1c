use criterion::{BatchSize, Criterion, Throughput};
use std::collections::VecDeque;
use std::hint::black_box;
use thinglink::network::application::mqtt::client::{Client, Options};
use thinglink::network::error::Error;
use thinglink::network::{Close, Connection, Read, Write};

const TOPIC: &str = "$thing/down/property/ABC123/dev1";
const PAYLOAD: &[u8] = br#"{"method":"control","clientToken":"c1","params":{"power":1,"brightness":80}}"#;

/// In-memory stream: reads drain `inbound`, writes are counted and dropped
struct MemoryConnection {
    inbound: VecDeque<u8>,
    written: usize,
}

impl Read for MemoryConnection {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryConnection {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for MemoryConnection {
    type Error = Error;
    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for MemoryConnection {}

fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
    let mut len = 2 + topic.len() + payload.len();
    let mut packet = vec![0x30];
    loop {
        let byte = (len % 128) as u8;
        len /= 128;
        if len == 0 {
            packet.push(byte);
            break;
        }
        packet.push(byte | 0x80);
    }
    packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    packet.extend_from_slice(topic.as_bytes());
    packet.extend_from_slice(payload);
    packet
}

fn setup_client(inbound_messages: usize) -> Client<MemoryConnection> {
    let mut inbound: VecDeque<u8> = [0x20, 0x02, 0x00, 0x00].into_iter().collect();
    let packet = publish_packet(TOPIC, PAYLOAD);
    for _ in 0..inbound_messages {
        inbound.extend(packet.iter().copied());
    }
    let conn = MemoryConnection { inbound, written: 0 };

    let opts = Options {
        client_id: "ABC123dev1",
        username: Some("ABC123dev1;12010126;12345;1924963199"),
        password: Some("6808C66EA639967303A5403D3F73D932D01681F2195F0D6078901524490DBCA8;hmacsha256"),
        keep_alive_seconds: 60,
        clean_session: true,
    };

    Client::connect(conn, opts).expect("Failed to connect")
}

pub fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("mqtt_publish");
    group.throughput(Throughput::Bytes(PAYLOAD.len() as u64));
    group.bench_function("publish", |b| {
        b.iter_batched_ref(
            || setup_client(0),
            |client| {
                client
                    .publish("$thing/up/property/ABC123/dev1", black_box(PAYLOAD))
                    .expect("Failed to publish");
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("mqtt_poll");
    group.throughput(Throughput::Bytes(PAYLOAD.len() as u64 * 50));
    group.bench_function("poll_50", |b| {
        b.iter_batched_ref(
            || setup_client(50),
            |client| {
                for _ in 0..50 {
                    let message = client.poll().expect("Failed to poll");
                    black_box(message);
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
