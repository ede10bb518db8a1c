use criterion::{Criterion, Throughput};
use serde::Deserialize;
use std::hint::black_box;
use thinglink::thing::transport::state;
use thinglink::thing::{
    Config, Credentials, DeviceIdentity, Message, Params, Platform, PropertyBuffer, Reply, Session,
    Transport,
};

const ACTION_DOWN: &str = "$thing/down/action/ABC123/dev1";
const PROPERTY_DOWN: &str = "$thing/down/property/ABC123/dev1";

/// Transport that accepts everything and keeps nothing
struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn set_server(&mut self, _host: &str, _port: u16) -> Result<(), ()> {
        Ok(())
    }

    fn connect(&mut self, _client_id: &str, _username: &str, _password: &str) -> Result<(), ()> {
        Ok(())
    }

    fn connected(&self) -> bool {
        true
    }

    fn state(&self) -> i8 {
        state::CONNECTED
    }

    fn publish(&mut self, _topic: &str, payload: &[u8]) -> Result<(), ()> {
        black_box(payload);
        Ok(())
    }

    fn subscribe(&mut self, _topic: &str) -> Result<(), ()> {
        Ok(())
    }

    fn poll(&mut self, _now_ms: u32) -> Result<Option<Message>, ()> {
        Ok(None)
    }
}

struct FixedPlatform;

impl Platform for FixedPlatform {
    fn now_ms(&self) -> u32 {
        0
    }

    fn random(&mut self) -> u32 {
        4242
    }

    fn restart(&mut self) {}
}

fn identity() -> DeviceIdentity {
    DeviceIdentity::new("ABC123", "dev1", "c2VjcmV0LWtleS0xMjM0NTY=").expect("valid identity")
}

pub fn bench_derive_credentials(c: &mut Criterion) {
    let identity = identity();
    c.bench_function("derive_credentials", |b| {
        b.iter(|| Credentials::derive(black_box(&identity), "12010126", black_box(12345), 1_924_963_199))
    });
}

#[derive(Deserialize)]
struct Control<'a> {
    brightness: u8,
    #[serde(borrow)]
    mode: &'a str,
}

pub fn bench_params_lookup(c: &mut Criterion) {
    let payload = r#"{"method":"control","clientToken":"c1","params":{"power":1,"brightness":80,"color":{"r":255,"g":128,"b":0},"mode":"eco"}}"#;
    let mut group = c.benchmark_group("params");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("parse_and_get", |b| {
        b.iter(|| {
            let root = Params::parse(black_box(payload)).expect("valid json");
            let control: Control<'_> = root.get("params").expect("params present");
            black_box(control.brightness);
            black_box(control.mode);
            black_box(root.get_str::<16>("clientToken"));
        })
    });
    group.finish();
}

pub fn bench_render_buffer(c: &mut Criterion) {
    let mut buffer: PropertyBuffer<10> = PropertyBuffer::new(0);
    for (i, key) in ["k0", "k1", "k2", "k3", "k4", "k5", "k6", "k7", "k8", "k9"]
        .iter()
        .enumerate()
    {
        buffer.put_value(key, &(i as u32 * 1000)).expect("buffer has room");
    }
    c.bench_function("render_property_buffer", |b| b.iter(|| black_box(&buffer).render()));
}

pub fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let mut on_power = |params: Params<'_>| {
        black_box(params.get::<u8>("power"));
        Reply::SUCCESS
    };
    let mut reboot = |_: Params<'_>| Reply::SUCCESS;

    let mut session = Session::begin(NullTransport, FixedPlatform, identity(), Config::default())
        .expect("session starts");
    session.bind_property("power", &mut on_power).expect("slot free");
    session.bind_action("reboot", &mut reboot).expect("slot free");

    let property = br#"{"method":"control","clientToken":"c1","params":{"power":1}}"#;
    let action = br#"{"method":"action","clientToken":"42","actionId":"reboot","params":{}}"#;

    group.bench_function("property", |b| {
        b.iter(|| session.handle_message(PROPERTY_DOWN, black_box(property)))
    });
    group.bench_function("action_with_reply", |b| {
        b.iter(|| session.handle_message(ACTION_DOWN, black_box(action)))
    });
    group.finish();
}
