use criterion::{criterion_group, criterion_main};

mod network;
mod thing;

criterion_group!(
    benches,
    thing::bench_derive_credentials,
    thing::bench_params_lookup,
    thing::bench_render_buffer,
    thing::bench_dispatch,
    network::application::mqtt::client::bench_publish,
    network::application::mqtt::client::bench_poll
);
criterion_main!(benches);
