use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fsrcnn_rust::config::{Config, NetworkConfig};
use fsrcnn_rust::network::Network;
use fsrcnn_rust::training::{Batch, Session};
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn default_network() -> Network {
    let mut network = Network::new(&NetworkConfig::default()).expect("default architecture is valid");
    network
        .weight_init(0.0, 0.02, &mut StdRng::seed_from_u64(0))
        .expect("weight initialisation succeeds");
    network
}

fn bench_forward(c: &mut Criterion) {
    let network = default_network();

    let mut group = c.benchmark_group("forward");
    for size in [8, 16, 32].iter() {
        let input = Array4::<f32>::from_elem((1, 1, *size, *size), 0.5);
        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| network.forward(black_box(input)));
        });
    }
    group.finish();
}

fn bench_train_step(c: &mut Criterion) {
    let config = Config {
        network: NetworkConfig::builder().scale_factor(2).build(),
        ..Config::default()
    };
    let mut session = Session::new(&config, &mut StdRng::seed_from_u64(0)).expect("session on cpu");

    let mut group = c.benchmark_group("train_step");
    for batch_size in [1, 4].iter() {
        let batch = Batch {
            input: Array4::from_elem((*batch_size, 1, 16, 16), 0.4),
            target: Array4::from_elem((*batch_size, 1, 32, 32), 0.5),
        };
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch_size), &batch, |b, batch| {
            b.iter(|| session.train_step(black_box(batch)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_forward, bench_train_step);
criterion_main!(benches);
