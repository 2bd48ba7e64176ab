use fsrcnn_rust::network::Network;
use fsrcnn_rust::training::{CheckpointStore, LoadOutcome, ModelState};
use fsrcnn_rust::{checkpoint_from_bytes, checkpoint_to_bytes, Checkpoint, FsrcnnError, NetworkConfig};
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn network(seed: u64) -> Network {
    let config = NetworkConfig::builder().scale_factor(3).d(8).s(4).m(2).build();
    let mut network = Network::new(&config).unwrap();
    network.weight_init(0.0, 0.02, &mut StdRng::seed_from_u64(seed)).unwrap();
    network
}

#[test]
fn test_restored_network_produces_identical_output() {
    let original = network(1);
    let bytes = checkpoint_to_bytes(Checkpoint::from_network(&original)).unwrap();
    let restored = checkpoint_from_bytes(&bytes).unwrap().into_network().unwrap();

    let input = Array4::from_shape_fn((1, 1, 6, 5), |(_, _, h, w)| (h * 5 + w) as f32 / 30.0);
    assert_eq!(original.forward(&input).unwrap(), restored.forward(&input).unwrap());
}

#[test]
fn test_store_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path(), "FSRCNN", 10);
    let saved = network(2);
    let path = store.save(&saved, None).unwrap();
    assert_eq!(path, dir.path().join("model").join("FSRCNN_param.rsr"));

    let mut loaded = network(3);
    let outcome = store.load(&mut loaded).unwrap();
    assert_eq!(outcome, LoadOutcome::Loaded(path));
    assert_eq!(ModelState::from(&outcome), ModelState::Trained);
    assert_eq!(loaded.parameters(), saved.parameters());
}

#[test]
fn test_missing_checkpoint_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path(), "FSRCNN", 10);
    let mut net = network(4);
    let before = net.parameters();
    let outcome = store.load(&mut net).unwrap();
    assert_eq!(ModelState::from(&outcome), ModelState::Untrained);
    assert_eq!(net.parameters(), before);
}

#[test]
fn test_architecture_mismatch_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(dir.path(), "FSRCNN", 10);
    store.save(&network(5), None).unwrap();

    let other = NetworkConfig::builder().scale_factor(2).d(8).s(4).m(2).build();
    let mut net = Network::new(&other).unwrap();
    assert!(matches!(store.load(&mut net), Err(FsrcnnError::InvalidParameter(_))));
}
