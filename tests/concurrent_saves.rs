//! Concurrency tests: version monotonicity under racing writers

use modelvault::{
    AnomalyModel, ModelFactory, SeriesKey, StoreError, TimeSeries, Vault, VaultConfig, Version,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn open_vault(dir: &TempDir) -> Vault {
    let mut config = VaultConfig::default();
    config.storage.filesystem.root = dir.path().to_string_lossy().to_string();
    Vault::open(config).unwrap()
}

fn key(s: &str) -> SeriesKey {
    SeriesKey::new(s).unwrap()
}

fn fitted_model(vault: &Vault) -> Box<dyn AnomalyModel> {
    let mut model = vault.new_model().unwrap();
    model
        .fit(&TimeSeries::from_values([1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    model
}

#[test]
fn fifty_racing_saves_get_fifty_distinct_increasing_versions() {
    let dir = TempDir::new().unwrap();
    let vault = Arc::new(open_vault(&dir));
    let series = key("contended");

    let mut handles = vec![];
    for _ in 0..50 {
        let vault = Arc::clone(&vault);
        let series = series.clone();
        handles.push(thread::spawn(move || {
            let model = fitted_model(&vault);
            vault.save(&series, model.as_ref()).unwrap()
        }));
    }

    let granted: Vec<Version> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let distinct: BTreeSet<Version> = granted.iter().copied().collect();
    assert_eq!(distinct.len(), 50, "duplicate versions were granted");

    let listed = vault.list_versions(&series).unwrap();
    assert_eq!(listed.len(), 50);
    // No version lost, none duplicated, none skipped.
    let expected: Vec<Version> = (0..50).map(Version::new).collect();
    assert_eq!(listed, expected);
}

#[test]
fn racing_saves_on_object_store_backend_are_equally_ordered() {
    let mut config = VaultConfig::default();
    config.storage_type = "object-store".to_string();
    config.storage.object_store.bucket = "race".to_string();
    let vault = Arc::new(Vault::open(config).unwrap());
    let series = key("contended");

    let mut handles = vec![];
    for _ in 0..50 {
        let vault = Arc::clone(&vault);
        let series = series.clone();
        handles.push(thread::spawn(move || {
            let model = fitted_model(&vault);
            vault.save(&series, model.as_ref()).unwrap()
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let expected: Vec<Version> = (0..50).map(Version::new).collect();
    assert_eq!(vault.list_versions(&series).unwrap(), expected);
}

#[test]
fn saves_to_different_series_proceed_independently() {
    let dir = TempDir::new().unwrap();
    let vault = Arc::new(open_vault(&dir));

    let mut handles = vec![];
    for i in 0..8 {
        let vault = Arc::clone(&vault);
        handles.push(thread::spawn(move || {
            let series = key(&format!("series-{}", i));
            let model = fitted_model(&vault);
            for _ in 0..5 {
                vault.save(&series, model.as_ref()).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(vault.list_series().unwrap().len(), 8);
    for i in 0..8 {
        let series = key(&format!("series-{}", i));
        assert_eq!(
            vault.latest_version(&series).unwrap(),
            Some(Version::new(4))
        );
    }
}

#[test]
fn readers_resolve_a_consistent_latest_during_writes() {
    let dir = TempDir::new().unwrap();
    let vault = Arc::new(open_vault(&dir));
    let series = key("busy");

    let model = fitted_model(&vault);
    vault.save(&series, model.as_ref()).unwrap();

    let writer = {
        let vault = Arc::clone(&vault);
        let series = series.clone();
        thread::spawn(move || {
            let model = fitted_model(&vault);
            for _ in 0..20 {
                vault.save(&series, model.as_ref()).unwrap();
            }
        })
    };

    // Every load must resolve to a fully committed version.
    for _ in 0..40 {
        let (loaded, version) = vault.load(&series, None).unwrap();
        assert!(loaded.is_fitted());
        assert!(vault.list_versions(&series).unwrap().contains(&version));
    }
    writer.join().unwrap();
}

#[test]
fn store_stays_consistent_under_sustained_contention() {
    use modelvault::{FilesystemStorage, ModelStorage};

    let dir = TempDir::new().unwrap();
    let factory = Arc::new(ModelFactory::default());
    let store = Arc::new(
        FilesystemStorage::open(dir.path(), Duration::from_millis(50), Arc::clone(&factory))
            .unwrap(),
    );
    let series = key("s1");

    let mut model = factory.create("statistical").unwrap();
    model.fit(&TimeSeries::from_values([1.0, 2.0])).unwrap();
    store.save(&series, model.as_ref(), None).unwrap();

    let writer = {
        let store = Arc::clone(&store);
        let series = series.clone();
        let model_bytes = model.to_bytes().unwrap();
        let factory = Arc::clone(&factory);
        thread::spawn(move || {
            let mut held = factory.create("statistical").unwrap();
            held.from_bytes(&model_bytes).unwrap();
            let start = std::time::Instant::now();
            while start.elapsed() < Duration::from_millis(300) {
                store.save(&series, held.as_ref(), None).unwrap();
            }
        })
    };

    // With a 50 ms budget against a hot writer, reads either succeed or
    // surface LockTimeout; nothing else is acceptable.
    let start = std::time::Instant::now();
    while start.elapsed() < Duration::from_millis(300) {
        match store.load(&series, None) {
            Ok((loaded, _)) => assert!(loaded.is_fitted()),
            Err(StoreError::LockTimeout { .. }) => {}
            Err(other) => panic!("unexpected error under contention: {}", other),
        }
    }
    writer.join().unwrap();

    // The committed sequence is gapless and strictly increasing afterwards.
    let versions = store.list_versions(&series).unwrap();
    let expected: Vec<Version> = (0..versions.len() as u64).map(Version::new).collect();
    assert_eq!(versions, expected);
}
