//! In-memory persistence adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`] over a map keyed by
//! `namespace::key`. Used by the simulator and by tests; contents vanish
//! with the process.
//!
//! # Security
//!
//! - Push cadence is validated before it is serialized.
//! - Secrets arrive already codec-transformed and are stored as opaque
//!   bytes.

use std::collections::HashMap;

use log::info;

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::PushFrequency;

const CONFIG_NAMESPACE: &str = "pb";
const CONFIG_KEY: &str = "pushfreq";

/// Largest value accepted per key.
const MAX_VALUE_SIZE: usize = 4000;

#[derive(Debug, Default)]
pub struct MemStore {
    store: HashMap<String, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Raw stored bytes, for inspection.
    pub fn raw(&self, namespace: &str, key: &str) -> Option<&[u8]> {
        self.store
            .get(&Self::composite_key(namespace, key))
            .map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl ConfigPort for MemStore {
    fn load(&self) -> Result<Option<PushFrequency>, ConfigError> {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        if let Some(bytes) = self.store.get(&key) {
            let freq: PushFrequency =
                postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
            freq.validate()?;
            info!("MemStore: loaded push cadence {}s/{}s", freq.fast, freq.slow);
            Ok(Some(freq))
        } else {
            info!("MemStore: no stored push cadence");
            Ok(None)
        }
    }

    fn save(&mut self, freq: &PushFrequency) -> Result<(), ConfigError> {
        freq.validate()?;
        let bytes = postcard::to_allocvec(freq).map_err(|_| ConfigError::IoError)?;
        self.store
            .insert(Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY), bytes);
        info!("MemStore: push cadence saved");
        Ok(())
    }
}

impl StoragePort for MemStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.store.get(&Self::composite_key(namespace, key)) {
            Some(data) => {
                let len = data.len().min(buf.len());
                buf[..len].copy_from_slice(&data[..len]);
                Ok(len)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        if data.len() > MAX_VALUE_SIZE {
            return Err(StorageError::Full);
        }
        self.store
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store.remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.store
            .contains_key(&Self::composite_key(namespace, key))
    }
}
