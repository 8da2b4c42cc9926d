//! Sources of signing identities.
//!
//! Raw key material is parsed here and nowhere else; the rest of the harness only
//! ever sees [`Identity`] values.

use std::{fs, path::Path, path::PathBuf};

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::{error::SecretError, identity::Identity};

/// Something that yields the identities of a run.
pub trait SecretProvider {
    /// Loads the identities, in pool order.
    fn load(&self) -> Result<Vec<Identity>, SecretError>;
}

/// One wallet entry of a wallets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletData {
    /// Checksummed address.
    pub address: String,
    /// Hex encoded private key.
    pub private_key: String,
}

/// On-disk wallets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletsFile {
    /// Wallets in pool order.
    pub wallets: Vec<WalletData>,
}

/// Loads identities from a JSON wallets file.
#[derive(Debug, Clone)]
pub struct WalletsFileProvider {
    path: PathBuf,
}

impl WalletsFileProvider {
    /// Creates a provider reading `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SecretProvider for WalletsFileProvider {
    fn load(&self) -> Result<Vec<Identity>, SecretError> {
        let json = fs::read_to_string(&self.path)
            .map_err(|source| SecretError::Io { path: self.path.clone(), source })?;
        let file: WalletsFile = serde_json::from_str(&json)?;
        parse_keys(file.wallets.iter().map(|w| w.private_key.as_str()))
    }
}

/// Loads identities from a comma-separated list of hex keys in an environment variable.
#[derive(Debug, Clone)]
pub struct EnvKeysProvider {
    var: String,
}

impl EnvKeysProvider {
    /// Default variable name.
    pub const DEFAULT_VAR: &'static str = "NOTARY_IDENTITY_KEYS";

    /// Creates a provider reading `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl SecretProvider for EnvKeysProvider {
    fn load(&self) -> Result<Vec<Identity>, SecretError> {
        let raw = std::env::var(&self.var).map_err(|_| SecretError::MissingVar(self.var.clone()))?;
        parse_keys(raw.split(',').map(str::trim).filter(|k| !k.is_empty()))
    }
}

/// Generates fresh random identities, optionally from a seed.
#[derive(Debug, Clone, Copy)]
pub struct GeneratedIdentities {
    count: usize,
    seed: Option<u64>,
}

impl GeneratedIdentities {
    /// Generates `count` identities from OS entropy.
    pub const fn new(count: usize) -> Self {
        Self { count, seed: None }
    }

    /// Makes generation reproducible.
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl SecretProvider for GeneratedIdentities {
    fn load(&self) -> Result<Vec<Identity>, SecretError> {
        if self.count == 0 {
            return Err(SecretError::Empty);
        }
        let mut rng = match self.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Ok((0..self.count).map(|_| Identity::new(random_signer(&mut rng))).collect())
    }
}

/// Writes identities to a wallets file readable by [`WalletsFileProvider`].
pub fn save_wallets(identities: &[Identity], path: &Path) -> Result<(), SecretError> {
    let file = WalletsFile {
        wallets: identities
            .iter()
            .map(|id| WalletData {
                address: id.address().to_checksum(None),
                private_key: format!("0x{}", hex::encode(id.signer().to_bytes())),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&file)?;
    fs::write(path, json).map_err(|source| SecretError::Io { path: path.to_path_buf(), source })
}

fn parse_keys<'a>(keys: impl Iterator<Item = &'a str>) -> Result<Vec<Identity>, SecretError> {
    let identities = keys
        .enumerate()
        .map(|(index, key)| {
            key.parse::<PrivateKeySigner>()
                .map(Identity::new)
                .map_err(|_| SecretError::InvalidKey { index })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if identities.is_empty() {
        return Err(SecretError::Empty);
    }
    Ok(identities)
}

fn random_signer(rng: &mut ChaCha8Rng) -> PrivateKeySigner {
    loop {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        // Out-of-range scalars are astronomically rare; draw again.
        if let Ok(signer) = PrivateKeySigner::from_bytes(&B256::from(bytes)) {
            return signer;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = GeneratedIdentities::new(3).with_seed(42).load().unwrap();
        let b = GeneratedIdentities::new(3).with_seed(42).load().unwrap();
        let addrs = |ids: &[Identity]| ids.iter().map(Identity::address).collect::<Vec<_>>();
        assert_eq!(addrs(&a), addrs(&b));
        assert_ne!(a[0].address(), a[1].address());
    }

    #[test]
    fn wallets_file_round_trips_pool_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallets.json");
        let ids = GeneratedIdentities::new(4).with_seed(3).load().unwrap();
        save_wallets(&ids, &path).unwrap();

        let loaded = WalletsFileProvider::new(&path).load().unwrap();
        assert_eq!(loaded.len(), 4);
        for (a, b) in ids.iter().zip(&loaded) {
            assert_eq!(a.address(), b.address());
        }
    }

    #[test]
    fn invalid_key_reports_position() {
        let keys = ["0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80", "nope"];
        let err = parse_keys(keys.into_iter()).unwrap_err();
        assert!(matches!(err, SecretError::InvalidKey { index: 1 }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = WalletsFileProvider::new("/nonexistent/wallets.json").load().unwrap_err();
        assert!(matches!(err, SecretError::Io { .. }));
    }

    #[test]
    fn zero_generated_identities_is_empty() {
        assert!(matches!(GeneratedIdentities::new(0).load(), Err(SecretError::Empty)));
    }
}
