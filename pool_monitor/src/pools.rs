//! Pool definitions and the key sets they resolve to.
//!
//! A pool identifier is resolved in this order:
//!
//! 1. ends in `.txt`: a file of public keys, the pool is named after the file stem;
//! 2. a built-in pool name: a key set compiled into the binary;
//! 3. a name in the configured address book: keys are looked up by deposit sender address.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use types::{PublicKeyBytes, PublicKeyBytesError};

const CONSENSYSCODEFI_KEYS: &str = include_str!("builtin_pools/consensyscodefi.txt");

/// Built-in pool names and their key lists.
const BUILTIN_POOLS: &[(&str, &str)] = &[("consensyscodefi", CONSENSYSCODEFI_KEYS)];

#[derive(Debug)]
pub enum PoolError {
    Io(PathBuf, std::io::Error),
    InvalidKey {
        source: String,
        line: usize,
        error: PublicKeyBytesError,
    },
    InvalidAddress {
        pool: String,
        address: String,
    },
    UnknownPool(String),
    DuplicatePool(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Io(path, e) => write!(f, "unable to read {}: {}", path.display(), e),
            PoolError::InvalidKey {
                source,
                line,
                error,
            } => write!(f, "invalid key in {} line {}: {}", source, line, error),
            PoolError::InvalidAddress { pool, address } => {
                write!(f, "invalid deposit address for {}: {}", pool, address)
            }
            PoolError::UnknownPool(name) => write!(
                f,
                "unknown pool {}: not a built-in pool, a .txt key file or a pool_addresses entry",
                name
            ),
            PoolError::DuplicatePool(name) => write!(f, "pool {} is configured twice", name),
        }
    }
}

/// Where the keys of a pool come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PoolKeys {
    /// Known up front, from a built-in list or a key file.
    Static(Vec<PublicKeyBytes>),
    /// Looked up every cycle from deposits made by these (lowercase, `0x`-prefixed) addresses.
    DepositAddresses(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pool {
    pub name: String,
    pub keys: PoolKeys,
}

impl Pool {
    pub fn from_identifier(
        identifier: &str,
        address_book: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, PoolError> {
        if identifier.ends_with(".txt") {
            let path = Path::new(identifier);
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| identifier.to_string());
            return Ok(Pool {
                name,
                keys: PoolKeys::Static(read_key_file(path)?),
            });
        }

        if let Some((name, contents)) = BUILTIN_POOLS.iter().find(|(name, _)| *name == identifier)
        {
            return Ok(Pool {
                name: name.to_string(),
                keys: PoolKeys::Static(parse_keys(contents, name)?),
            });
        }

        if let Some(addresses) = address_book.get(identifier) {
            let addresses = addresses
                .iter()
                .map(|address| normalize_address(identifier, address))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Pool {
                name: identifier.to_string(),
                keys: PoolKeys::DepositAddresses(addresses),
            });
        }

        Err(PoolError::UnknownPool(identifier.to_string()))
    }

    pub fn needs_key_directory(&self) -> bool {
        matches!(self.keys, PoolKeys::DepositAddresses(_))
    }
}

/// Resolve every configured identifier, rejecting pools that would report under the same name.
pub fn load_pools(
    identifiers: &[String],
    address_book: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<Pool>, PoolError> {
    let mut names = HashSet::new();
    identifiers
        .iter()
        .map(|identifier| {
            let pool = Pool::from_identifier(identifier, address_book)?;
            if !names.insert(pool.name.clone()) {
                return Err(PoolError::DuplicatePool(pool.name));
            }
            Ok(pool)
        })
        .collect()
}

pub fn builtin_pool_names() -> impl Iterator<Item = &'static str> {
    BUILTIN_POOLS.iter().map(|(name, _)| *name)
}

pub fn read_key_file(path: &Path) -> Result<Vec<PublicKeyBytes>, PoolError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| PoolError::Io(path.to_path_buf(), e))?;
    parse_keys(&contents, &path.display().to_string())
}

/// Parse one hex key per line. Blank lines and `#` comments are skipped, repeated keys are
/// kept once.
pub fn parse_keys(contents: &str, source: &str) -> Result<Vec<PublicKeyBytes>, PoolError> {
    let mut seen = HashSet::new();
    let mut keys = vec![];
    for (i, line) in contents.lines().enumerate() {
        let line = line.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let key = PublicKeyBytes::from_str(line).map_err(|error| PoolError::InvalidKey {
            source: source.to_string(),
            line: i + 1,
            error,
        })?;
        if seen.insert(key) {
            keys.push(key);
        }
    }
    Ok(keys)
}

fn normalize_address(pool: &str, address: &str) -> Result<String, PoolError> {
    let invalid = || PoolError::InvalidAddress {
        pool: pool.to_string(),
        address: address.to_string(),
    };
    let trimmed = address.trim();
    let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(hex_part).map_err(|_| invalid())?;
    if bytes.len() != 20 {
        return Err(invalid());
    }
    Ok(format!("0x{}", hex::encode(bytes)))
}
