// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use data_encoding::BASE64URL_NOPAD;
use zeroize::Zeroize;

use crate::constants::{
    MASK_EMPTY, MASK_VISIBLE_CHARS, PLACEHOLDER_RANDOM_BYTES, PLACEHOLDER_TOKEN_PREFIX,
    PLACEHOLDER_VALUE,
};
use crate::errors::SecretsError;

/// The key/value credentials of one environment, stored and rewritten as a
/// single unit.
///
/// Values are wiped from memory when the bundle is dropped and never appear
/// in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretBundle {
    values: BTreeMap<String, String>,
}

impl SecretBundle {
    /// Parses a JSON object whose values are all strings.
    pub fn from_json(raw: &str) -> Result<Self, SecretsError> {
        let values: BTreeMap<String, String> =
            serde_json::from_str(raw).map_err(|err| SecretsError::InvalidJson(err.to_string()))?;
        Ok(Self { values })
    }

    pub fn to_json(&self) -> Result<String, SecretsError> {
        serde_json::to_string(&self.values).map_err(|err| SecretsError::InvalidJson(err.to_string()))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: String) {
        if let Some(mut previous) = self.values.insert(key.to_string(), value) {
            previous.zeroize();
        }
    }

    /// Returns false when the key was not present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.values.remove(key) {
            Some(mut previous) => {
                previous.zeroize();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
        self.values.iter()
    }

    /// Replaces every value that is exactly `TBD` with a fresh placeholder
    /// token and returns how many were replaced.
    pub fn resolve_placeholders(&mut self) -> Result<usize, SecretsError> {
        let mut replaced = 0;
        for value in self.values.values_mut() {
            if *value == PLACEHOLDER_VALUE {
                *value = placeholder_token()?;
                replaced += 1;
            }
        }
        Ok(replaced)
    }
}

impl Drop for SecretBundle {
    fn drop(&mut self) {
        for value in self.values.values_mut() {
            value.zeroize();
        }
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|key| (key, "[REDACTED]")))
            .finish()
    }
}

/// `TBD_` followed by 10 random bytes from the system CSPRNG, base64url
/// encoded without padding.
pub fn placeholder_token() -> Result<String, SecretsError> {
    let mut bytes = [0u8; PLACEHOLDER_RANDOM_BYTES];
    aws_lc_rs::rand::fill(&mut bytes).map_err(|_| SecretsError::Random)?;
    let token = format!("{PLACEHOLDER_TOKEN_PREFIX}{}", BASE64URL_NOPAD.encode(&bytes));
    bytes.zeroize();
    Ok(token)
}

/// Values still waiting for a real credential.
pub fn is_placeholder(value: &str) -> bool {
    value.starts_with(PLACEHOLDER_VALUE)
}

/// First four characters, then one `*` per remaining character.
pub fn mask(value: &str) -> String {
    if value.is_empty() {
        return MASK_EMPTY.to_string();
    }
    let visible: String = value.chars().take(MASK_VISIBLE_CHARS).collect();
    let hidden = value.chars().count().saturating_sub(MASK_VISIBLE_CHARS);
    format!("{visible}{}", "*".repeat(hidden))
}
