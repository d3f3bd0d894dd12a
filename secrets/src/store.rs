// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Remote storage for the secret bundle.
//!
//! The bundle is always read and written whole. There is no locking: when two
//! operators write concurrently the last write wins.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use aws_sdk_secretsmanager::Client;
use aws_sdk_secretsmanager::error::DisplayErrorContext;

use crate::errors::SecretsError;
use crate::models::SecretBundle;

#[allow(async_fn_in_trait)]
pub trait SecretStore {
    /// Name of the bundle this store reads and writes.
    fn name(&self) -> &str;

    async fn exists(&self) -> Result<bool, SecretsError>;

    async fn fetch(&self) -> Result<SecretBundle, SecretsError>;

    async fn create(&self, bundle: &SecretBundle) -> Result<(), SecretsError>;

    async fn update(&self, bundle: &SecretBundle) -> Result<(), SecretsError>;
}

/// AWS Secrets Manager backed store.
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: Client,
    secret_id: String,
}

impl AwsSecretStore {
    pub fn new(client: Client, secret_id: impl Into<String>) -> Self {
        Self {
            client,
            secret_id: secret_id.into(),
        }
    }

    /// Loads region and credentials from the standard AWS environment and
    /// profile chain.
    pub async fn connect(secret_id: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config), secret_id)
    }
}

fn store_error<E>(operation: &str, err: E) -> SecretsError
where
    E: std::error::Error,
{
    SecretsError::Store(format!("{operation}: {}", DisplayErrorContext(&err)))
}

impl SecretStore for AwsSecretStore {
    fn name(&self) -> &str {
        &self.secret_id
    }

    #[tracing::instrument(skip(self), fields(secret_id = %self.secret_id))]
    async fn exists(&self) -> Result<bool, SecretsError> {
        match self
            .client
            .describe_secret()
            .secret_id(&self.secret_id)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .is_some_and(|service| service.is_resource_not_found_exception());
                if not_found {
                    Ok(false)
                } else {
                    Err(store_error("describe-secret", err))
                }
            }
        }
    }

    #[tracing::instrument(skip(self), fields(secret_id = %self.secret_id))]
    async fn fetch(&self) -> Result<SecretBundle, SecretsError> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&self.secret_id)
            .send()
            .await
            .map_err(|err| store_error("get-secret-value", err))?;

        let raw = output.secret_string().ok_or_else(|| {
            SecretsError::Store(format!("{} has no string value", self.secret_id))
        })?;
        SecretBundle::from_json(raw)
    }

    #[tracing::instrument(skip(self, bundle), fields(secret_id = %self.secret_id, keys = bundle.len()))]
    async fn create(&self, bundle: &SecretBundle) -> Result<(), SecretsError> {
        self.client
            .create_secret()
            .name(&self.secret_id)
            .secret_string(bundle.to_json()?)
            .send()
            .await
            .map_err(|err| store_error("create-secret", err))?;
        tracing::debug!("[secrets] created {}", self.secret_id);
        Ok(())
    }

    #[tracing::instrument(skip(self, bundle), fields(secret_id = %self.secret_id, keys = bundle.len()))]
    async fn update(&self, bundle: &SecretBundle) -> Result<(), SecretsError> {
        self.client
            .update_secret()
            .secret_id(&self.secret_id)
            .secret_string(bundle.to_json()?)
            .send()
            .await
            .map_err(|err| store_error("update-secret", err))?;
        tracing::debug!("[secrets] updated {}", self.secret_id);
        Ok(())
    }
}

/// In-process store that counts remote calls and can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    bundle: Mutex<Option<SecretBundle>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    failure: Option<String>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_bundle(name: impl Into<String>, bundle: SecretBundle) -> Self {
        let store = Self::new(name);
        store.replace(Some(bundle));
        store
    }

    /// Every call fails with `SecretsError::Store(message)` from now on.
    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Number of exists and fetch calls, failed or not.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful create and update calls.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), SecretsError> {
        match &self.failure {
            Some(message) => Err(SecretsError::Store(message.clone())),
            None => Ok(()),
        }
    }

    pub fn snapshot(&self) -> Option<SecretBundle> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SecretBundle>> {
        // a panicking writer cannot leave a half written bundle behind
        self.bundle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn replace(&self, bundle: Option<SecretBundle>) {
        *self.lock() = bundle;
    }
}

impl SecretStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self) -> Result<bool, SecretsError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.lock().is_some())
    }

    async fn fetch(&self) -> Result<SecretBundle, SecretsError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.lock()
            .clone()
            .ok_or_else(|| SecretsError::Store(format!("{} not found", self.name)))
    }

    async fn create(&self, bundle: &SecretBundle) -> Result<(), SecretsError> {
        self.check()?;
        let mut current = self.lock();
        if current.is_some() {
            return Err(SecretsError::Store(format!("{} already exists", self.name)));
        }
        *current = Some(bundle.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update(&self, bundle: &SecretBundle) -> Result<(), SecretsError> {
        self.check()?;
        let mut current = self.lock();
        if current.is_none() {
            return Err(SecretsError::Store(format!("{} not found", self.name)));
        }
        *current = Some(bundle.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
