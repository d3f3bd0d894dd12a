// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The secret bundle commands.
//!
//! Every command reads the whole bundle, changes it in memory and writes it
//! back at most once. Interactive review goes through a [`Terminal`] so the
//! flows can be driven from tests.

use std::io::{BufRead, Write};

use crate::configuration::Command;
use crate::constants::{PROMPT_ENTER, PROMPT_KEEP, PROMPT_NEW, USAGE};
use crate::errors::SecretsError;
use crate::models::{SecretBundle, is_placeholder, mask};
use crate::store::SecretStore;
use crate::terminal::Terminal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub force: bool,
    pub plain: bool,
}

pub async fn run<S, R, W>(
    command: Command,
    flags: Flags,
    store: &S,
    terminal: &mut Terminal<R, W>,
) -> Result<(), SecretsError>
where
    S: SecretStore,
    R: BufRead,
    W: Write,
{
    match command {
        Command::Init { json } => init(store, terminal, &json, flags.force).await,
        Command::Get => get(store, terminal, flags.plain).await,
        Command::Set { key, value } => set(store, terminal, &key, value).await,
        Command::Update { key } => update(store, terminal, &key).await,
        Command::UpdateAll => update_all(store, terminal).await,
        Command::Delete { key } => delete(store, terminal, &key).await,
        command @ (Command::Help | Command::Unknown(_)) => usage(&command, terminal),
    }
}

/// Prints usage for `help` and for anything unrecognized. Never touches the
/// store.
pub fn usage<R: BufRead, W: Write>(
    command: &Command,
    terminal: &mut Terminal<R, W>,
) -> Result<(), SecretsError> {
    if let Command::Unknown(args) = command {
        tracing::warn!("[secrets] unknown command: {}", args.join(" "));
    }
    terminal.println(USAGE)
}

/// Creates the bundle, or overwrites it with `force`.
///
/// The JSON is validated before the store is contacted.
pub async fn init<S, R, W>(
    store: &S,
    terminal: &mut Terminal<R, W>,
    json: &str,
    force: bool,
) -> Result<(), SecretsError>
where
    S: SecretStore,
    R: BufRead,
    W: Write,
{
    let mut bundle = SecretBundle::from_json(json)?;

    let exists = store.exists().await?;
    if exists && !force {
        return Err(SecretsError::AlreadyExists(store.name().to_string()));
    }

    let generated = bundle.resolve_placeholders()?;
    tracing::debug!("[secrets] generated {} placeholder tokens", generated);

    if exists {
        store.update(&bundle).await?;
    } else {
        store.create(&bundle).await?;
    }
    terminal.println(&format!("✓ {} keys", bundle.len()))
}

pub async fn get<S, R, W>(
    store: &S,
    terminal: &mut Terminal<R, W>,
    plain: bool,
) -> Result<(), SecretsError>
where
    S: SecretStore,
    R: BufRead,
    W: Write,
{
    let bundle = store.fetch().await?;
    for (key, value) in bundle.iter() {
        let shown = if plain { value.clone() } else { mask(value) };
        terminal.println(&format!("{key}: {shown}"))?;
    }
    Ok(())
}

pub async fn set<S, R, W>(
    store: &S,
    terminal: &mut Terminal<R, W>,
    key: &str,
    value: String,
) -> Result<(), SecretsError>
where
    S: SecretStore,
    R: BufRead,
    W: Write,
{
    let mut bundle = store.fetch().await?;
    bundle.set(key, value);
    store.update(&bundle).await?;
    terminal.println(&format!("✓ {key}"))
}

/// Walks the operator through one value and returns the value to keep.
///
/// Placeholders ask for a value directly. Anything else loops on
/// keep / new / show until the operator decides. An empty new value keeps
/// the current one.
pub fn review_value<R: BufRead, W: Write>(
    terminal: &mut Terminal<R, W>,
    key: &str,
    current: &str,
) -> Result<String, SecretsError> {
    terminal.println("")?;
    terminal.println(&format!("{key}: {}", mask(current)))?;

    if is_placeholder(current) {
        return read_value(terminal, PROMPT_ENTER, current);
    }

    loop {
        let answer = terminal.ask(PROMPT_KEEP)?.trim().to_lowercase();
        match answer.as_str() {
            "" | "y" => return Ok(current.to_string()),
            "n" => return read_value(terminal, PROMPT_NEW, current),
            "s" => terminal.println(&format!("Full: {current}"))?,
            _ => {}
        }
    }
}

fn read_value<R: BufRead, W: Write>(
    terminal: &mut Terminal<R, W>,
    prompt: &str,
    current: &str,
) -> Result<String, SecretsError> {
    let value = terminal.ask(prompt)?;
    let value = value.trim();
    if value.is_empty() {
        Ok(current.to_string())
    } else {
        Ok(value.to_string())
    }
}

pub async fn update<S, R, W>(
    store: &S,
    terminal: &mut Terminal<R, W>,
    key: &str,
) -> Result<(), SecretsError>
where
    S: SecretStore,
    R: BufRead,
    W: Write,
{
    let mut bundle = store.fetch().await?;
    let current = bundle
        .get(key)
        .ok_or_else(|| SecretsError::KeyNotFound(key.to_string()))?
        .to_string();

    let value = review_value(terminal, key, &current)?;
    if value != current {
        bundle.set(key, value);
        store.update(&bundle).await?;
        tracing::info!("[secrets] updated {}", key);
    }
    Ok(())
}

/// Reviews every key in bundle order and writes once, only if something
/// changed.
pub async fn update_all<S, R, W>(
    store: &S,
    terminal: &mut Terminal<R, W>,
) -> Result<(), SecretsError>
where
    S: SecretStore,
    R: BufRead,
    W: Write,
{
    let bundle = store.fetch().await?;
    let mut updated = bundle.clone();
    let mut changed = 0;

    for (key, current) in bundle.iter() {
        let value = review_value(terminal, key, current)?;
        if &value != current {
            updated.set(key, value);
            changed += 1;
        }
    }

    if changed > 0 {
        store.update(&updated).await?;
        tracing::info!("[secrets] updated {} of {} keys", changed, bundle.len());
    }
    Ok(())
}

pub async fn delete<S, R, W>(
    store: &S,
    terminal: &mut Terminal<R, W>,
    key: &str,
) -> Result<(), SecretsError>
where
    S: SecretStore,
    R: BufRead,
    W: Write,
{
    let mut bundle = store.fetch().await?;
    if !bundle.remove(key) {
        return Err(SecretsError::KeyNotFound(key.to_string()));
    }
    store.update(&bundle).await?;
    terminal.println("✓ Deleted")
}
