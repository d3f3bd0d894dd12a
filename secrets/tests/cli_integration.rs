// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Command flow tests against the in-memory store.
//!
//! Each test drives a command the way the binary does, with scripted
//! operator input and captured output.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use ironman_secrets::commands::{self, Flags};
use ironman_secrets::configuration::Command;
use ironman_secrets::errors::SecretsError;
use ironman_secrets::models::SecretBundle;
use ironman_secrets::store::MemoryStore;
use ironman_secrets::terminal::Terminal;

const NAME: &str = "IronmanCountdown/preview-alice/secrets";

fn store_with(json: &str) -> MemoryStore {
    MemoryStore::with_bundle(NAME, SecretBundle::from_json(json).unwrap())
}

/// Runs `command` with `input` as operator answers and returns stdout.
async fn run(
    store: &MemoryStore,
    command: Command,
    flags: Flags,
    input: &str,
) -> Result<String, SecretsError> {
    let mut terminal = Terminal::new(input.as_bytes(), Vec::new());
    commands::run(command, flags, store, &mut terminal).await?;
    Ok(String::from_utf8(terminal.into_output()).unwrap())
}

fn value(store: &MemoryStore, key: &str) -> Option<String> {
    store.snapshot().unwrap().get(key).map(String::from)
}

// =============================================================================
// init
// =============================================================================

#[tokio::test]
async fn test_init_creates_bundle_with_placeholders() {
    let store = MemoryStore::new(NAME);
    let output = run(
        &store,
        Command::Init {
            json: r#"{"A":"TBD","B":"x"}"#.to_string(),
        },
        Flags::default(),
        "",
    )
    .await
    .unwrap();

    assert_eq!(output, "✓ 2 keys\n");
    assert_eq!(store.writes(), 1);

    let a = value(&store, "A").unwrap();
    assert!(a.starts_with("TBD_"));
    assert_eq!(a.len(), 18);
    assert_eq!(value(&store, "B").as_deref(), Some("x"));
}

#[tokio::test]
async fn test_init_refuses_existing_without_force() {
    let store = store_with(r#"{"A":"old"}"#);
    let result = run(
        &store,
        Command::Init {
            json: r#"{"A":"new"}"#.to_string(),
        },
        Flags::default(),
        "",
    )
    .await;

    assert!(matches!(result, Err(SecretsError::AlreadyExists(_))));
    assert_eq!(store.writes(), 0);
    assert_eq!(value(&store, "A").as_deref(), Some("old"));
}

#[tokio::test]
async fn test_init_force_overwrites() {
    let store = store_with(r#"{"A":"old","B":"gone"}"#);
    let flags = Flags {
        force: true,
        ..Default::default()
    };
    run(
        &store,
        Command::Init {
            json: r#"{"A":"new"}"#.to_string(),
        },
        flags,
        "",
    )
    .await
    .unwrap();

    assert_eq!(store.writes(), 1);
    let bundle = store.snapshot().unwrap();
    assert_eq!(bundle.len(), 1);
    assert_eq!(bundle.get("A"), Some("new"));
}

#[tokio::test]
async fn test_init_rejects_bad_json_before_store_access() {
    let store = MemoryStore::new(NAME);
    let result = run(
        &store,
        Command::Init {
            json: "{not json".to_string(),
        },
        Flags::default(),
        "",
    )
    .await;

    assert!(matches!(result, Err(SecretsError::InvalidJson(_))));
    assert!(store.snapshot().is_none());
    assert_eq!(store.reads(), 0);
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_init_placeholders_differ() {
    let store = MemoryStore::new(NAME);
    run(
        &store,
        Command::Init {
            json: r#"{"A":"TBD","B":"TBD","C":"TBD"}"#.to_string(),
        },
        Flags::default(),
        "",
    )
    .await
    .unwrap();

    let a = value(&store, "A").unwrap();
    let b = value(&store, "B").unwrap();
    let c = value(&store, "C").unwrap();
    assert!(a != b && b != c && a != c);
}

// =============================================================================
// get / set / delete
// =============================================================================

#[tokio::test]
async fn test_get_masks_unless_plain() {
    let store = store_with(r#"{"API_KEY":"secret123","EMPTY":""}"#);

    let masked = run(&store, Command::Get, Flags::default(), "").await.unwrap();
    assert_eq!(masked, "API_KEY: secr*****\nEMPTY: ***\n");

    let flags = Flags {
        plain: true,
        ..Default::default()
    };
    let plain = run(&store, Command::Get, flags, "").await.unwrap();
    assert_eq!(plain, "API_KEY: secret123\nEMPTY: \n");
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_get_without_bundle_fails() {
    let store = MemoryStore::new(NAME);
    let result = run(&store, Command::Get, Flags::default(), "").await;
    assert!(matches!(result, Err(SecretsError::Store(_))));
}

#[tokio::test]
async fn test_set_writes_key() {
    let store = store_with(r#"{"A":"1"}"#);
    let output = run(
        &store,
        Command::Set {
            key: "B".to_string(),
            value: "2".to_string(),
        },
        Flags::default(),
        "",
    )
    .await
    .unwrap();

    assert_eq!(output, "✓ B\n");
    assert_eq!(store.writes(), 1);
    assert_eq!(value(&store, "B").as_deref(), Some("2"));
}

#[tokio::test]
async fn test_delete_removes_key() {
    let store = store_with(r#"{"A":"1","B":"2"}"#);
    let output = run(
        &store,
        Command::Delete {
            key: "A".to_string(),
        },
        Flags::default(),
        "",
    )
    .await
    .unwrap();

    assert_eq!(output, "✓ Deleted\n");
    assert_eq!(value(&store, "A"), None);
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_delete_unknown_key_does_not_write() {
    let store = store_with(r#"{"A":"1"}"#);
    let result = run(
        &store,
        Command::Delete {
            key: "Z".to_string(),
        },
        Flags::default(),
        "",
    )
    .await;

    assert!(matches!(result, Err(SecretsError::KeyNotFound(_))));
    assert_eq!(store.writes(), 0);
}

// =============================================================================
// update / update-all
// =============================================================================

#[tokio::test]
async fn test_update_keep_does_not_write() {
    let store = store_with(r#"{"A":"secret123"}"#);
    run(
        &store,
        Command::Update {
            key: "A".to_string(),
        },
        Flags::default(),
        "y\n",
    )
    .await
    .unwrap();

    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_update_replaces_placeholder() {
    let store = store_with(r#"{"A":"TBD_abcdefghijklmn"}"#);
    let output = run(
        &store,
        Command::Update {
            key: "A".to_string(),
        },
        Flags::default(),
        "sk-live\n",
    )
    .await
    .unwrap();

    assert!(output.contains("A: TBD_**************"));
    assert_eq!(value(&store, "A").as_deref(), Some("sk-live"));
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn test_update_unknown_key_fails() {
    let store = store_with(r#"{"A":"1"}"#);
    let result = run(
        &store,
        Command::Update {
            key: "B".to_string(),
        },
        Flags::default(),
        "",
    )
    .await;

    assert!(matches!(result, Err(SecretsError::KeyNotFound(_))));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_update_all_without_changes_does_not_write() {
    let store = store_with(r#"{"A":"aaaaaa","B":"bbbbbb","C":"cccccc"}"#);
    run(&store, Command::UpdateAll, Flags::default(), "\ny\n\n")
        .await
        .unwrap();

    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn test_update_all_writes_once() {
    let store = store_with(r#"{"A":"aaaaaa","B":"TBD_bbbbbbbbbbbbbb","C":"cccccc"}"#);
    // A: change, B: fill placeholder, C: show then keep
    let input = "n\nnew-a\nnew-b\ns\ny\n";
    let output = run(&store, Command::UpdateAll, Flags::default(), input)
        .await
        .unwrap();

    assert_eq!(store.writes(), 1);
    assert_eq!(value(&store, "A").as_deref(), Some("new-a"));
    assert_eq!(value(&store, "B").as_deref(), Some("new-b"));
    assert_eq!(value(&store, "C").as_deref(), Some("cccccc"));
    assert!(output.contains("Full: cccccc"));
}

// =============================================================================
// usage
// =============================================================================

#[tokio::test]
async fn test_help_and_unknown_print_usage_without_store_access() {
    let store = MemoryStore::new(NAME);

    for command in [Command::Help, Command::Unknown(vec!["rotate".to_string()])] {
        let output = run(&store, command, Flags::default(), "").await.unwrap();
        assert!(output.contains("COMMANDS: init JSON [--force]"));
    }
    assert!(store.snapshot().is_none());
    assert_eq!(store.reads(), 0);
    assert_eq!(store.writes(), 0);
}

// =============================================================================
// store failures
// =============================================================================

const STORE_FAILURE: &str = "describe-secret: AccessDeniedException: not authorized";

fn failing_store() -> MemoryStore {
    store_with(r#"{"A":"secret123"}"#).failing_with(STORE_FAILURE)
}

#[tokio::test]
async fn test_store_failures_surface_unchanged() {
    let commands = [
        Command::Init {
            json: r#"{"A":"TBD"}"#.to_string(),
        },
        Command::Get,
        Command::Set {
            key: "A".to_string(),
            value: "x".to_string(),
        },
        Command::Update {
            key: "A".to_string(),
        },
        Command::UpdateAll,
        Command::Delete {
            key: "A".to_string(),
        },
    ];

    for command in commands {
        let store = failing_store();
        let result = run(&store, command.clone(), Flags::default(), "n\nnew\n").await;
        match result {
            Err(SecretsError::Store(message)) => assert_eq!(message, STORE_FAILURE),
            other => panic!("{command:?}: unexpected result {other:?}"),
        }
        assert_eq!(store.reads(), 1, "{command:?}");
        assert_eq!(store.writes(), 0, "{command:?}");
    }
}

#[tokio::test]
async fn test_init_store_failure_is_not_a_guard_error() {
    let store = failing_store();
    let flags = Flags {
        force: true,
        ..Default::default()
    };
    let result = run(
        &store,
        Command::Init {
            json: r#"{"A":"new"}"#.to_string(),
        },
        flags,
        "",
    )
    .await;

    assert!(!matches!(result, Err(SecretsError::AlreadyExists(_))));
    assert!(matches!(result, Err(SecretsError::Store(_))));
    assert_eq!(store.snapshot().unwrap().get("A"), Some("secret123"));
}
