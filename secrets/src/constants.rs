// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

/// Value that `init` swaps for a freshly generated placeholder token.
pub const PLACEHOLDER_VALUE: &str = "TBD";
pub const PLACEHOLDER_TOKEN_PREFIX: &str = "TBD_";
pub const PLACEHOLDER_RANDOM_BYTES: usize = 10;

pub const MASK_VISIBLE_CHARS: usize = 4;
pub const MASK_EMPTY: &str = "***";

pub const PROMPT_KEEP: &str = "Keep current value? [Y/n] or [s]how: ";
pub const PROMPT_ENTER: &str = "Enter value: ";
pub const PROMPT_NEW: &str = "New value: ";

pub const USAGE: &str =
    "\nCOMMANDS: init JSON [--force] | get [--plain] | set K V | update K | update-all | delete K\n";
