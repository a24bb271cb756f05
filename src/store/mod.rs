// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Persistence layer (cookie files).

pub mod cookies;

pub use cookies::{identity_key, CredentialStore, SessionCookie};
