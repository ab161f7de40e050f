// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory user store.
//!
//! Upserts a local user for each authenticated identity, keyed by the
//! provider subject. Profile fields are refreshed from the identity on every
//! call.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{claims::Metadata, ResolvedIdentity};
use crate::models::InternalUser;

const DISPLAY_NAME_KEYS: &[&str] = &["full_name", "name", "displayName"];
const PHONE_NUMBER_KEYS: &[&str] = &["phone", "phone_number", "mobile"];

#[derive(Default)]
pub struct InMemoryStore {
    users: HashMap<String, InternalUser>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or refresh the local user for `identity`.
    pub fn ensure_user(&mut self, identity: &ResolvedIdentity) -> InternalUser {
        let now = Utc::now();
        let email = sanitize_email(identity.email.as_deref());
        let display_name = metadata_string(identity.user_metadata.as_ref(), DISPLAY_NAME_KEYS);
        let phone_number = metadata_string(identity.user_metadata.as_ref(), PHONE_NUMBER_KEYS);

        let user = self
            .users
            .entry(identity.id.clone())
            .and_modify(|user| {
                user.email = email.clone();
                user.display_name = display_name.clone();
                user.phone_number = phone_number.clone();
                user.updated_at = now;
            })
            .or_insert_with(|| {
                tracing::info!(external_id = %identity.id, "Creating local user");
                InternalUser {
                    id: Uuid::new_v4(),
                    external_id: identity.id.clone(),
                    email,
                    display_name,
                    phone_number,
                    created_at: now,
                    updated_at: now,
                }
            });

        user.clone()
    }

    pub fn find_by_external_id(&self, external_id: &str) -> Option<InternalUser> {
        self.users.get(external_id).cloned()
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

fn sanitize_email(candidate: Option<&str>) -> Option<String> {
    let normalized = candidate?.trim().to_lowercase();
    (!normalized.is_empty()).then_some(normalized)
}

/// First non-blank string value among `keys`.
fn metadata_string(metadata: Option<&Metadata>, keys: &[&str]) -> Option<String> {
    let metadata = metadata?;
    keys.iter().find_map(|key| match metadata.get(*key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value.trim().to_string()),
        _ => None,
    })
}
