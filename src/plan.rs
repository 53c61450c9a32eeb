// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired-versus-observed diff.
//!
//! [`Plan::calculate`] compares the endpoints the sources want with the endpoints the
//! provider currently holds, keyed by `(lower-cased name, record type)`, and
//! classifies every difference into [`Changes`]:
//!
//! - wanted but absent: **create**
//! - present with other targets, or another explicit TTL: **update** (old and new)
//! - present but no longer wanted: **delete**, unless the policy is
//!   [`Policy::UpsertOnly`]
//!
//! No ownership registry is consulted: every observed record is considered owned.

use crate::endpoint::{Endpoint, RecordType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// What the plan is allowed to do with observed records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    /// Create, update and delete
    #[default]
    Sync,
    /// Create and update, never delete
    UpsertOnly,
}

impl Policy {
    /// Flag value naming the policy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::UpsertOnly => "upsert-only",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync" => Ok(Self::Sync),
            "upsert-only" => Ok(Self::UpsertOnly),
            other => Err(format!(
                "unknown policy '{other}' (expected one of: sync, upsert-only)"
            )),
        }
    }
}

/// Endpoints classified by the write they need.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    /// Records to create
    pub create: Vec<Endpoint>,
    /// Observed state of records to update
    pub update_old: Vec<Endpoint>,
    /// Desired state of records to update
    pub update_new: Vec<Endpoint>,
    /// Records to delete
    pub delete: Vec<Endpoint>,
}

impl Changes {
    /// Whether there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }
}

type Key = (String, RecordType);

fn key_of(ep: &Endpoint) -> Key {
    (ep.comparable_name(), ep.record_type)
}

/// Whether the observed record has to be rewritten to match the desired one.
fn needs_update(desired: &Endpoint, current: &Endpoint) -> bool {
    if !desired.targets.same(&current.targets) {
        return true;
    }
    matches!(desired.record_ttl, Some(ttl) if current.record_ttl != Some(ttl))
}

/// Diff calculator configured with a [`Policy`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Plan {
    policy: Policy,
}

impl Plan {
    /// Plan applying `policy`.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self { policy }
    }

    /// Policy in effect.
    #[must_use]
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Classify the differences between `desired` and `current`.
    ///
    /// When several desired endpoints share a key, the first one wins.
    #[must_use]
    pub fn calculate(&self, desired: &[Endpoint], current: &[Endpoint]) -> Changes {
        let observed: HashMap<Key, &Endpoint> = current.iter().map(|ep| (key_of(ep), ep)).collect();
        let mut wanted: HashSet<Key> = HashSet::new();
        let mut changes = Changes::default();

        for ep in desired {
            let key = key_of(ep);
            if !wanted.insert(key.clone()) {
                debug!(endpoint = %ep, "Conflicting desired endpoint ignored");
                continue;
            }

            match observed.get(&key) {
                None => changes.create.push(ep.clone()),
                Some(existing) if needs_update(ep, existing) => {
                    changes.update_old.push((*existing).clone());
                    changes.update_new.push(ep.clone());
                }
                Some(_) => {}
            }
        }

        if self.policy == Policy::Sync {
            changes.delete = current
                .iter()
                .filter(|ep| !wanted.contains(&key_of(ep)))
                .cloned()
                .collect();
        }

        changes
    }
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod plan_tests;
