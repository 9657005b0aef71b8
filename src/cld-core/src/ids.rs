// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Identifier allocation for diagram entities.
//!
//! Every [`Model`](crate::Model) owns one registry. Ids are handed out in
//! strictly increasing order starting at 0; ids read from a file are fed
//! back through [`IdRegistry::note_observed`] so that entities created
//! afterwards never collide with imported ones.

use crate::common::{EntityId, Error, ErrorCode, ErrorKind, Result};

/// The largest id a registry issues. `u32::MAX` stays outside the id
/// space so the next free value always fits in a `u32`.
pub const MAX_ID: u32 = u32::MAX - 1;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IdRegistry {
    next: u32,
}

impl IdRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn next_id(&mut self) -> Result<EntityId> {
        let Some(next) = self.next.checked_add(1) else {
            return Err(Error::new(
                ErrorKind::Model,
                ErrorCode::IdsExhausted,
                Some(format!("no id left after {MAX_ID}")),
            ));
        };
        let id = EntityId::new(self.next);
        self.next = next;
        Ok(id)
    }

    /// Whether `id` is one this registry could have issued.
    pub fn in_range(id: EntityId) -> bool {
        id.get() <= MAX_ID
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Record an id that was assigned elsewhere (e.g. read from a file).
    /// Observing `u32::MAX` exhausts the registry rather than wrapping.
    pub fn note_observed(&mut self, id: EntityId) {
        self.advance_to(id.get().saturating_add(1));
    }

    /// Raise the counter to `next_free` if it is currently lower.
    pub fn advance_to(&mut self, next_free: u32) {
        self.next = self.next.max(next_free);
    }

    /// The largest id issued or observed so far, if any.
    pub fn largest(&self) -> Option<EntityId> {
        self.next.checked_sub(1).map(EntityId::new)
    }

    pub fn next_free(&self) -> u32 {
        self.next
    }
}
