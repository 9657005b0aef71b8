// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The diagram graph: entity storage, link adjacency and the parameter
//! blocks that travel with a document.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::common::{EntityId, Error, ErrorCode, ErrorKind, Result};
use crate::datamodel::{
    CausalLink, Component, ControlParameters, DefaultParameters, Entity, EntityKind, Loop,
    Variable,
};
use crate::digest::ContentDigest;
use crate::ids::IdRegistry;
use crate::mdl;

/// User-facing summary of a cascading delete.
pub fn cascade_message(deleted: usize) -> String {
    format!("Number deleted: {deleted}")
}

/// Read-only view handed to renderers.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub entities: &'a [Entity],
    pub largest_id: Option<EntityId>,
    pub content_hash_at_load: Option<ContentDigest>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Model {
    /// creation (or file) order; export walks this list
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    default_params: DefaultParameters,
    control_params: ControlParameters,
    ids: IdRegistry,
    content_hash_at_load: Option<ContentDigest>,
}

impl Default for Model {
    fn default() -> Self {
        Model::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Model {
            entities: vec![],
            index: HashMap::new(),
            default_params: DefaultParameters::default(),
            control_params: ControlParameters::default(),
            ids: IdRegistry::new(),
            content_hash_at_load: None,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&i| &self.entities[i])
    }

    pub fn variable(&self, id: EntityId) -> Option<&Variable> {
        self.get(id).and_then(Entity::as_variable)
    }

    pub fn causal_link(&self, id: EntityId) -> Option<&CausalLink> {
        self.get(id).and_then(Entity::as_causal_link)
    }

    pub fn feedback_loop(&self, id: EntityId) -> Option<&Loop> {
        self.get(id).and_then(Entity::as_loop)
    }

    pub fn variables(&self) -> impl Iterator<Item = (EntityId, &Variable)> {
        self.entities
            .iter()
            .filter_map(|e| e.as_variable().map(|v| (e.id(), v)))
    }

    pub fn causal_links(&self) -> impl Iterator<Item = (EntityId, &CausalLink)> {
        self.entities
            .iter()
            .filter_map(|e| e.as_causal_link().map(|l| (e.id(), l)))
    }

    pub fn loops(&self) -> impl Iterator<Item = (EntityId, &Loop)> {
        self.entities
            .iter()
            .filter_map(|e| e.as_loop().map(|l| (e.id(), l)))
    }

    /// First variable with exactly this name, in creation order.
    pub fn find_variable(&self, name: &str) -> Option<EntityId> {
        self.variables()
            .find(|(_, var)| var.name == name)
            .map(|(id, _)| id)
    }

    pub fn variable_mut(&mut self, id: EntityId) -> Result<&mut Variable> {
        match self.component_mut(id) {
            Some(Component::Variable(var)) => Ok(var),
            _ => Err(Error::not_found(id, "variable")),
        }
    }

    /// Style attributes of a link are editable; its endpoints are not.
    pub fn causal_link_mut(&mut self, id: EntityId) -> Result<&mut CausalLink> {
        match self.component_mut(id) {
            Some(Component::CausalLink(link)) => Ok(link),
            _ => Err(Error::not_found(id, "causal link")),
        }
    }

    pub fn feedback_loop_mut(&mut self, id: EntityId) -> Result<&mut Loop> {
        match self.component_mut(id) {
            Some(Component::Loop(l)) => Ok(l),
            _ => Err(Error::not_found(id, "loop")),
        }
    }

    fn component_mut(&mut self, id: EntityId) -> Option<&mut Component> {
        let i = *self.index.get(&id)?;
        Some(self.entities[i].component_mut())
    }

    /// Append a new entity under a freshly issued id. Causal links are
    /// wired into both endpoints, which must already be variables.
    pub fn add_entity(&mut self, component: impl Into<Component>) -> Result<EntityId> {
        let component = component.into();
        if let Component::CausalLink(link) = &component {
            self.check_endpoints(link, ErrorKind::Model)?;
        }
        let id = self.ids.next_id()?;
        self.push_entity(id, component);
        Ok(id)
    }

    /// Append an entity whose id was assigned elsewhere.
    pub fn add_entity_with_id(
        &mut self,
        id: EntityId,
        component: impl Into<Component>,
    ) -> Result<()> {
        let component = component.into();
        if !IdRegistry::in_range(id) {
            return Err(Error::new(
                ErrorKind::Model,
                ErrorCode::MalformedRecord,
                Some(format!("id {id} is out of range")),
            ));
        }
        if self.index.contains_key(&id) {
            return Err(Error::new(
                ErrorKind::Model,
                ErrorCode::MalformedRecord,
                Some(format!("duplicate id {id}")),
            ));
        }
        if let Component::CausalLink(link) = &component {
            self.check_endpoints(link, ErrorKind::Model)?;
        }
        self.push_entity(id, component);
        Ok(())
    }

    pub fn add_variable(&mut self, var: Variable) -> Result<EntityId> {
        self.add_entity(var)
    }

    pub fn add_loop(&mut self, l: Loop) -> Result<EntityId> {
        self.add_entity(l)
    }

    pub fn add_causal_link(&mut self, source: EntityId, target: EntityId) -> Result<EntityId> {
        self.add_entity(CausalLink::new(source, target))
    }

    fn push_entity(&mut self, id: EntityId, component: Component) {
        let wiring = match &component {
            Component::CausalLink(link) => Some((link.source(), link.target())),
            _ => None,
        };
        self.index.insert(id, self.entities.len());
        self.entities.push(Entity::new(id, component));
        self.ids.note_observed(id);
        if let Some((source, target)) = wiring {
            self.wire(id, source, target);
        }
    }

    /// Append without touching adjacency; [`Model::reconcile`] wires
    /// everything once all records are in.
    pub(crate) fn push_unwired(&mut self, id: EntityId, component: Component) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(Error::new(
                ErrorKind::Import,
                ErrorCode::MalformedRecord,
                Some(format!("duplicate id {id}")),
            ));
        }
        self.index.insert(id, self.entities.len());
        self.entities.push(Entity::new(id, component));
        self.ids.note_observed(id);
        Ok(())
    }

    /// Rebuild every variable's incoming/outgoing lists from the links.
    pub(crate) fn reconcile(&mut self) -> Result<()> {
        for entity in self.entities.iter_mut() {
            if let Component::Variable(var) = entity.component_mut() {
                var.clear_links();
            }
        }

        let links: Vec<(EntityId, CausalLink)> = self
            .causal_links()
            .map(|(id, link)| (id, link.clone()))
            .collect();
        for (id, link) in links {
            self.check_endpoints(&link, ErrorKind::Import)
                .map_err(|err| Error {
                    details: err.details.map(|d| format!("causal link {id}: {d}")),
                    ..err
                })?;
            self.wire(id, link.source(), link.target());
        }

        Ok(())
    }

    fn check_endpoints(&self, link: &CausalLink, kind: ErrorKind) -> Result<()> {
        for (role, id) in [("source", link.source()), ("target", link.target())] {
            if self.variable(id).is_none() {
                return Err(Error::new(
                    kind,
                    ErrorCode::DanglingReference,
                    Some(format!("{role} {id} is not a variable")),
                ));
            }
        }
        Ok(())
    }

    fn wire(&mut self, link: EntityId, source: EntityId, target: EntityId) {
        if let Ok(var) = self.variable_mut(target) {
            var.add_incoming_link(link);
        }
        if let Ok(var) = self.variable_mut(source) {
            var.add_outgoing_link(link);
        }
    }

    fn unwire(&mut self, link: EntityId, source: EntityId, target: EntityId) {
        if let Ok(var) = self.variable_mut(target) {
            var.remove_incoming_link(link);
        }
        if let Ok(var) = self.variable_mut(source) {
            var.remove_outgoing_link(link);
        }
    }

    fn remove_ids(&mut self, ids: &[EntityId]) {
        self.entities.retain(|e| !ids.contains(&e.id()));
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id(), i))
            .collect();
    }

    /// Delete a variable and every causal link that starts or ends at it.
    /// Returns how many links went with it.
    pub fn delete_variable(&mut self, id: EntityId) -> Result<usize> {
        if self.variable(id).is_none() {
            return Err(Error::not_found(id, "variable"));
        }

        let doomed: Vec<(EntityId, EntityId, EntityId)> = self
            .causal_links()
            .filter(|(_, link)| link.source() == id || link.target() == id)
            .map(|(link_id, link)| (link_id, link.source(), link.target()))
            .collect();
        for &(link_id, source, target) in doomed.iter() {
            self.unwire(link_id, source, target);
        }

        let mut removed: Vec<EntityId> = doomed.iter().map(|(link_id, _, _)| *link_id).collect();
        removed.push(id);
        self.remove_ids(&removed);

        debug!(variable = %id, cascaded = doomed.len(), "deleted variable");
        Ok(doomed.len())
    }

    pub fn delete_causal_link(&mut self, id: EntityId) -> Result<()> {
        let (source, target) = match self.causal_link(id) {
            Some(link) => (link.source(), link.target()),
            None => return Err(Error::not_found(id, "causal link")),
        };
        self.unwire(id, source, target);
        self.remove_ids(&[id]);
        Ok(())
    }

    pub fn delete_loop(&mut self, id: EntityId) -> Result<()> {
        if self.feedback_loop(id).is_none() {
            return Err(Error::not_found(id, "loop"));
        }
        self.remove_ids(&[id]);
        Ok(())
    }

    /// Delete whatever entity has this id. Returns the number of links
    /// removed along with it (only variables cascade).
    pub fn delete_entity(&mut self, id: EntityId) -> Result<usize> {
        let kind = match self.get(id) {
            Some(entity) => entity.kind(),
            None => return Err(Error::not_found(id, "entity")),
        };
        match kind {
            EntityKind::Variable => self.delete_variable(id),
            EntityKind::CausalLink => self.delete_causal_link(id).map(|_| 0),
            EntityKind::Loop => self.delete_loop(id).map(|_| 0),
        }
    }

    /// Reset to a brand-new document.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.index.clear();
        self.default_params = DefaultParameters::default();
        self.control_params = ControlParameters::default();
        self.ids.reset();
        self.content_hash_at_load = None;
    }

    pub fn largest_id(&self) -> Option<EntityId> {
        self.ids.largest()
    }

    pub fn next_free_id(&self) -> u32 {
        self.ids.next_free()
    }

    pub(crate) fn ids_mut(&mut self) -> &mut IdRegistry {
        &mut self.ids
    }

    pub fn default_params(&self) -> &DefaultParameters {
        &self.default_params
    }

    pub fn set_default_params(&mut self, params: DefaultParameters) {
        self.default_params = params;
    }

    pub fn control_params(&self) -> &ControlParameters {
        &self.control_params
    }

    pub fn set_control_params(&mut self, params: ControlParameters) {
        self.control_params = params;
    }

    pub fn content_hash_at_load(&self) -> Option<ContentDigest> {
        self.content_hash_at_load
    }

    pub(crate) fn set_content_hash_at_load(&mut self, digest: ContentDigest) {
        self.content_hash_at_load = Some(digest);
    }

    /// Whether a remote copy with digest `remote` differs from what was
    /// loaded. A document that was never loaded differs from everything.
    pub fn differs_from(&self, remote: &ContentDigest) -> bool {
        self.content_hash_at_load.as_ref() != Some(remote)
    }

    pub fn snapshot_for_render(&self) -> Snapshot<'_> {
        Snapshot {
            entities: &self.entities,
            largest_id: self.largest_id(),
            content_hash_at_load: self.content_hash_at_load,
        }
    }

    /// Replace this document with `source`. On error `self` is untouched.
    pub fn load_mdl(&mut self, source: &str) -> Result<()> {
        let imported = mdl::import(source)?;
        *self = imported;
        Ok(())
    }

    /// Like [`Model::load_mdl`], for input that arrives as lines.
    pub fn load_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<()> {
        let imported = mdl::import_lines(lines)?;
        *self = imported;
        Ok(())
    }

    /// Check that the incoming/outgoing lists agree with the links: each
    /// link is listed once by its source and once by its target, and no
    /// list names anything else.
    pub fn verify_adjacency(&self) -> Result<()> {
        let inconsistent = |msg: String| {
            Err(Error::new(
                ErrorKind::Model,
                ErrorCode::DanglingReference,
                Some(msg),
            ))
        };

        for (id, link) in self.causal_links() {
            let (Some(source), Some(target)) =
                (self.variable(link.source()), self.variable(link.target()))
            else {
                return inconsistent(format!("causal link {id} has a missing endpoint"));
            };
            if source.outgoing_links().iter().filter(|l| **l == id).count() != 1 {
                return inconsistent(format!("causal link {id} not listed once by its source"));
            }
            if target.incoming_links().iter().filter(|l| **l == id).count() != 1 {
                return inconsistent(format!("causal link {id} not listed once by its target"));
            }
        }

        for (var_id, var) in self.variables() {
            for link_id in var.incoming_links() {
                match self.causal_link(*link_id) {
                    Some(link) if link.target() == var_id => {}
                    _ => {
                        return inconsistent(format!(
                            "variable {var_id} lists {link_id} as incoming"
                        ));
                    }
                }
            }
            for link_id in var.outgoing_links() {
                match self.causal_link(*link_id) {
                    Some(link) if link.source() == var_id => {}
                    _ => {
                        return inconsistent(format!(
                            "variable {var_id} lists {link_id} as outgoing"
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
