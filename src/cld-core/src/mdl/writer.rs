// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use tracing::debug;

use super::records::{format_causal_link, format_loop, format_variable, sanitize};
use super::{
    ENCODING_MARKER, END_OF_SKETCH, FUNCTION_OF_CLOSE, FUNCTION_OF_OPEN, SKETCH_HEADER,
    VERSION_HEADER, VIEW_HEADER,
};
use crate::common::EntityId;
use crate::datamodel::{Component, Variable};
use crate::digest::ContentDigest;
use crate::model::Model;

/// A serialized document, plus what a host needs to decide whether and
/// where to write it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MdlExport {
    pub lines: Vec<String>,
    /// The digest of the document this model was loaded from.
    pub starting_digest: Option<ContentDigest>,
    /// Every entity written, in file order.
    pub touched: Vec<EntityId>,
}

impl MdlExport {
    /// The file contents: every line terminated by `\n`.
    pub fn text(&self) -> String {
        let len = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut text = String::with_capacity(len);
        for line in self.lines.iter() {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Digest of [`MdlExport::text`]; equal to what a later import of
    /// the written file records as its starting digest.
    pub fn digest(&self) -> ContentDigest {
        ContentDigest::of_lines(&self.lines)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.text().into_bytes()
    }
}

/// A variable name as it appears in equation text. Names starting with
/// `*` are quoted so the line can't be mistaken for a group marker.
fn equation_name(name: &str) -> String {
    let name = sanitize(name);
    if name.starts_with('*') {
        format!("\"{name}\"")
    } else {
        name
    }
}

fn function_of(model: &Model, var: &Variable) -> String {
    let mut sources: Vec<EntityId> = vec![];
    for link_id in var.incoming_links() {
        if let Some(link) = model.causal_link(*link_id) {
            if !sources.contains(&link.source()) {
                sources.push(link.source());
            }
        }
    }

    let names: Vec<String> = sources
        .iter()
        .filter_map(|id| model.variable(*id))
        .map(|source| equation_name(&source.name))
        .collect();

    if names.is_empty() {
        format!("{}{FUNCTION_OF_OPEN} {FUNCTION_OF_CLOSE}", equation_name(&var.name))
    } else {
        format!(
            "{}{FUNCTION_OF_OPEN} {} {FUNCTION_OF_CLOSE}",
            equation_name(&var.name),
            names.join(" , ")
        )
    }
}

/// Serialize `model` to Vensim `.mdl` lines.
pub fn export(model: &Model) -> MdlExport {
    let mut lines: Vec<String> = vec![ENCODING_MARKER.to_owned()];

    for (_, var) in model.variables() {
        lines.push(function_of(model, var));
        lines.push("~".to_owned());
        lines.push("~|".to_owned());
        lines.push(String::new());
    }

    lines.extend(model.control_params().lines().iter().cloned());

    lines.push(SKETCH_HEADER.to_owned());
    lines.push(VERSION_HEADER.to_owned());
    lines.push(VIEW_HEADER.to_owned());
    lines.push(model.default_params().params.clone());

    let mut touched = Vec::with_capacity(model.len());
    for entity in model.entities() {
        let id = entity.id();
        match entity.component() {
            Component::Variable(var) => lines.push(format_variable(id, var)),
            Component::CausalLink(link) => lines.push(format_causal_link(id, link)),
            Component::Loop(l) => lines.extend(format_loop(id, l)),
        }
        touched.push(id);
    }

    lines.push(END_OF_SKETCH.to_owned());
    lines.push(format!("-{}", model.next_free_id()));

    debug!(
        entities = touched.len(),
        lines = lines.len(),
        "exported model"
    );

    MdlExport {
        lines,
        starting_digest: model.content_hash_at_load(),
        touched,
    }
}
