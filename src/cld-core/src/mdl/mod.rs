// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Vensim `.mdl` import and export for causal loop diagrams.
//!
//! Only the sketch section carries diagram content. Equations are
//! regenerated as `A FUNCTION OF` placeholders on export and ignored on
//! import; the `.Control` group and the sketch `$` line round-trip
//! verbatim.

pub mod codes;
mod reader;
pub mod records;
mod writer;

pub use writer::{export, MdlExport};

use tracing::{debug, warn};

use crate::common::Result;
use crate::datamodel::{ControlParameters, DefaultParameters};
use crate::digest::ContentDigest;
use crate::ids::MAX_ID;
use crate::model::Model;
use reader::{read_sections, Sections};
use records::{malformed, parse_record};

pub(crate) const ENCODING_MARKER: &str = "{UTF-8}";
pub(crate) const FUNCTION_OF_OPEN: &str = " = A FUNCTION OF(";
pub(crate) const FUNCTION_OF_CLOSE: &str = ")";
pub(crate) const CONTROL_PREFIX: &str = "****";
pub(crate) const SKETCH_START: &str = "\\\\\\---///";
pub(crate) const SKETCH_HEADER: &str =
    "\\\\\\---/// Sketch information - do not modify anything except names";
pub(crate) const VERSION_HEADER: &str =
    "V300  Do not put anything below this section - it will be ignored";
pub(crate) const VIEW_HEADER: &str = "*View 1";
pub(crate) const VIEW_TITLE_PREFIX: &str = "*";
pub(crate) const DEFAULT_PARAMS_PREFIX: &str = "$";
pub(crate) const END_OF_SKETCH: &str = "///---\\\\\\";

/// Build a model from the full text of an `.mdl` file.
pub fn import(source: &str) -> Result<Model> {
    let digest = ContentDigest::of(source.as_bytes());
    if source.trim().is_empty() {
        return Ok(empty_document(digest));
    }
    build_model(read_sections(source.lines()), digest)
}

/// Build a model from an `.mdl` file already split into lines (without
/// their terminators).
pub fn import_lines<S: AsRef<str>>(lines: &[S]) -> Result<Model> {
    let digest = ContentDigest::of_lines(lines);
    if lines.iter().all(|l| l.as_ref().trim().is_empty()) {
        return Ok(empty_document(digest));
    }
    build_model(read_sections(lines.iter().map(|l| l.as_ref())), digest)
}

fn empty_document(digest: ContentDigest) -> Model {
    let mut model = Model::new();
    model.set_content_hash_at_load(digest);
    model
}

fn build_model(sections: Sections, digest: ContentDigest) -> Result<Model> {
    let mut model = Model::new();

    model.set_control_params(if sections.saw_control {
        sections.control.iter().copied().collect()
    } else {
        ControlParameters::empty()
    });
    model.set_default_params(
        sections
            .default_params
            .map(DefaultParameters::new)
            .unwrap_or_default(),
    );

    let mut skipped = 0;
    for record in sections.records.iter() {
        match parse_record(record)? {
            Some((id, component)) => model.push_unwired(id, component)?,
            None => skipped += 1,
        }
    }

    model.reconcile()?;

    if let Some(hint) = sections.largest_id_hint {
        if hint > MAX_ID {
            return Err(malformed(
                sections.hint_line,
                format!("id hint -{hint} leaves no id to issue"),
            ));
        }
        let next_free = model.next_free_id();
        if hint >= next_free {
            model.ids_mut().advance_to(hint);
        } else {
            warn!(hint, next_free, "ignoring id hint below an id already in use");
        }
    }

    model.set_content_hash_at_load(digest);

    debug!(
        entities = model.len(),
        skipped,
        next_free = model.next_free_id(),
        "imported model"
    );

    Ok(model)
}
