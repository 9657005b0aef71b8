// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-off between a model and wherever its document lives.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::common::Result;
use crate::digest::ContentDigest;
use crate::mdl;
use crate::model::Model;

/// A place a document can be read from and written to.
///
/// `read` returns the document exactly as stored, line endings included,
/// so the digest recorded at load matches the stored bytes. `write`
/// receives the complete file and reports nothing back: once the bytes
/// are handed over the model is done with them.
pub trait Persistence {
    fn read(&mut self) -> Result<String>;
    fn write(&mut self, bytes: Vec<u8>);
}

/// Read and import the document behind `store`.
pub fn open(store: &mut dyn Persistence) -> Result<Model> {
    let text = store.read()?;
    mdl::import(&text)
}

/// Export `model` into `store`, returning the digest of what was written.
pub fn save(model: &Model, store: &mut dyn Persistence) -> ContentDigest {
    let export = mdl::export(model);
    let digest = export.digest();
    store.write(export.into_bytes());
    digest
}

/// A document on the local filesystem.
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `bytes` to the file, for callers that need to know whether
    /// the write landed.
    pub fn try_write(&self, bytes: &[u8]) -> Result<()> {
        fs::write(&self.path, bytes)?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "wrote document");
        Ok(())
    }
}

impl Persistence for FileStore {
    fn read(&mut self) -> Result<String> {
        let contents = fs::read_to_string(&self.path)?;
        debug!(path = %self.path.display(), bytes = contents.len(), "read document");
        Ok(contents)
    }

    fn write(&mut self, bytes: Vec<u8>) {
        if let Err(err) = self.try_write(&bytes) {
            warn!(path = %self.path.display(), "failed to write document: {err}");
        }
    }
}
