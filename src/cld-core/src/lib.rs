// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;
pub mod datamodel;
pub mod digest;
pub mod ids;
pub mod mdl;
pub mod model;
pub mod persistence;

#[cfg(test)]
mod mdl_proptest;

pub use common::{EntityId, Error, ErrorCode, ErrorKind, Result};
pub use datamodel::{
    CausalLink, Component, ControlParameters, CurveGeometry, DefaultParameters, Entity,
    EntityKind, LinkColor, Loop, Point, Polarity, PolarityPlacement, Rotation, Thickness,
    Variable, VariableShape,
};
pub use digest::ContentDigest;
pub use ids::IdRegistry;
pub use mdl::MdlExport;
pub use model::{cascade_message, Model, Snapshot};
pub use persistence::{FileStore, Persistence};
