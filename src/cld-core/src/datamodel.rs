// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::common::EntityId;
use crate::mdl::CONTROL_PREFIX;

pub const DEFAULT_VARIABLE_NAME: &str = "New Variable";
pub const DEFAULT_LOOP_NAME: &str = "TXT";
pub const DEFAULT_TEXT_POSITION: i32 = 0;
pub const DEFAULT_LOOP_SIZE: (i32, i32) = (20, 20);

/// Vensim's font/color/ppi line for a fresh sketch.
pub const DEFAULT_PARAMS: &str =
    "$192-192-192,0,Times New Roman|12||0-0-0|0-0-0|0-0-255|-1--1--1|-1--1--1|72,72,100,0";

/// Lines that open Vensim's `.Control` group. Import finds the control
/// block by its first `****` line, so a block missing one gets these.
pub const CONTROL_GROUP_HEADER: &[&str] = &[
    "********************************************************",
    ".Control",
    "********************************************************~",
    "Simulation Control Parameters",
    "|",
    "",
];

/// The `.Control` group Vensim writes for a new model.
pub const DEFAULT_CONTROL_PARAMS: &[&str] = &[
    "********************************************************",
    ".Control",
    "********************************************************~",
    "Simulation Control Parameters",
    "|",
    "",
    "FINAL TIME  = 100",
    "~\tMonth",
    "~\tThe final time for the simulation.",
    "|",
    "",
    "INITIAL TIME  = 0",
    "~\tMonth",
    "~\tThe initial time for the simulation.",
    "|",
    "",
    "SAVEPER  =",
    "TIME STEP",
    "~\tMonth [0,?]",
    "~\tThe frequency with which output is stored.",
    "|",
    "",
    "TIME STEP  = 1",
    "~\tMonth [0,?]",
    "~\tThe time step for the simulation.",
    "|",
    "",
];

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({};{})", self.x, self.y)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Variable,
    CausalLink,
    Loop,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Variable => "variable",
            EntityKind::CausalLink => "causal link",
            EntityKind::Loop => "loop",
        };
        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableShape {
    #[default]
    Normal,
    Boxed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Variable {
    pub name: String,
    pub position: Point,
    pub shape: VariableShape,
    pub text_position: i32,
    incoming_links: Vec<EntityId>,
    outgoing_links: Vec<EntityId>,
}

impl Variable {
    pub fn new(name: impl Into<String>, position: Point) -> Self {
        Variable {
            name: name.into(),
            position,
            shape: VariableShape::Normal,
            text_position: DEFAULT_TEXT_POSITION,
            incoming_links: vec![],
            outgoing_links: vec![],
        }
    }

    pub fn with_shape(mut self, shape: VariableShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_text_position(mut self, text_position: i32) -> Self {
        self.text_position = text_position;
        self
    }

    /// Causal links that point at this variable, oldest first.
    pub fn incoming_links(&self) -> &[EntityId] {
        &self.incoming_links
    }

    /// Causal links that start at this variable, oldest first.
    pub fn outgoing_links(&self) -> &[EntityId] {
        &self.outgoing_links
    }

    pub(crate) fn add_incoming_link(&mut self, link: EntityId) {
        self.incoming_links.push(link);
    }

    pub(crate) fn add_outgoing_link(&mut self, link: EntityId) {
        self.outgoing_links.push(link);
    }

    pub(crate) fn remove_incoming_link(&mut self, link: EntityId) {
        self.incoming_links.retain(|id| *id != link);
    }

    pub(crate) fn remove_outgoing_link(&mut self, link: EntityId) {
        self.outgoing_links.retain(|id| *id != link);
    }

    pub(crate) fn clear_links(&mut self) {
        self.incoming_links.clear();
        self.outgoing_links.clear();
    }
}

impl Default for Variable {
    fn default() -> Self {
        Variable::new(DEFAULT_VARIABLE_NAME, Point::default())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Plus,
    Minus,
}

impl Display for Polarity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarity::Plus => write!(f, "+"),
            Polarity::Minus => write!(f, "-"),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Thickness {
    #[default]
    Normal,
    LightBold,
    Bold,
    /// A thickness code this application has no name for, kept as read.
    Custom(i32),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkColor {
    Black,
    Blue,
    Green,
    Orange,
    Red,
    /// An encoded color that matched none of the named ones. The raw
    /// field text is written back unchanged on export.
    Unrecognized(String),
}

impl Display for LinkColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkColor::Black => write!(f, "Black"),
            LinkColor::Blue => write!(f, "Blue"),
            LinkColor::Green => write!(f, "Green"),
            LinkColor::Orange => write!(f, "Orange"),
            LinkColor::Red => write!(f, "Red"),
            LinkColor::Unrecognized(raw) => write!(f, "{raw}"),
        }
    }
}

/// Where the polarity symbol sits along a curved link.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolarityPlacement {
    #[default]
    HandleInside,
    ArrowheadInside,
    HandleOutside,
    ArrowheadOutside,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CurveGeometry {
    /// The control point the arc passes through.
    pub vertex: Point,
    pub polarity_placement: PolarityPlacement,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CausalLink {
    source: EntityId,
    target: EntityId,
    pub polarity: Option<Polarity>,
    pub thickness: Thickness,
    pub has_time_delay: bool,
    pub color: Option<LinkColor>,
    pub curve: CurveGeometry,
    /// A has-font value read from a file that doesn't match `color`
    /// (e.g. a color Vensim was told to ignore). Written back as read.
    #[serde(skip)]
    has_font_override: Option<i32>,
}

impl CausalLink {
    pub fn new(source: EntityId, target: EntityId) -> Self {
        CausalLink {
            source,
            target,
            polarity: Some(Polarity::Plus),
            thickness: Thickness::Normal,
            has_time_delay: false,
            color: None,
            curve: CurveGeometry::default(),
            has_font_override: None,
        }
    }

    pub fn source(&self) -> EntityId {
        self.source
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn is_self_link(&self) -> bool {
        self.source == self.target
    }

    pub fn has_font_override(&self) -> Option<i32> {
        self.has_font_override
    }

    pub(crate) fn set_has_font_override(&mut self, has_font: Option<i32>) {
        self.has_font_override = has_font;
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Clockwise,
    CounterClockwise,
}

/// A feedback loop marker: a named rotation symbol placed on the canvas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Loop {
    pub name: String,
    pub rotation: Rotation,
    pub text_position: i32,
    pub position: Point,
    pub size: (i32, i32),
}

impl Loop {
    pub fn new(position: Point) -> Self {
        Loop {
            name: DEFAULT_LOOP_NAME.to_owned(),
            rotation: Rotation::Clockwise,
            text_position: DEFAULT_TEXT_POSITION,
            position,
            size: DEFAULT_LOOP_SIZE,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Component {
    Variable(Variable),
    CausalLink(CausalLink),
    Loop(Loop),
}

impl Component {
    pub fn kind(&self) -> EntityKind {
        match self {
            Component::Variable(_) => EntityKind::Variable,
            Component::CausalLink(_) => EntityKind::CausalLink,
            Component::Loop(_) => EntityKind::Loop,
        }
    }
}

impl From<Variable> for Component {
    fn from(var: Variable) -> Self {
        Component::Variable(var)
    }
}

impl From<CausalLink> for Component {
    fn from(link: CausalLink) -> Self {
        Component::CausalLink(link)
    }
}

impl From<Loop> for Component {
    fn from(l: Loop) -> Self {
        Component::Loop(l)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Entity {
    id: EntityId,
    #[serde(flatten)]
    component: Component,
}

impl Entity {
    pub(crate) fn new(id: EntityId, component: Component) -> Self {
        Entity { id, component }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.component.kind()
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub(crate) fn component_mut(&mut self) -> &mut Component {
        &mut self.component
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match &self.component {
            Component::Variable(var) => Some(var),
            _ => None,
        }
    }

    pub fn as_causal_link(&self) -> Option<&CausalLink> {
        match &self.component {
            Component::CausalLink(link) => Some(link),
            _ => None,
        }
    }

    pub fn as_loop(&self) -> Option<&Loop> {
        match &self.component {
            Component::Loop(l) => Some(l),
            _ => None,
        }
    }
}

/// Simulation control lines, kept verbatim and in file order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ControlParameters {
    params: Vec<String>,
}

impl ControlParameters {
    pub fn empty() -> Self {
        ControlParameters { params: vec![] }
    }

    /// Append a line. The first line of a block must be a `****` group
    /// marker; if it isn't, the `.Control` group header goes in first.
    pub fn add_parameter(&mut self, line: impl Into<String>) {
        let line = line.into();
        if self.params.is_empty() && !line.starts_with(CONTROL_PREFIX) {
            self.params.extend(CONTROL_GROUP_HEADER.iter().map(|s| s.to_string()));
        }
        self.params.push(line);
    }

    pub fn lines(&self) -> &[String] {
        &self.params
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl Default for ControlParameters {
    fn default() -> Self {
        ControlParameters {
            params: DEFAULT_CONTROL_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for ControlParameters {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut control = ControlParameters::empty();
        for line in iter {
            control.add_parameter(line);
        }
        control
    }
}

/// The sketch's `$` line (font, size, colors, ppi), kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DefaultParameters {
    pub params: String,
}

impl DefaultParameters {
    pub fn new(params: impl Into<String>) -> Self {
        DefaultParameters {
            params: params.into(),
        }
    }
}

impl Default for DefaultParameters {
    fn default() -> Self {
        DefaultParameters::new(DEFAULT_PARAMS)
    }
}
