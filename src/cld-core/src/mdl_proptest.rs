// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Property-based tests for the MDL codec and the graph operations.
//!
//! Models are built by replaying a random sequence of edits, so every
//! generated model is one the public API can actually produce.

use proptest::prelude::*;

use crate::common::EntityId;
use crate::datamodel::{
    CurveGeometry, LinkColor, Loop, Point, Polarity, PolarityPlacement, Rotation, Thickness,
    Variable, VariableShape,
};
use crate::mdl::{self, codes};
use crate::model::Model;

#[derive(Clone, Debug)]
struct LinkStyle {
    polarity: Option<Polarity>,
    thickness: Thickness,
    has_time_delay: bool,
    color: Option<LinkColor>,
    curve: CurveGeometry,
}

#[derive(Clone, Debug)]
enum Edit {
    AddVariable(Variable),
    AddLoop(Loop),
    AddLink(usize, usize, LinkStyle),
    DeleteVariable(usize),
    DeleteLink(usize),
}

/// Mostly plain names, plus some that start with Vensim's `****`
/// group marker.
fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[A-Za-z][A-Za-z0-9 ,]{0,20}",
        1 => "\\*{1,6}[A-Za-z0-9 ,*]{0,16}",
    ]
    .prop_map(|s| s.to_string())
}

fn point_strategy() -> impl Strategy<Value = Point> {
    (-500i32..2000, -500i32..2000).prop_map(|(x, y)| Point::new(x, y))
}

fn variable_strategy() -> impl Strategy<Value = Variable> {
    (name_strategy(), point_strategy(), any::<bool>(), -1i32..9).prop_map(
        |(name, position, boxed, text_position)| {
            let shape = if boxed {
                VariableShape::Boxed
            } else {
                VariableShape::Normal
            };
            Variable::new(name, position)
                .with_shape(shape)
                .with_text_position(text_position)
        },
    )
}

fn loop_strategy() -> impl Strategy<Value = Loop> {
    (
        name_strategy(),
        point_strategy(),
        any::<bool>(),
        (10i32..40, 10i32..40),
    )
        .prop_map(|(name, position, ccw, size)| {
            let rotation = if ccw {
                Rotation::CounterClockwise
            } else {
                Rotation::Clockwise
            };
            let mut l = Loop::new(position).with_name(name).with_rotation(rotation);
            l.size = size;
            l
        })
}

fn color_strategy() -> impl Strategy<Value = Option<LinkColor>> {
    prop_oneof![
        Just(None),
        Just(Some(LinkColor::Black)),
        Just(Some(LinkColor::Blue)),
        Just(Some(LinkColor::Green)),
        Just(Some(LinkColor::Orange)),
        Just(Some(LinkColor::Red)),
        "[0-9]{1,3}-[0-9]{1,3}-[0-9]{1,3}"
            .prop_filter("named colors decode as named", |raw| {
                codes::color_from_field(raw) == Some(LinkColor::Unrecognized(raw.clone()))
            })
            .prop_map(|raw| Some(LinkColor::Unrecognized(raw))),
    ]
}

fn link_style_strategy() -> impl Strategy<Value = LinkStyle> {
    let polarity = prop_oneof![
        Just(None),
        Just(Some(Polarity::Plus)),
        Just(Some(Polarity::Minus)),
    ];
    let thickness = prop_oneof![
        Just(Thickness::Normal),
        Just(Thickness::LightBold),
        Just(Thickness::Bold),
        (14i32..40).prop_map(Thickness::Custom),
    ];
    let placement = prop_oneof![
        Just(PolarityPlacement::HandleInside),
        Just(PolarityPlacement::ArrowheadInside),
        Just(PolarityPlacement::HandleOutside),
        Just(PolarityPlacement::ArrowheadOutside),
    ];
    (
        polarity,
        thickness,
        any::<bool>(),
        color_strategy(),
        point_strategy(),
        placement,
    )
        .prop_map(
            |(polarity, thickness, has_time_delay, color, vertex, polarity_placement)| LinkStyle {
                polarity,
                thickness,
                has_time_delay,
                color,
                curve: CurveGeometry {
                    vertex,
                    polarity_placement,
                },
            },
        )
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => variable_strategy().prop_map(Edit::AddVariable),
        1 => loop_strategy().prop_map(Edit::AddLoop),
        4 => (any::<usize>(), any::<usize>(), link_style_strategy())
            .prop_map(|(s, t, style)| Edit::AddLink(s, t, style)),
        1 => any::<usize>().prop_map(Edit::DeleteVariable),
        1 => any::<usize>().prop_map(Edit::DeleteLink),
    ]
}

fn pick<T: Copy>(items: &[T], i: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[i % items.len()])
    }
}

/// Replay `edits`, checking the cascade count of every variable delete.
fn build(edits: &[Edit]) -> Result<(Model, Vec<EntityId>), TestCaseError> {
    let mut model = Model::new();
    let mut issued = vec![];

    for edit in edits {
        let variables: Vec<EntityId> = model.variables().map(|(id, _)| id).collect();
        let links: Vec<EntityId> = model.causal_links().map(|(id, _)| id).collect();
        match edit {
            Edit::AddVariable(var) => issued.push(model.add_variable(var.clone()).unwrap()),
            Edit::AddLoop(l) => issued.push(model.add_loop(l.clone()).unwrap()),
            Edit::AddLink(s, t, style) => {
                let (Some(source), Some(target)) = (pick(&variables, *s), pick(&variables, *t))
                else {
                    continue;
                };
                let id = model.add_causal_link(source, target).unwrap();
                let link = model.causal_link_mut(id).unwrap();
                link.polarity = style.polarity;
                link.thickness = style.thickness;
                link.has_time_delay = style.has_time_delay;
                link.color = style.color.clone();
                link.curve = style.curve;
                issued.push(id);
            }
            Edit::DeleteVariable(i) => {
                let Some(id) = pick(&variables, *i) else {
                    continue;
                };
                let touching = model
                    .causal_links()
                    .filter(|(_, l)| l.source() == id || l.target() == id)
                    .count();
                prop_assert_eq!(touching, model.delete_variable(id).unwrap());
            }
            Edit::DeleteLink(i) => {
                let Some(id) = pick(&links, *i) else {
                    continue;
                };
                model.delete_causal_link(id).unwrap();
            }
        }
    }

    Ok((model, issued))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn mdl_roundtrip_preserves_model(edits in prop::collection::vec(edit_strategy(), 0..40)) {
        let (model, _) = build(&edits)?;
        let export = mdl::export(&model);
        let imported = mdl::import_lines(&export.lines).unwrap();

        prop_assert_eq!(model.entities(), imported.entities());
        prop_assert_eq!(model.next_free_id(), imported.next_free_id());
        prop_assert_eq!(model.control_params(), imported.control_params());
        prop_assert_eq!(Some(export.digest()), imported.content_hash_at_load());
        imported.verify_adjacency().unwrap();
    }

    #[test]
    fn mdl_reexport_is_byte_identical(edits in prop::collection::vec(edit_strategy(), 0..40)) {
        let (model, _) = build(&edits)?;
        let text = mdl::export(&model).text();
        let imported = mdl::import(&text).unwrap();
        prop_assert_eq!(text, mdl::export(&imported).text());
    }

    #[test]
    fn ids_strictly_increase(edits in prop::collection::vec(edit_strategy(), 0..40)) {
        let (model, issued) = build(&edits)?;
        for pair in issued.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        prop_assert_eq!(issued.last().copied(), model.largest_id());
    }

    #[test]
    fn adjacency_stays_consistent(edits in prop::collection::vec(edit_strategy(), 0..40)) {
        let (model, _) = build(&edits)?;
        model.verify_adjacency().unwrap();
        for (id, link) in model.causal_links() {
            prop_assert!(model.variable(link.source()).unwrap().outgoing_links().contains(&id));
            prop_assert!(model.variable(link.target()).unwrap().incoming_links().contains(&id));
        }
    }
}
