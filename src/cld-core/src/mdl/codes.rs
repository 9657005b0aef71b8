// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Numeric codes Vensim uses inside sketch component records, and the
//! conversions between them and the typed datamodel fields.

use crate::datamodel::{LinkColor, Polarity, PolarityPlacement, Rotation, Thickness, VariableShape};

/// Record type codes (first field of a sketch line).
pub const TYPE_CAUSAL_LINK: i32 = 1;
pub const TYPE_VARIABLE: i32 = 10;
pub const TYPE_LOOP: i32 = 12;

pub const SHAPE_NORMAL_VAR: i32 = 0;
pub const SHAPE_BOXED_VAR: i32 = 3;
pub const NORMAL_VAR_SIZE: (i32, i32) = (45, 11);
pub const BOXED_VAR_SIZE: (i32, i32) = (40, 20);

pub const ROTATION_CLOCKWISE: i32 = 4;
pub const ROTATION_COUNTER_CLOCKWISE: i32 = 5;

/// Flags field written for variables and loops.
pub const VARIABLE_BITS: i32 = 3;
pub const LOOP_BITS: i32 = 7;
/// When set on a comment record, its text is on the following line.
pub const SCRATCH_NAME_BIT: i32 = 1 << 2;

/// Polarity is stored as the ASCII code of its symbol.
pub const POLARITY_NONE: i32 = 0;
pub const POLARITY_PLUS: i32 = b'+' as i32;
pub const POLARITY_MINUS: i32 = b'-' as i32;
const POLARITY_LETTER_S: i32 = b'S' as i32;
const POLARITY_LETTER_LOWER_S: i32 = b's' as i32;
const POLARITY_LETTER_O: i32 = b'O' as i32;
const POLARITY_DIGIT_ZERO: i32 = b'0' as i32;

pub const THICKNESS_NORMAL: i32 = 0;
pub const THICKNESS_LIGHT_BOLD: i32 = 12;
pub const THICKNESS_BOLD: i32 = 13;

/// The link flags field folds the time-delay mark together with where
/// the polarity symbol is drawn: 65/193/129/1 are the four delayed
/// variants of 64/192/128/0.
pub const TIME_DELAY_FLAG: i32 = 1;
pub const PLACEMENT_HANDLE_INSIDE: i32 = 0;
pub const PLACEMENT_ARROWHEAD_INSIDE: i32 = 64;
pub const PLACEMENT_HANDLE_OUTSIDE: i32 = 128;
pub const PLACEMENT_ARROWHEAD_OUTSIDE: i32 = 192;
const PLACEMENT_MASK: i32 = 192;

/// The has-font field must be 3 for Vensim to honor a link color.
pub const COLOR_ENABLED: i32 = 3;
pub const COLOR_DISABLED: i32 = 0;

/// The has-font value export writes for a link with or without a color.
pub fn has_font_code(color: Option<&LinkColor>) -> i32 {
    if color.is_some() {
        COLOR_ENABLED
    } else {
        COLOR_DISABLED
    }
}
pub const NO_COLOR: &str = "-1--1--1";
pub const LINK_FONT: &str = "|0||-1--1--1";

fn named_rgb(color: &LinkColor) -> Option<&'static str> {
    match color {
        LinkColor::Black => Some("0-0-0"),
        LinkColor::Blue => Some("0-0-255"),
        LinkColor::Green => Some("0-255-0"),
        LinkColor::Orange => Some("255-128-0"),
        LinkColor::Red => Some("255-0-0"),
        LinkColor::Unrecognized(_) => None,
    }
}

fn named_from_rgb(rgb: &str) -> Option<LinkColor> {
    match rgb {
        "0-0-0" => Some(LinkColor::Black),
        "0-0-255" => Some(LinkColor::Blue),
        "0-255-0" => Some(LinkColor::Green),
        "255-128-0" => Some(LinkColor::Orange),
        "255-0-0" => Some(LinkColor::Red),
        _ => None,
    }
}

pub fn variable_shape_code(shape: VariableShape) -> i32 {
    match shape {
        VariableShape::Normal => SHAPE_NORMAL_VAR,
        VariableShape::Boxed => SHAPE_BOXED_VAR,
    }
}

pub fn variable_size(shape: VariableShape) -> (i32, i32) {
    match shape {
        VariableShape::Normal => NORMAL_VAR_SIZE,
        VariableShape::Boxed => BOXED_VAR_SIZE,
    }
}

/// Only the boxed shape is distinguished; every other code draws as a
/// plain variable.
pub fn variable_shape_from_code(code: i32) -> VariableShape {
    if code == SHAPE_BOXED_VAR {
        VariableShape::Boxed
    } else {
        VariableShape::Normal
    }
}

pub fn rotation_code(rotation: Rotation) -> i32 {
    match rotation {
        Rotation::Clockwise => ROTATION_CLOCKWISE,
        Rotation::CounterClockwise => ROTATION_COUNTER_CLOCKWISE,
    }
}

pub fn rotation_from_code(code: i32) -> Option<Rotation> {
    match code {
        ROTATION_CLOCKWISE => Some(Rotation::Clockwise),
        ROTATION_COUNTER_CLOCKWISE => Some(Rotation::CounterClockwise),
        _ => None,
    }
}

pub fn polarity_code(polarity: Option<Polarity>) -> i32 {
    match polarity {
        None => POLARITY_NONE,
        Some(Polarity::Plus) => POLARITY_PLUS,
        Some(Polarity::Minus) => POLARITY_MINUS,
    }
}

/// Decoded polarity plus whether the file used Vensim's letter form
/// (`S`/`O`), which is written back as `+`/`-`.
///
/// Returns `None` for codes that aren't polarities at all.
pub fn polarity_from_code(code: i32) -> Option<(Option<Polarity>, bool)> {
    match code {
        POLARITY_NONE => Some((None, false)),
        POLARITY_PLUS => Some((Some(Polarity::Plus), false)),
        POLARITY_MINUS => Some((Some(Polarity::Minus), false)),
        POLARITY_LETTER_S | POLARITY_LETTER_LOWER_S => Some((Some(Polarity::Plus), true)),
        POLARITY_LETTER_O | POLARITY_DIGIT_ZERO => Some((Some(Polarity::Minus), true)),
        _ => None,
    }
}

pub fn thickness_code(thickness: Thickness) -> i32 {
    match thickness {
        Thickness::Normal => THICKNESS_NORMAL,
        Thickness::LightBold => THICKNESS_LIGHT_BOLD,
        Thickness::Bold => THICKNESS_BOLD,
        Thickness::Custom(code) => code,
    }
}

pub fn thickness_from_code(code: i32) -> Thickness {
    match code {
        THICKNESS_NORMAL => Thickness::Normal,
        THICKNESS_LIGHT_BOLD => Thickness::LightBold,
        THICKNESS_BOLD => Thickness::Bold,
        other => Thickness::Custom(other),
    }
}

pub fn link_flags(has_time_delay: bool, placement: PolarityPlacement) -> i32 {
    let placement = match placement {
        PolarityPlacement::HandleInside => PLACEMENT_HANDLE_INSIDE,
        PolarityPlacement::ArrowheadInside => PLACEMENT_ARROWHEAD_INSIDE,
        PolarityPlacement::HandleOutside => PLACEMENT_HANDLE_OUTSIDE,
        PolarityPlacement::ArrowheadOutside => PLACEMENT_ARROWHEAD_OUTSIDE,
    };
    if has_time_delay {
        placement | TIME_DELAY_FLAG
    } else {
        placement
    }
}

/// Split the link flags field into (has_time_delay, placement, leftover
/// bits this application doesn't model).
pub fn link_flags_from_code(code: i32) -> (bool, PolarityPlacement, i32) {
    let has_time_delay = code & TIME_DELAY_FLAG != 0;
    let placement = match code & PLACEMENT_MASK {
        PLACEMENT_ARROWHEAD_INSIDE => PolarityPlacement::ArrowheadInside,
        PLACEMENT_HANDLE_OUTSIDE => PolarityPlacement::HandleOutside,
        PLACEMENT_ARROWHEAD_OUTSIDE => PolarityPlacement::ArrowheadOutside,
        _ => PolarityPlacement::HandleInside,
    };
    let leftover = code & !(PLACEMENT_MASK | TIME_DELAY_FLAG);
    (has_time_delay, placement, leftover)
}

pub fn color_field(color: Option<&LinkColor>) -> &str {
    match color {
        None => NO_COLOR,
        Some(LinkColor::Unrecognized(raw)) => raw,
        Some(named) => named_rgb(named).unwrap_or(NO_COLOR),
    }
}

pub fn color_from_field(field: &str) -> Option<LinkColor> {
    if field.is_empty() || field == NO_COLOR {
        return None;
    }
    Some(named_from_rgb(field).unwrap_or_else(|| LinkColor::Unrecognized(field.to_owned())))
}
