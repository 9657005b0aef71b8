// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Sketch component records: one line per variable, causal link or loop.
//!
//! Layouts (fields after `type,id,`):
//!
//! - variable (10): `name,x,y,width,height,shape,bits,hidden,hasfont,textpos,...`
//! - causal link (1): `from,to,shape,hidden,polarity,thickness,hasfont,flags,reserved,color,font,npoints|(x,y)|`
//! - loop (12): `text,x,y,width,height,shape,bits,hidden,hasfont,textpos,...`;
//!   when `bits` has the scratch-name bit the text lives on the next line.
//!
//! Unlike Vensim's own reader, numeric fields are parsed strictly: a field
//! that isn't an integer makes the whole record malformed.

use tracing::{trace, warn};

use super::codes::{self, TYPE_CAUSAL_LINK, TYPE_LOOP, TYPE_VARIABLE};
use crate::common::{EntityId, Error, ErrorCode, ErrorKind, Result};
use crate::datamodel::{CausalLink, Component, CurveGeometry, Loop, Point, Variable};
use crate::ids::IdRegistry;

/// A component line collected by the section reader, with the text line
/// that followed it when the record asked for one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord<'a> {
    pub line: usize,
    pub text: &'a str,
    pub scratch_text: Option<&'a str>,
}

pub(crate) fn malformed(line: usize, message: String) -> Error {
    Error::new(
        ErrorKind::Import,
        ErrorCode::MalformedRecord,
        Some(format!("line {line}: {message}")),
    )
}

/// Walks the comma-separated fields of one record.
struct Fields<'a> {
    rest: Option<&'a str>,
    line: usize,
}

impl<'a> Fields<'a> {
    fn new(text: &'a str, line: usize) -> Self {
        Fields {
            rest: Some(text),
            line,
        }
    }

    fn raw(&mut self, what: &str) -> Result<&'a str> {
        let s = self
            .rest
            .ok_or_else(|| malformed(self.line, format!("missing field `{what}`")))?;
        match s.find(',') {
            Some(end) => {
                self.rest = Some(&s[end + 1..]);
                Ok(&s[..end])
            }
            None => {
                self.rest = None;
                Ok(s)
            }
        }
    }

    fn int(&mut self, what: &str) -> Result<i32> {
        let field = self.raw(what)?;
        field.trim().parse::<i32>().map_err(|_| {
            malformed(
                self.line,
                format!("expected integer for `{what}`, got {field:?}"),
            )
        })
    }

    fn id(&mut self, what: &str) -> Result<EntityId> {
        let field = self.raw(what)?;
        field.trim().parse::<u32>().map(EntityId::new).map_err(|_| {
            malformed(self.line, format!("expected id for `{what}`, got {field:?}"))
        })
    }

    /// A name field: either bare up to the next comma, or double-quoted
    /// (which may contain commas and `\"` escapes).
    fn string(&mut self, what: &str) -> Result<String> {
        let s = self
            .rest
            .ok_or_else(|| malformed(self.line, format!("missing field `{what}`")))?;
        let Some(quoted) = s.strip_prefix('"') else {
            return self.raw(what).map(str::to_owned);
        };

        let mut result = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    let after = &quoted[i + 1..];
                    self.rest = match after.strip_prefix(',') {
                        Some(rest) => Some(rest),
                        None if after.is_empty() => None,
                        None => {
                            return Err(malformed(
                                self.line,
                                format!("unexpected text after quoted `{what}`"),
                            ));
                        }
                    };
                    return Ok(result);
                }
                '\\' if quoted[i + 1..].starts_with('"') => {
                    chars.next();
                    result.push('"');
                }
                _ => result.push(c),
            }
        }

        Err(malformed(self.line, format!("unterminated quoted `{what}`")))
    }

    /// Everything left on the line, commas included.
    fn remainder(&mut self, what: &str) -> Result<&'a str> {
        self.rest
            .take()
            .ok_or_else(|| malformed(self.line, format!("missing field `{what}`")))
    }
}

/// Parse the first control point out of a `npoints|(x,y)|...` field.
/// A field without any point leaves the vertex at the origin.
fn parse_vertex(field: &str, line: usize) -> Result<Point> {
    let Some(start) = field.find("|(") else {
        return Ok(Point::default());
    };
    let after_paren = &field[start + 2..];
    let bad = || malformed(line, format!("bad control point {field:?}"));
    let (x, rest) = after_paren.split_once(',').ok_or_else(bad)?;
    let (y, _) = rest.split_once(')').ok_or_else(bad)?;
    let x = x.trim().parse::<i32>().map_err(|_| bad())?;
    let y = y.trim().parse::<i32>().map_err(|_| bad())?;
    Ok(Point::new(x, y))
}

fn parse_variable(fields: &mut Fields) -> Result<Variable> {
    let name = fields.string("name")?;
    let x = fields.int("x")?;
    let y = fields.int("y")?;
    let _width = fields.int("width")?;
    let _height = fields.int("height")?;
    let shape = fields.int("shape")?;
    let _bits = fields.int("bits")?;
    let _hidden = fields.int("hidden")?;
    let _has_font = fields.int("hasfont")?;
    let text_position = fields.int("textpos")?;

    Ok(Variable::new(name, Point::new(x, y))
        .with_shape(codes::variable_shape_from_code(shape))
        .with_text_position(text_position))
}

fn parse_causal_link(fields: &mut Fields, id: EntityId) -> Result<CausalLink> {
    let line = fields.line;
    let source = fields.id("from")?;
    let target = fields.id("to")?;
    let _shape = fields.int("shape")?;
    let _hidden = fields.int("hidden")?;
    let polarity_code = fields.int("polarity")?;
    let thickness = fields.int("thickness")?;
    let has_font = fields.int("hasfont")?;
    let flags = fields.int("flags")?;
    let _reserved = fields.int("reserved")?;
    let color = fields.raw("color")?;
    let _font = fields.raw("font")?;
    let points = fields.remainder("points")?;

    let (polarity, letter_polarity) = codes::polarity_from_code(polarity_code)
        .ok_or_else(|| malformed(line, format!("unknown polarity code {polarity_code}")))?;
    if letter_polarity {
        warn!(link = %id, code = polarity_code, "letter polarity will be written back as a symbol");
    }

    let (has_time_delay, polarity_placement, leftover) = codes::link_flags_from_code(flags);
    if leftover != 0 {
        warn!(link = %id, flags, "dropping unsupported link flag bits");
    }

    let color = codes::color_from_field(color);
    if let Some(crate::datamodel::LinkColor::Unrecognized(raw)) = &color {
        warn!(link = %id, color = %raw, "unknown encoded color kept as-is");
    }

    let mut link = CausalLink::new(source, target);
    link.polarity = polarity;
    link.thickness = codes::thickness_from_code(thickness);
    link.has_time_delay = has_time_delay;
    if has_font != codes::has_font_code(color.as_ref()) {
        link.set_has_font_override(Some(has_font));
    }
    link.color = color;
    link.curve = CurveGeometry {
        vertex: parse_vertex(points, line)?,
        polarity_placement,
    };
    Ok(link)
}

/// `None` for comment records that aren't loop symbols.
fn parse_loop(
    fields: &mut Fields,
    id: EntityId,
    scratch_text: Option<&str>,
) -> Result<Option<Loop>> {
    let line = fields.line;
    let text = fields.string("text")?;
    let x = fields.int("x")?;
    let y = fields.int("y")?;
    let width = fields.int("width")?;
    let height = fields.int("height")?;
    let shape = fields.int("shape")?;
    let bits = fields.int("bits")?;
    let _hidden = fields.int("hidden")?;
    let _has_font = fields.int("hasfont")?;
    let text_position = fields.int("textpos")?;

    let Some(rotation) = codes::rotation_from_code(shape) else {
        warn!(id = %id, shape, "skipping comment that is not a loop symbol");
        return Ok(None);
    };

    let name = if bits & codes::SCRATCH_NAME_BIT != 0 {
        scratch_text
            .ok_or_else(|| malformed(line, "loop text line is missing".to_owned()))?
            .to_owned()
    } else {
        text
    };

    let mut l = Loop::new(Point::new(x, y)).with_name(name).with_rotation(rotation);
    l.text_position = text_position;
    l.size = (width, height);
    Ok(Some(l))
}

/// Parse one component record. `Ok(None)` means the record is a kind this
/// model doesn't hold (valves, clouds, plain comments, ...) and was skipped.
pub fn parse_record(record: &RawRecord) -> Result<Option<(EntityId, Component)>> {
    let mut fields = Fields::new(record.text, record.line);
    let element_type = fields.int("type")?;
    let id = fields.id("id")?;
    if !IdRegistry::in_range(id) {
        return Err(malformed(record.line, format!("id {id} is out of range")));
    }
    trace!(line = record.line, element_type, id = %id, "component record");

    let component = match element_type {
        TYPE_VARIABLE => Some(Component::Variable(parse_variable(&mut fields)?)),
        TYPE_CAUSAL_LINK => Some(Component::CausalLink(parse_causal_link(&mut fields, id)?)),
        TYPE_LOOP => parse_loop(&mut fields, id, record.scratch_text)?.map(Component::Loop),
        _ => {
            warn!(line = record.line, element_type, "skipping unsupported sketch element");
            None
        }
    };

    Ok(component.map(|c| (id, c)))
}

/// Whether a sketch line is a comment record whose text is carried on the
/// line that follows it. Lines that don't parse far enough say no; the
/// record itself reports the problem later.
pub fn wants_scratch_line(text: &str) -> bool {
    let mut fields = Fields::new(text, 0);
    let mut scan = || -> Result<bool> {
        if fields.int("type")? != TYPE_LOOP {
            return Ok(false);
        }
        fields.id("id")?;
        fields.string("text")?;
        for what in ["x", "y", "width", "height", "shape"] {
            fields.int(what)?;
        }
        Ok(fields.int("bits")? & codes::SCRATCH_NAME_BIT != 0)
    };
    scan().unwrap_or(false)
}

/// Strip characters that would break the record grammar out of a name.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '\\' && *c != '"')
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

/// A sanitized name ready to sit in a comma-separated field.
pub fn name_field(name: &str) -> String {
    let name = sanitize(name);
    if name.contains(',') {
        format!("\"{name}\"")
    } else {
        name
    }
}

pub fn format_variable(id: EntityId, var: &Variable) -> String {
    let (width, height) = codes::variable_size(var.shape);
    format!(
        "{},{},{},{},{},{},{},{},{},0,0,{},0,0,0",
        TYPE_VARIABLE,
        id,
        name_field(&var.name),
        var.position.x,
        var.position.y,
        width,
        height,
        codes::variable_shape_code(var.shape),
        codes::VARIABLE_BITS,
        var.text_position,
    )
}

pub fn format_causal_link(id: EntityId, link: &CausalLink) -> String {
    let has_font = link
        .has_font_override()
        .unwrap_or_else(|| codes::has_font_code(link.color.as_ref()));
    format!(
        "{},{},{},{},0,0,{},{},{},{},0,{},{},1|({},{})|",
        TYPE_CAUSAL_LINK,
        id,
        link.source(),
        link.target(),
        codes::polarity_code(link.polarity),
        codes::thickness_code(link.thickness),
        has_font,
        codes::link_flags(link.has_time_delay, link.curve.polarity_placement),
        codes::color_field(link.color.as_ref()),
        codes::LINK_FONT,
        link.curve.vertex.x,
        link.curve.vertex.y,
    )
}

/// A loop is a comment record plus the line holding its name.
pub fn format_loop(id: EntityId, l: &Loop) -> [String; 2] {
    let record = format!(
        "{},{},0,{},{},{},{},{},{},0,0,{},0,0,0",
        TYPE_LOOP,
        id,
        l.position.x,
        l.position.y,
        l.size.0,
        l.size.1,
        codes::rotation_code(l.rotation),
        codes::LOOP_BITS,
        l.text_position,
    );
    [record, sanitize(&l.name)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamodel::{
        LinkColor, Polarity, PolarityPlacement, Rotation, Thickness, VariableShape,
    };

    fn record(text: &str) -> RawRecord<'_> {
        RawRecord {
            line: 1,
            text,
            scratch_text: None,
        }
    }

    fn parse_ok(text: &str) -> (EntityId, Component) {
        parse_record(&record(text)).unwrap().unwrap()
    }

    #[test]
    fn test_string_field_unquoted() {
        let mut fields = Fields::new("hello,world", 1);
        assert_eq!("hello", fields.string("a").unwrap());
        assert_eq!("world", fields.string("b").unwrap());
        assert!(fields.raw("c").is_err());
    }

    #[test]
    fn test_string_field_quoted() {
        let mut fields = Fields::new("\"hello, world\",next", 1);
        assert_eq!("hello, world", fields.string("a").unwrap());
        assert_eq!("next", fields.raw("b").unwrap());
    }

    #[test]
    fn test_string_field_escaped_quote_and_unicode() {
        let mut fields = Fields::new("\"say \\\"héllo\\\"\",next", 1);
        assert_eq!("say \"héllo\"", fields.string("a").unwrap());
        assert_eq!("next", fields.raw("b").unwrap());
    }

    #[test]
    fn test_int_field_is_strict() {
        let mut fields = Fields::new("-1--1--1", 3);
        let err = fields.int("color").unwrap_err();
        assert_eq!(ErrorCode::MalformedRecord, err.code);
        assert!(err.details.unwrap().starts_with("line 3:"));
    }

    #[test]
    fn test_parse_variable() {
        let (id, component) = parse_ok("10,1,Susceptible Population S,162,192,40,20,3,3,0,0,0,0,0,0");
        assert_eq!(EntityId::new(1), id);
        let Component::Variable(var) = component else {
            panic!("expected a variable");
        };
        assert_eq!("Susceptible Population S", var.name);
        assert_eq!(Point::new(162, 192), var.position);
        assert_eq!(VariableShape::Boxed, var.shape);
        assert_eq!(0, var.text_position);
    }

    #[test]
    fn test_parse_variable_too_few_fields() {
        let err = parse_record(&record("10,1,Name,162,192,40")).unwrap_err();
        assert_eq!(ErrorCode::MalformedRecord, err.code);
        assert_eq!(ErrorKind::Import, err.kind);
    }

    #[test]
    fn test_parse_variable_bad_number() {
        let err = parse_record(&record("10,1,Name,abc,192,45,11,0,3,0,0,0,0,0,0")).unwrap_err();
        assert_eq!(ErrorCode::MalformedRecord, err.code);
    }

    #[test]
    fn test_parse_connector() {
        let (id, component) = parse_ok("1,3,5,2,4,0,0,22,0,0,0,-1--1--1,,1|(344,191)|");
        assert_eq!(EntityId::new(3), id);
        let Component::CausalLink(link) = component else {
            panic!("expected a causal link");
        };
        assert_eq!(EntityId::new(5), link.source());
        assert_eq!(EntityId::new(2), link.target());
        assert_eq!(None, link.polarity);
        assert_eq!(Thickness::Custom(22), link.thickness);
        assert_eq!(None, link.color);
        assert_eq!(Point::new(344, 191), link.curve.vertex);
    }

    #[test]
    fn test_parse_connector_styles() {
        let (_, component) =
            parse_ok("1,7,0,1,0,0,45,13,3,193,0,255-0-0,|0||-1--1--1,1|(150,80)|");
        let Component::CausalLink(link) = component else {
            panic!("expected a causal link");
        };
        assert_eq!(Some(Polarity::Minus), link.polarity);
        assert_eq!(Thickness::Bold, link.thickness);
        assert!(link.has_time_delay);
        assert_eq!(
            PolarityPlacement::ArrowheadOutside,
            link.curve.polarity_placement
        );
        assert_eq!(Some(LinkColor::Red), link.color);
    }

    #[test]
    fn test_has_font_that_disagrees_with_color_is_kept() {
        let text = "1,3,0,1,0,0,43,0,0,0,0,255-0-0,|0||-1--1--1,1|(1,1)|";
        let (id, component) = parse_ok(text);
        let Component::CausalLink(link) = component else {
            panic!("expected a causal link");
        };
        assert_eq!(Some(LinkColor::Red), link.color);
        assert_eq!(Some(0), link.has_font_override());
        assert_eq!(text, format_causal_link(id, &link));

        let text = "1,3,0,1,0,0,43,0,3,0,0,-1--1--1,|0||-1--1--1,1|(1,1)|";
        let (id, component) = parse_ok(text);
        let Component::CausalLink(link) = component else {
            panic!("expected a causal link");
        };
        assert_eq!(Some(3), link.has_font_override());
        assert_eq!(text, format_causal_link(id, &link));
    }

    #[test]
    fn test_has_font_matching_color_is_not_stored() {
        let (_, component) =
            parse_ok("1,7,0,1,0,0,45,13,3,193,0,255-0-0,|0||-1--1--1,1|(150,80)|");
        let Component::CausalLink(link) = component else {
            panic!("expected a causal link");
        };
        assert_eq!(None, link.has_font_override());
        assert_eq!(CausalLink::new(EntityId::new(0), EntityId::new(1)).has_font_override(), None);
    }

    #[test]
    fn test_id_out_of_range_is_malformed() {
        let err = parse_record(&record("10,4294967295,A,1,1,45,11,0,3,0,0,0,0,0,0")).unwrap_err();
        assert_eq!(ErrorCode::MalformedRecord, err.code);
        assert!(err.get_details().unwrap().contains("out of range"));

        let (id, _) = parse_ok("10,4294967294,A,1,1,45,11,0,3,0,0,0,0,0,0");
        assert_eq!(EntityId::new(u32::MAX - 1), id);
    }

    #[test]
    fn test_parse_connector_unknown_polarity() {
        let err = parse_record(&record("1,3,5,2,0,0,7,0,0,0,0,-1--1--1,,1|(1,1)|")).unwrap_err();
        assert_eq!(ErrorCode::MalformedRecord, err.code);
    }

    #[test]
    fn test_parse_connector_bad_point() {
        let err =
            parse_record(&record("1,3,5,2,0,0,43,0,0,0,0,-1--1--1,,1|(x,1)|")).unwrap_err();
        assert_eq!(ErrorCode::MalformedRecord, err.code);
    }

    #[test]
    fn test_parse_loop_with_scratch_name() {
        let rec = RawRecord {
            line: 9,
            text: "12,13,0,232,218,15,15,5,4,0,0,-1,0,0,0",
            scratch_text: Some("B1"),
        };
        let (id, component) = parse_record(&rec).unwrap().unwrap();
        assert_eq!(EntityId::new(13), id);
        let Component::Loop(l) = component else {
            panic!("expected a loop");
        };
        assert_eq!("B1", l.name);
        assert_eq!(Rotation::CounterClockwise, l.rotation);
        assert_eq!((15, 15), l.size);
        assert_eq!(-1, l.text_position);
    }

    #[test]
    fn test_parse_loop_inline_name() {
        let (_, component) = parse_ok("12,2,Reinforcing,10,10,20,20,4,3,0,0,0,0,0,0");
        assert_eq!("Reinforcing", component_name(&component));
    }

    fn component_name(component: &Component) -> &str {
        match component {
            Component::Loop(l) => &l.name,
            Component::Variable(v) => &v.name,
            Component::CausalLink(_) => "",
        }
    }

    #[test]
    fn test_scratch_name_missing_is_malformed() {
        let err = parse_record(&record("12,13,0,232,218,15,15,5,4,0,0,-1,0,0,0")).unwrap_err();
        assert_eq!(ErrorCode::MalformedRecord, err.code);
    }

    #[test]
    fn test_non_loop_comment_and_valve_are_skipped() {
        assert_eq!(
            None,
            parse_record(&record("12,4,48,100,100,10,8,0,3,0,0,-1,0,0,0")).unwrap()
        );
        assert_eq!(
            None,
            parse_record(&record("11,5,444,295,191,6,8,34,3,0,0,1,0,0,0")).unwrap()
        );
    }

    #[test]
    fn test_wants_scratch_line() {
        assert!(wants_scratch_line("12,13,0,232,218,15,15,5,4,0,0,-1,0,0,0"));
        assert!(wants_scratch_line("12,3,0,10,10,20,20,4,7,0,0,0,0,0,0"));
        assert!(!wants_scratch_line("12,2,Reinforcing,10,10,20,20,4,3,0,0,0,0,0,0"));
        assert!(!wants_scratch_line("10,1,A,1,1,45,11,0,7,0,0,0,0,0,0"));
        assert!(!wants_scratch_line("12,garbage"));
    }

    #[test]
    fn test_format_variable() {
        let var = Variable::new("Weight Gain", Point::new(300, 120));
        assert_eq!(
            "10,4,Weight Gain,300,120,45,11,0,3,0,0,0,0,0,0",
            format_variable(EntityId::new(4), &var)
        );
        let boxed = var.with_shape(VariableShape::Boxed).with_text_position(2);
        assert_eq!(
            "10,4,Weight Gain,300,120,40,20,3,3,0,0,2,0,0,0",
            format_variable(EntityId::new(4), &boxed)
        );
    }

    #[test]
    fn test_format_causal_link() {
        let mut link = CausalLink::new(EntityId::new(0), EntityId::new(1));
        link.curve.vertex = Point::new(150, 80);
        assert_eq!(
            "1,2,0,1,0,0,43,0,0,0,0,-1--1--1,|0||-1--1--1,1|(150,80)|",
            format_causal_link(EntityId::new(2), &link)
        );

        link.color = Some(LinkColor::Blue);
        link.has_time_delay = true;
        link.curve.polarity_placement = PolarityPlacement::ArrowheadInside;
        assert_eq!(
            "1,2,0,1,0,0,43,0,3,65,0,0-0-255,|0||-1--1--1,1|(150,80)|",
            format_causal_link(EntityId::new(2), &link)
        );
    }

    #[test]
    fn test_format_loop() {
        let l = Loop::new(Point::new(40, 50))
            .with_name("R1 \"growth\"")
            .with_rotation(Rotation::CounterClockwise);
        let [record, name] = format_loop(EntityId::new(6), &l);
        assert_eq!("12,6,0,40,50,20,20,5,7,0,0,0,0,0,0", record);
        assert_eq!("R1 growth", name);
    }

    #[test]
    fn test_name_field() {
        assert_eq!("plain", name_field("plain"));
        assert_eq!("no quotes", name_field("no \\\"quotes\""));
        assert_eq!("\"a, b\"", name_field("a, b"));
        assert_eq!("two lines", name_field("two\nlines"));
    }

    #[test]
    fn test_formatted_records_parse_back() {
        let mut link = CausalLink::new(EntityId::new(8), EntityId::new(8));
        link.polarity = Some(Polarity::Minus);
        link.color = Some(LinkColor::Unrecognized("12-34-56".to_owned()));
        let text = format_causal_link(EntityId::new(9), &link);
        let (_, component) = parse_ok(&text);
        assert_eq!(Component::CausalLink(link), component);

        let var = Variable::new("a, b", Point::new(-5, 7)).with_shape(VariableShape::Boxed);
        let text = format_variable(EntityId::new(1), &var);
        let (_, component) = parse_ok(&text);
        assert_eq!(Component::Variable(var), component);
    }
}
