// Copyright 2026 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! First import pass: split a document into its control block, the
//! sketch default parameters, component records and the trailer hint.
//!
//! Nothing here interprets record fields beyond what's needed to know
//! whether a record's text lives on the following line.

use tracing::warn;

use super::records::{wants_scratch_line, RawRecord};
use super::{CONTROL_PREFIX, DEFAULT_PARAMS_PREFIX, END_OF_SKETCH, SKETCH_START, VIEW_TITLE_PREFIX};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Equations,
    Control,
    Sketch,
    Trailer,
}

/// Everything pass 1 pulled out of a document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sections<'a> {
    pub control: Vec<&'a str>,
    pub default_params: Option<&'a str>,
    pub records: Vec<RawRecord<'a>>,
    pub largest_id_hint: Option<u32>,
    pub hint_line: usize,
    pub saw_control: bool,
}

struct SectionReader<'a, I: Iterator<Item = &'a str>> {
    lines: std::iter::Peekable<I>,
    line_number: usize,
    state: State,
    sections: Sections<'a>,
}

impl<'a, I: Iterator<Item = &'a str>> SectionReader<'a, I> {
    fn new(lines: I) -> Self {
        SectionReader {
            lines: lines.peekable(),
            line_number: 0,
            state: State::Equations,
            sections: Sections::default(),
        }
    }

    fn read_line(&mut self) -> Option<&'a str> {
        let line = self.lines.next()?;
        self.line_number += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);
        if self.line_number == 1 {
            return Some(line.strip_prefix('\u{feff}').unwrap_or(line));
        }
        Some(line)
    }

    fn read_all(mut self) -> Sections<'a> {
        while let Some(line) = self.read_line() {
            match self.state {
                State::Equations => self.equation_line(line),
                State::Control => self.control_line(line),
                State::Sketch => self.sketch_line(line),
                State::Trailer => self.trailer_line(line),
            }
        }
        self.sections
    }

    fn equation_line(&mut self, line: &'a str) {
        if line.starts_with(SKETCH_START) {
            self.state = State::Sketch;
        } else if line.starts_with(CONTROL_PREFIX) {
            self.state = State::Control;
            self.sections.saw_control = true;
            self.sections.control.push(line);
        }
    }

    fn control_line(&mut self, line: &'a str) {
        if line.starts_with(SKETCH_START) {
            self.state = State::Sketch;
        } else {
            self.sections.control.push(line);
        }
    }

    fn sketch_line(&mut self, line: &'a str) {
        if line.starts_with(END_OF_SKETCH) {
            self.state = State::Trailer;
        } else if line.starts_with(SKETCH_START)
            || line.starts_with("V300")
            || line.starts_with("V364")
            || line.starts_with(VIEW_TITLE_PREFIX)
        {
            // another view, or view header lines
        } else if line.starts_with(DEFAULT_PARAMS_PREFIX) {
            if self.sections.default_params.is_none() {
                self.sections.default_params = Some(line);
            }
        } else if line.starts_with(|c: char| c.is_ascii_digit()) {
            let line_number = self.line_number;
            let scratch_text = if wants_scratch_line(line) {
                self.read_line()
            } else {
                None
            };
            self.sections.records.push(RawRecord {
                line: line_number,
                text: line,
                scratch_text,
            });
        }
    }

    fn trailer_line(&mut self, line: &'a str) {
        let Some(hint) = line.strip_prefix('-') else {
            return;
        };
        match hint.trim().parse::<u32>() {
            Ok(hint) => {
                self.sections.largest_id_hint = Some(hint);
                self.sections.hint_line = self.line_number;
            }
            Err(_) => warn!(line = self.line_number, "ignoring unreadable id hint {line:?}"),
        }
    }
}

/// Classify every line of `lines`, which may still carry `\r` endings.
pub fn read_sections<'a, I>(lines: I) -> Sections<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    SectionReader::new(lines.into_iter()).read_all()
}
