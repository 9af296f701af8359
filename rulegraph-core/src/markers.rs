//! Rule-marker recognition for raw text lines.
//!
//! Mirrors how the upstream extractor assigns rule codes: each line is tested
//! against the marker levels in order, and a running [`MarkerState`] turns the
//! level markers seen so far into a composite code such as `4.3.5(1)(a)`.
//!
//! Known quirk, kept on purpose: `(i)`, `(v)` and `(x)` match the alpha level
//! before the roman level is tried, so `(b)(i)` comes out as `(i)` replacing
//! `(b)`. The hierarchy engine's indent confirmation and roman-chain pruning
//! compensate for exactly this.

use crate::error::Result;
use crate::types::{Fragment, FragmentKind};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarkerLevel {
    Part,
    Main,
    Digit,
    Alpha,
    Roman,
}

impl MarkerLevel {
    /// Match order, shallowest first.
    pub const ALL: [MarkerLevel; 5] = [
        MarkerLevel::Part,
        MarkerLevel::Main,
        MarkerLevel::Digit,
        MarkerLevel::Alpha,
        MarkerLevel::Roman,
    ];

    pub fn pattern(self) -> &'static str {
        match self {
            MarkerLevel::Part => r"^Part\s+\d+\.\d+",
            MarkerLevel::Main => r"^\d+\.\d+\.\d+",
            MarkerLevel::Digit => r"^\(\d+\)",
            MarkerLevel::Alpha => r"^\([a-z]\)",
            MarkerLevel::Roman => r"^\([ivx]+\)",
        }
    }
}

/// Last marker seen at each level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerState {
    pub part: String,
    pub main: String,
    pub digit: String,
    pub alpha: String,
    pub roman: String,
}

impl MarkerState {
    fn slot_mut(&mut self, level: MarkerLevel) -> &mut String {
        match level {
            MarkerLevel::Part => &mut self.part,
            MarkerLevel::Main => &mut self.main,
            MarkerLevel::Digit => &mut self.digit,
            MarkerLevel::Alpha => &mut self.alpha,
            MarkerLevel::Roman => &mut self.roman,
        }
    }

    /// Record a marker: clear its level and every deeper one, then set it.
    /// Returns the resulting composite code.
    pub fn apply(&mut self, level: MarkerLevel, marker: &str) -> String {
        for deeper in MarkerLevel::ALL.iter().filter(|l| **l >= level) {
            self.slot_mut(*deeper).clear();
        }
        *self.slot_mut(level) = marker.to_string();
        self.code()
    }

    /// `main + digit + alpha + roman`, or the part marker when those are all empty.
    pub fn code(&self) -> String {
        let code = format!("{}{}{}{}", self.main, self.digit, self.alpha, self.roman);
        if code.is_empty() {
            self.part.clone()
        } else {
            code
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedMarker {
    pub level: MarkerLevel,
    /// The marker text as it appeared (`Part 4.2`, `4.3.5`, `(1)`)
    pub marker: String,
    /// Composite code after applying the marker
    pub code: String,
    /// Line text after the marker, trimmed
    pub remainder: String,
}

pub struct MarkerScanner {
    patterns: Vec<(MarkerLevel, Regex)>,
    state: MarkerState,
}

impl MarkerScanner {
    pub fn new() -> Result<Self> {
        let mut patterns = Vec::with_capacity(MarkerLevel::ALL.len());
        for level in MarkerLevel::ALL {
            patterns.push((level, Regex::new(level.pattern())?));
        }
        Ok(Self {
            patterns,
            state: MarkerState::default(),
        })
    }

    pub fn state(&self) -> &MarkerState {
        &self.state
    }

    /// First matching marker level for a line, without touching the state.
    pub fn marker_level<'l>(&self, line: &'l str) -> Option<(MarkerLevel, &'l str)> {
        self.patterns.iter().find_map(|(level, regex)| {
            regex.find(line).map(|m| (*level, m.as_str()))
        })
    }

    /// Scan one line, updating the running state when it opens with a marker.
    pub fn scan_line(&mut self, line: &str) -> Option<ScannedMarker> {
        let line = line.trim();
        let (level, marker) = self.marker_level(line)?;
        let marker = marker.to_string();
        let remainder = line[marker.len()..].trim().to_string();
        let code = self.state.apply(level, &marker);

        Some(ScannedMarker {
            level,
            marker,
            code,
            remainder,
        })
    }

    pub fn is_note(line: &str) -> bool {
        line.trim_start().to_lowercase().starts_with("note:")
    }

    /// Turn text blocks (offset, text) into fragments with consecutive indices.
    ///
    /// A block opening with a marker becomes a RULE fragment carrying the
    /// composite code, with the marker stripped from its text. `Note:` blocks
    /// become NOTE fragments; anything else is TEXT. Marker state carries
    /// across blocks, so a `(2)` after `4.1.3` codes as `4.1.3(2)`.
    pub fn scan_blocks<'b>(
        &mut self,
        blocks: impl IntoIterator<Item = (f64, &'b str)>,
    ) -> Vec<Fragment> {
        let mut fragments = Vec::new();

        for (index, (x_offset, text)) in blocks.into_iter().enumerate() {
            let fragment = if let Some(scanned) = self.scan_line(text) {
                debug!(index, code = %scanned.code, "{:?} marker {}", scanned.level, scanned.marker);
                Fragment::rule(index, &scanned.code, x_offset).with_text(&scanned.remainder)
            } else if Self::is_note(text) {
                Fragment::note(index, text.trim(), x_offset)
            } else {
                Fragment::text(index, text.trim(), x_offset)
            };
            fragments.push(fragment);
        }

        let rules = fragments
            .iter()
            .filter(|f| f.kind == FragmentKind::Rule)
            .count();
        info!(
            "🏷️  Marker scan: {} blocks, {} carry rule codes",
            fragments.len(),
            rules
        );
        fragments
    }
}
