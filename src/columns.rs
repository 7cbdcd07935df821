//! Fixed column layouts of the cost-report sheets.
//!
//! Cost-report headers are unstable between exports but the column positions
//! are not, so every amount is read from a configured 0-based offset.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetType {
    Listing,
    Display,
    Affiliate,
}

/// Substrings that make a cost-report sheet worth processing (case-sensitive).
const RELEVANT_SHEET_KEYS: &[&str] = &["Listing", "Display", "affiliate"];

const LISTING_COLUMNS: &[(&str, usize)] = &[
    ("Listing ALL", 17),
    ("Google単体", 53),
    ("Google単体以外", 89),
    ("Googleその他", 125),
    ("Yahoo単体", 161),
    ("Yahoo単体以外", 197),
    ("Microsoft単体", 233),
    ("Microsoft単体以外", 269),
];

const DISPLAY_COLUMNS: &[(&str, usize)] = &[
    ("Display ALL", 17),
    ("Meta", 53),
    ("X", 89),
    ("LINE", 125),
    ("YDA", 161),
    ("TTD", 199),
    ("TikTok", 235),
    ("GDN", 271),
    ("CRITEO", 307),
    ("RUNA", 343),
];

const AFFILIATE_COLUMNS: &[(&str, usize)] = &[("AFF ALL", 20)];

/// ALL, その他, 単体/単体以外 for Google, Yahoo, Microsoft.
const LISTING_ORDER: &[&str] = &[
    "Listing ALL",
    "Googleその他",
    "Google単体",
    "Google単体以外",
    "Yahoo単体",
    "Yahoo単体以外",
    "Microsoft単体",
    "Microsoft単体以外",
];

impl SheetType {
    /// Derive the layout from a sheet name. Anything that is neither a
    /// Listing nor a Display sheet is read with the Affiliate layout.
    pub fn from_sheet_name(name: &str) -> Self {
        if name.contains("Listing") {
            Self::Listing
        } else if name.contains("Display") {
            Self::Display
        } else {
            Self::Affiliate
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Listing => "Listing",
            Self::Display => "Display",
            Self::Affiliate => "Affiliate",
        }
    }

    pub fn columns(&self) -> &'static [(&'static str, usize)] {
        match self {
            Self::Listing => LISTING_COLUMNS,
            Self::Display => DISPLAY_COLUMNS,
            Self::Affiliate => AFFILIATE_COLUMNS,
        }
    }

    pub fn date_offset(&self) -> usize {
        match self {
            Self::Listing | Self::Display => 1,
            Self::Affiliate => 0,
        }
    }

    pub fn canonical_order(&self) -> Option<&'static [&'static str]> {
        match self {
            Self::Listing => Some(LISTING_ORDER),
            Self::Display | Self::Affiliate => None,
        }
    }
}

impl fmt::Display for SheetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn columns_for(sheet_type: SheetType) -> &'static [(&'static str, usize)] {
    sheet_type.columns()
}

pub fn date_offset(sheet_type: SheetType) -> usize {
    sheet_type.date_offset()
}

pub fn is_relevant_sheet(name: &str) -> bool {
    RELEVANT_SHEET_KEYS.iter().any(|key| name.contains(key))
}
