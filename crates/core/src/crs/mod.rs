//! Spatial reference system handling
//!
//! A [`ReferenceSystem`] is an opaque WKT string. Input may be full WKT or an
//! `EPSG:<code>` shorthand, which is resolved to WKT through the
//! `crs-definitions` database. Input that cannot be resolved degrades to the
//! [`NOT_DEFINED`] sentinel; check [`ReferenceSystem::is_defined`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Sentinel WKT of an unresolved reference system
pub const NOT_DEFINED: &str = "not_defined";

/// Root keywords accepted as WKT (WKT1 and WKT2)
const WKT_ROOTS: &[&str] = &[
    "GEOGCS",
    "PROJCS",
    "GEOCCS",
    "VERT_CS",
    "COMPD_CS",
    "LOCAL_CS",
    "FITTED_CS",
    "GEODCRS",
    "GEODETICCRS",
    "GEOGCRS",
    "GEOGRAPHICCRS",
    "PROJCRS",
    "PROJECTEDCRS",
    "VERTCRS",
    "VERTICALCRS",
    "COMPOUNDCRS",
    "ENGCRS",
    "ENGINEERINGCRS",
    "BOUNDCRS",
];

/// Spatial reference system, stored as resolved WKT.
///
/// Two reference systems are equal iff their resolved WKT strings are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceSystem {
    wkt: String,
    epsg: Option<u32>,
}

impl ReferenceSystem {
    /// Resolve a reference system string.
    ///
    /// `EPSG:<code>` (any case) is looked up in the EPSG database; anything
    /// else must look like WKT. Unresolvable input yields the undefined
    /// sentinel and logs a warning.
    pub fn new(s: &str) -> Self {
        let trimmed = s.trim();
        if let Some(code) = parse_epsg_shorthand(trimmed) {
            return match Self::from_epsg(code) {
                Some(rs) => rs,
                None => {
                    warn!("EPSG:{} is not in the EPSG database; reference system not defined", code);
                    Self::not_defined()
                }
            };
        }
        if is_wkt(trimmed) {
            return Self::from_wkt(trimmed);
        }
        warn!("Cannot interpret '{}' as a reference system; reference system not defined", s);
        Self::not_defined()
    }

    /// Look up an EPSG code in the database
    pub fn from_epsg(code: u32) -> Option<Self> {
        let def = u16::try_from(code).ok().and_then(crs_definitions::from_code)?;
        Some(Self {
            wkt: def.wkt.to_string(),
            epsg: Some(code),
        })
    }

    /// Use a WKT string verbatim. The EPSG code is taken from the top-level
    /// `AUTHORITY`/`ID` clause when present.
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        let wkt = wkt.into();
        let epsg = top_level_epsg(&wkt);
        Self { wkt, epsg }
    }

    /// The undefined sentinel
    pub fn not_defined() -> Self {
        Self {
            wkt: NOT_DEFINED.to_string(),
            epsg: None,
        }
    }

    pub fn is_defined(&self) -> bool {
        self.wkt != NOT_DEFINED
    }

    /// Resolved WKT, or the sentinel
    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    /// EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get a short string identifier for this reference system
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if !self.is_defined() {
            return NOT_DEFINED.to_string();
        }
        let end = self
            .wkt
            .char_indices()
            .nth(50)
            .map(|(i, _)| i)
            .unwrap_or(self.wkt.len());
        format!("WKT:{}", &self.wkt[..end])
    }
}

impl PartialEq for ReferenceSystem {
    fn eq(&self, other: &Self) -> bool {
        self.wkt == other.wkt
    }
}

impl Eq for ReferenceSystem {}

impl Default for ReferenceSystem {
    fn default() -> Self {
        Self::not_defined()
    }
}

impl fmt::Display for ReferenceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// `EPSG:<4 or 5 digits>`, case-insensitive prefix
fn parse_epsg_shorthand(s: &str) -> Option<u32> {
    let (prefix, code) = s.split_once(':')?;
    if !prefix.eq_ignore_ascii_case("epsg") {
        return None;
    }
    if !(4..=5).contains(&code.len()) || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    code.parse().ok()
}

/// Structural WKT check: known root keyword, a quoted name right after the
/// opening bracket, balanced brackets outside quotes, closing bracket last.
fn is_wkt(s: &str) -> bool {
    let Some(open) = s.find(['[', '(']) else {
        return false;
    };
    let root = s[..open].trim();
    if !WKT_ROOTS.iter().any(|k| k.eq_ignore_ascii_case(root)) {
        return false;
    }
    if !s[open + 1..].trim_start().starts_with('"') {
        return false;
    }
    if !s.ends_with([']', ')']) {
        return false;
    }
    let mut depth = 0i32;
    let mut in_quotes = false;
    for (i, ch) in s.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '[' | '(' if !in_quotes => depth += 1,
            ']' | ')' if !in_quotes => {
                depth -= 1;
                // The root clause must close only at the very end.
                if depth < 0 || (depth == 0 && i != s.len() - 1) {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0 && !in_quotes
}

/// EPSG code of a depth-1 `AUTHORITY["EPSG","code"]` or `ID["EPSG",code]` clause
fn top_level_epsg(wkt: &str) -> Option<u32> {
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut found = None;
    let mut word_start = 0usize;
    for (i, ch) in wkt.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            '[' | '(' if !in_quotes => {
                let keyword = wkt[word_start..i].trim();
                if depth == 1
                    && (keyword.eq_ignore_ascii_case("AUTHORITY") || keyword.eq_ignore_ascii_case("ID"))
                {
                    if let Some(code) = parse_authority_body(&wkt[i + 1..]) {
                        found = Some(code);
                    }
                }
                depth += 1;
                word_start = i + 1;
            }
            ']' | ')' if !in_quotes => {
                depth -= 1;
                word_start = i + 1;
            }
            ',' if !in_quotes => word_start = i + 1,
            _ => {}
        }
    }
    found
}

fn parse_authority_body(body: &str) -> Option<u32> {
    let end = body.find([']', ')'])?;
    let mut parts = body[..end].split(',');
    let authority = parts.next()?.trim().trim_matches('"');
    let code = parts.next()?.trim().trim_matches('"');
    if !authority.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    code.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UTM32_WKT: &str = r#"PROJCS["ETRS89 / UTM zone 32N",GEOGCS["ETRS89",DATUM["European_Terrestrial_Reference_System_1989",SPHEROID["GRS 1980",6378137,298.257222101,AUTHORITY["EPSG","7019"]],AUTHORITY["EPSG","6258"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433],AUTHORITY["EPSG","4258"]],PROJECTION["Transverse_Mercator"],UNIT["metre",1],AUTHORITY["EPSG","25832"]]"#;

    #[test]
    fn test_epsg_shorthand_resolves() {
        let rs = ReferenceSystem::new("EPSG:4326");
        assert!(rs.is_defined());
        assert_eq!(rs.epsg(), Some(4326));
        assert!(rs.wkt().contains("WGS 84"));
        assert_eq!(rs.identifier(), "EPSG:4326");
    }

    #[test]
    fn test_epsg_shorthand_lowercase() {
        assert_eq!(ReferenceSystem::new("epsg:4326"), ReferenceSystem::new("EPSG:4326"));
    }

    #[test]
    fn test_wkt_accepted_and_code_extracted() {
        let rs = ReferenceSystem::new(UTM32_WKT);
        assert!(rs.is_defined());
        assert_eq!(rs.epsg(), Some(25832));
        assert_eq!(rs.wkt(), UTM32_WKT);
    }

    #[test]
    fn test_garbage_is_not_defined() {
        for s in ["", "hello", "EPSG:abc", "EPSG:1", "PROJCS[\"x\"", "FOO[\"x\"]"] {
            let rs = ReferenceSystem::new(s);
            assert!(!rs.is_defined(), "{s:?} should not resolve");
            assert_eq!(rs.wkt(), NOT_DEFINED);
        }
    }

    #[test]
    fn test_equality_is_wkt_equality() {
        let a = ReferenceSystem::from_wkt(UTM32_WKT);
        let b = ReferenceSystem::new(UTM32_WKT);
        assert_eq!(a, b);
        assert_ne!(a, ReferenceSystem::new("EPSG:4326"));
        assert_eq!(ReferenceSystem::default(), ReferenceSystem::new("nonsense"));
    }
}
