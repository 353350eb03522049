// Floor levels for secondary uses
//
// Basement and above-ground floors are numbered; the three named levels sit between
// them and travel on the wire as -0.5 / 0 / 0.5.

use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

pub const LOWEST_BASEMENT: i32 = -100;
pub const HIGHEST_FLOOR: i32 = 100;

/// Floor number in `-100..=-1` or `1..=100`; only built through `FloorNumber::new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloorNumber(i32);

impl FloorNumber {
    pub fn new(n: i32) -> Option<Self> {
        if n == 0 || !(LOWEST_BASEMENT..=HIGHEST_FLOOR).contains(&n) {
            return None;
        }
        Some(FloorNumber(n))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloorLevel {
    /// Basement or above-ground floor
    Numbered(FloorNumber),
    /// Entresótano, between the first basement and the ground floor
    SubMezzanine,
    /// Planta baja
    Ground,
    /// Entreplanta, between the ground floor and the first floor
    Mezzanine,
}

impl FloorLevel {
    /// Build a numbered floor, rejecting zero and anything outside the supported range.
    pub fn numbered(n: i32) -> Option<Self> {
        FloorNumber::new(n).map(FloorLevel::Numbered)
    }

    /// The numbered floor, if this is not one of the named levels.
    pub fn number(&self) -> Option<i32> {
        match self {
            FloorLevel::Numbered(n) => Some(n.get()),
            _ => None,
        }
    }

    fn half_steps(&self) -> i32 {
        match self {
            FloorLevel::Numbered(n) => n.get() * 2,
            FloorLevel::SubMezzanine => -1,
            FloorLevel::Ground => 0,
            FloorLevel::Mezzanine => 1,
        }
    }

    pub fn wire_value(&self) -> f64 {
        f64::from(self.half_steps()) / 2.0
    }

    pub fn from_wire_value(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let doubled = value * 2.0;
        if doubled.fract() != 0.0 {
            return None;
        }
        match doubled as i64 {
            -1 => Some(FloorLevel::SubMezzanine),
            0 => Some(FloorLevel::Ground),
            1 => Some(FloorLevel::Mezzanine),
            d if d % 2 == 0 => i32::try_from(d / 2).ok().and_then(FloorLevel::numbered),
            _ => None,
        }
    }

    pub fn is_basement(&self) -> bool {
        self.half_steps() < 0
    }

    pub fn is_special(&self) -> bool {
        !matches!(self, FloorLevel::Numbered(_))
    }

    /// Interpret a free-text floor description such as "sótano 2", "planta baja" or "3ª planta".
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = normalize_label(label);
        if normalized.is_empty() {
            return None;
        }

        if SUB_MEZZANINE.is_match(&normalized) {
            return Some(FloorLevel::SubMezzanine);
        }
        if MEZZANINE.is_match(&normalized) {
            return Some(FloorLevel::Mezzanine);
        }
        if GROUND.is_match(&normalized) {
            return Some(FloorLevel::Ground);
        }

        for pattern in BASEMENT_PATTERNS.iter() {
            if let Some(n) = capture_number(pattern, &normalized) {
                return FloorLevel::numbered(-n);
            }
        }
        for pattern in FLOOR_PATTERNS.iter() {
            if let Some(n) = capture_number(pattern, &normalized) {
                return FloorLevel::numbered(n);
            }
        }

        ORDINALS
            .iter()
            .find(|(word, _)| normalized.split(' ').any(|token| token == *word))
            .and_then(|(_, n)| FloorLevel::numbered(*n))
    }
}

impl Ord for FloorLevel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.half_steps().cmp(&other.half_steps())
    }
}

impl PartialOrd for FloorLevel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FloorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FloorLevel::Numbered(n) if n.get() < 0 => write!(f, "sótano {}", -n.get()),
            FloorLevel::Numbered(n) => write!(f, "planta {}", n.get()),
            FloorLevel::SubMezzanine => write!(f, "entresótano"),
            FloorLevel::Ground => write!(f, "planta baja"),
            FloorLevel::Mezzanine => write!(f, "entreplanta"),
        }
    }
}

impl Serialize for FloorLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FloorLevel::Numbered(n) => serializer.serialize_i32(n.get()),
            FloorLevel::Ground => serializer.serialize_i32(0),
            other => serializer.serialize_f64(other.wire_value()),
        }
    }
}

impl<'de> Deserialize<'de> for FloorLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FloorVisitor;

        impl<'de> Visitor<'de> for FloorVisitor {
            type Value = FloorLevel;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a floor number, one of -0.5/0/0.5, or a floor label")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<FloorLevel, E> {
                if v == 0 {
                    return Ok(FloorLevel::Ground);
                }
                i32::try_from(v)
                    .ok()
                    .and_then(FloorLevel::numbered)
                    .ok_or_else(|| E::custom(format!("floor {v} out of range")))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<FloorLevel, E> {
                let signed = i64::try_from(v).map_err(|_| E::custom("floor out of range"))?;
                self.visit_i64(signed)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<FloorLevel, E> {
                FloorLevel::from_wire_value(v)
                    .ok_or_else(|| E::custom(format!("invalid floor value {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<FloorLevel, E> {
                FloorLevel::parse_label(v)
                    .ok_or_else(|| E::custom(format!("unrecognised floor label '{v}'")))
            }
        }

        deserializer.deserialize_any(FloorVisitor)
    }
}

/// Which numbered block a floor range addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangeKind {
    #[serde(rename = "sotano", alias = "basement")]
    Basement,
    #[serde(rename = "planta", alias = "above_ground")]
    AboveGround,
}

impl RangeKind {
    pub fn bounds(&self) -> (i32, i32) {
        match self {
            RangeKind::Basement => (LOWEST_BASEMENT, -1),
            RangeKind::AboveGround => (1, HIGHEST_FLOOR),
        }
    }

    /// Every floor in `from..=to`, or `None` when the range is inverted or leaves the block.
    pub fn levels(&self, from: i32, to: i32) -> Option<Vec<FloorLevel>> {
        let (low, high) = self.bounds();
        if from > to || from < low || to > high {
            return None;
        }
        Some((from..=to).filter_map(FloorLevel::numbered).collect())
    }
}

impl fmt::Display for RangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeKind::Basement => write!(f, "sotano"),
            RangeKind::AboveGround => write!(f, "planta"),
        }
    }
}

impl FromStr for RangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).as_str() {
            "sotano" | "sótano" | "basement" => Ok(RangeKind::Basement),
            "planta" | "above_ground" | "sobre_rasante" => Ok(RangeKind::AboveGround),
            other => Err(format!("unknown floor range kind '{other}'")),
        }
    }
}

fn normalize_label(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn capture_number(pattern: &Regex, text: &str) -> Option<i32> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("floor patterns are static literals")
}

static SUB_MEZZANINE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^entre[\s-]?s[óo]tano$"));
static MEZZANINE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(entre[\s-]?planta|entresuelos?)$"));
static GROUND: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^(planta baja|planta 0|bajo|pb|p\.b\.)$"));

static BASEMENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r"^(?:s[óo]tano|subterr[áa]neo|subsuelo)\s*-?(\d+)$"),
        compile(r"^(?:planta|nivel|p\.?)\s*-(\d+)$"),
        compile(r"^s-?(\d+)$"),
        compile(r"^-(\d+)$"),
    ]
});

static FLOOR_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        compile(r"^(?:planta|piso|nivel|p\.?)\s*(\d+)$"),
        compile(r"^(\d+)\s*(?:º|ª|°|er|do|to|mo|vo|no)?\s*(?:planta|piso)?$"),
    ]
});

const ORDINALS: &[(&str, i32)] = &[
    ("primera", 1),
    ("primero", 1),
    ("segunda", 2),
    ("segundo", 2),
    ("tercera", 3),
    ("tercero", 3),
    ("cuarta", 4),
    ("cuarto", 4),
    ("quinta", 5),
    ("quinto", 5),
    ("sexta", 6),
    ("sexto", 6),
    ("séptima", 7),
    ("séptimo", 7),
    ("octava", 8),
    ("octavo", 8),
    ("novena", 9),
    ("noveno", 9),
    ("décima", 10),
    ("décimo", 10),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn floor(n: i32) -> FloorLevel {
        FloorLevel::numbered(n).unwrap()
    }

    #[test]
    fn test_numbered_rejects_zero_and_out_of_block_values() {
        assert_eq!(FloorLevel::numbered(0), None);
        assert_eq!(FloorLevel::numbered(500), None);
        assert_eq!(FloorLevel::numbered(-101), None);
        assert_eq!(floor(-100).number(), Some(-100));
        assert_eq!(FloorLevel::Ground.number(), None);

        // Ground is never shadowed by a numbered floor
        let floors: BTreeSet<FloorLevel> = [FloorLevel::Ground, floor(1), floor(-1)]
            .into_iter()
            .collect();
        assert_eq!(floors.len(), 3);
        assert!(floors.contains(&FloorLevel::Ground));
    }

    #[test]
    fn test_special_levels_sort_between_basements_and_floors() {
        let floors: BTreeSet<FloorLevel> = [
            floor(1),
            FloorLevel::Mezzanine,
            FloorLevel::Ground,
            floor(-1),
            FloorLevel::SubMezzanine,
        ]
        .into_iter()
        .collect();

        let values: Vec<f64> = floors.iter().map(FloorLevel::wire_value).collect();
        assert_eq!(values, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_range_levels_respect_block_bounds() {
        assert_eq!(
            RangeKind::Basement.levels(-3, -1),
            Some(vec![
                floor(-3),
                floor(-2),
                floor(-1)
            ])
        );
        assert_eq!(RangeKind::Basement.levels(-1, -3), None);
        assert_eq!(RangeKind::Basement.levels(-2, 1), None);
        assert_eq!(RangeKind::AboveGround.levels(0, 2), None);
        assert_eq!(RangeKind::AboveGround.levels(99, 101), None);
        assert_eq!(RangeKind::AboveGround.levels(4, 4).map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_parse_label_understands_common_descriptions() {
        assert_eq!(FloorLevel::parse_label("Sótano 2"), Some(floor(-2)));
        assert_eq!(FloorLevel::parse_label("sotano1"), Some(floor(-1)));
        assert_eq!(FloorLevel::parse_label("planta -3"), Some(floor(-3)));
        assert_eq!(FloorLevel::parse_label("Planta Baja"), Some(FloorLevel::Ground));
        assert_eq!(FloorLevel::parse_label("PB"), Some(FloorLevel::Ground));
        assert_eq!(FloorLevel::parse_label("entreplanta"), Some(FloorLevel::Mezzanine));
        assert_eq!(FloorLevel::parse_label("entresuelo"), Some(FloorLevel::Mezzanine));
        assert_eq!(FloorLevel::parse_label("entresótano"), Some(FloorLevel::SubMezzanine));
        assert_eq!(FloorLevel::parse_label("planta 4"), Some(floor(4)));
        assert_eq!(FloorLevel::parse_label("3ª planta"), Some(floor(3)));
        assert_eq!(FloorLevel::parse_label("segunda"), Some(floor(2)));
        assert_eq!(FloorLevel::parse_label("tejado"), None);
        assert_eq!(FloorLevel::parse_label("planta 250"), None);
    }

    #[test]
    fn test_wire_format_uses_half_values_for_named_levels() {
        let floors = vec![
            floor(-2),
            FloorLevel::SubMezzanine,
            FloorLevel::Ground,
            FloorLevel::Mezzanine,
            floor(3),
        ];
        let json = serde_json::to_string(&floors).unwrap();
        assert_eq!(json, "[-2,-0.5,0,0.5,3]");

        let parsed: Vec<FloorLevel> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, floors);

        assert!(serde_json::from_str::<FloorLevel>("0.25").is_err());
        assert!(serde_json::from_str::<FloorLevel>("\"planta baja\"").is_ok());
    }

    #[test]
    fn test_range_kind_from_str() {
        assert_eq!("sotano".parse::<RangeKind>(), Ok(RangeKind::Basement));
        assert_eq!("Planta".parse::<RangeKind>(), Ok(RangeKind::AboveGround));
        assert!("tejado".parse::<RangeKind>().is_err());
    }
}
