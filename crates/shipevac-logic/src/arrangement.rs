//! Deck arrangement documents → `World`.
//!
//! The loader is lenient: every entry is parsed on its own, and anything
//! malformed is skipped or replaced by a default with an
//! `ArrangementWarning`. Loading a parsed document never
//! fails.
//!
//! ```
//! use serde_json::json;
//! use shipevac_logic::arrangement::load_world;
//!
//! let doc = json!({ "arrangements": {
//!     "deck": { "attributes": { "length": 20, "width": 10 } },
//!     "musteringStations": {
//!         "MES1": { "attributes": { "x": 8, "y": 0, "length": 2, "width": 4 } }
//!     }
//! }});
//! let (world, report) = load_world(&doc);
//! assert!(report.is_clean());
//! assert_eq!(world.stations.len(), 1);
//! ```

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::{defaults, station};
use crate::geometry::Point2;
use crate::shape::Shape;
use crate::world::{Compartment, Deck, Interface, MusteringStation, World};

/// The arrangement text could not be turned into a JSON document.
#[derive(Debug, Error)]
pub enum ArrangementError {
    #[error("arrangement is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("arrangement root must be a JSON object")]
    NotAnObject,
}

/// A recoverable problem found while loading an arrangement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrangementWarning {
    #[error("no deck entry; using default {length}×{width} deck")]
    MissingDeck { length: f32, width: f32 },
    #[error("deck entry is invalid ({reason}); using default deck")]
    InvalidDeck { reason: String },
    #[error("deck outline has {points} usable points; using rectangular deck")]
    DegenerateDeckOutline { points: usize },
    #[error("compartment `{name}` skipped: {reason}")]
    InvalidCompartment { name: String, reason: String },
    #[error("compartment `{name}` asks for a polygon without a usable outline; using rectangle")]
    PolygonFallback { name: String },
    #[error("mustering station `{name}` skipped: {reason}")]
    InvalidStation { name: String, reason: String },
    #[error("interface `{name}` skipped: {reason}")]
    InvalidInterface { name: String, reason: String },
    #[error("interface `{interface}` connects unknown endpoint `{endpoint}`")]
    UnknownEndpoint { interface: String, endpoint: String },
    #[error("compartment `{compartment}` already exits through `{kept}`; ignoring `{ignored}`")]
    DuplicateDeckExit {
        compartment: String,
        kept: String,
        ignored: String,
    },
    #[error("no musteringStations section; reading legacy `MusteringStation` compartment")]
    LegacyStation,
    #[error("no mustering stations defined; using default station at ({x}, {y})")]
    DefaultStation { x: f32, y: f32 },
}

/// Everything the loader had to work around.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub warnings: Vec<ArrangementWarning>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn push(&mut self, warning: ArrangementWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }
}

// ── Attribute schemas ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Entry<T> {
    attributes: T,
}

/// An outline vertex written as `[x, y]` or `{ "x": .., "y": .. }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OutlinePoint {
    Pair(Vec<f32>),
    Object {
        #[serde(deserialize_with = "lenient_f32")]
        x: f32,
        #[serde(deserialize_with = "lenient_f32")]
        y: f32,
    },
}

impl OutlinePoint {
    fn to_point(&self) -> Option<Point2> {
        match self {
            OutlinePoint::Pair(v) if v.len() >= 2 => Some(Point2::new(v[0], v[1])),
            OutlinePoint::Pair(_) => None,
            OutlinePoint::Object { x, y } => Some(Point2::new(*x, *y)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeckAttributes {
    #[serde(deserialize_with = "lenient_f32")]
    length: f32,
    #[serde(deserialize_with = "lenient_f32")]
    width: f32,
    #[serde(default)]
    outline: Option<Vec<OutlinePoint>>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f32")]
    z: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompartmentAttributes {
    #[serde(deserialize_with = "lenient_f32")]
    x: f32,
    #[serde(deserialize_with = "lenient_f32")]
    y: f32,
    #[serde(deserialize_with = "lenient_f32")]
    length: f32,
    #[serde(deserialize_with = "lenient_f32")]
    width: f32,
    #[serde(default, deserialize_with = "lenient_opt_f32")]
    rotation: Option<f32>,
    #[serde(default, deserialize_with = "lenient_opt_f32")]
    height: Option<f32>,
    #[serde(default, deserialize_with = "lenient_opt_f32")]
    z: Option<f32>,
    #[serde(default)]
    shape: Option<String>,
    #[serde(default)]
    outline: Option<Vec<OutlinePoint>>,
    #[serde(default)]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationAttributes {
    #[serde(deserialize_with = "lenient_f32")]
    x: f32,
    #[serde(deserialize_with = "lenient_f32")]
    y: f32,
    #[serde(deserialize_with = "lenient_f32")]
    length: f32,
    #[serde(deserialize_with = "lenient_f32")]
    width: f32,
}

#[derive(Debug, Deserialize)]
struct InterfaceAttributes {
    #[serde(deserialize_with = "lenient_f32")]
    x: f32,
    #[serde(deserialize_with = "lenient_f32")]
    y: f32,
    #[serde(default, deserialize_with = "lenient_opt_f32")]
    z: Option<f32>,
    #[serde(deserialize_with = "lenient_f32")]
    width: f32,
    #[serde(deserialize_with = "lenient_f32")]
    height: f32,
    #[serde(default, deserialize_with = "lenient_opt_f32")]
    thickness: Option<f32>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    connects: Vec<String>,
}

/// Accept both `1.5` and `"1.5"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f32),
    Text(String),
}

impl NumberOrText {
    fn into_f32<E: de::Error>(self) -> Result<f32, E> {
        match self {
            NumberOrText::Number(v) => Ok(v),
            NumberOrText::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("`{s}` is not a number"))),
        }
    }
}

fn lenient_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f32, D::Error> {
    NumberOrText::deserialize(deserializer)?.into_f32()
}

fn lenient_opt_f32<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f32>, D::Error> {
    Option::<NumberOrText>::deserialize(deserializer)?
        .map(NumberOrText::into_f32)
        .transpose()
}

fn parse_entry<T: for<'de> Deserialize<'de>>(value: &Value) -> Result<T, String> {
    serde_json::from_value::<Entry<T>>(value.clone())
        .map(|e| e.attributes)
        .map_err(|e| e.to_string())
}

fn positive_extents(length: f32, width: f32) -> Result<(), String> {
    if length.is_finite() && width.is_finite() && length > 0.0 && width > 0.0 {
        Ok(())
    } else {
        Err(format!("non-positive extents {length}×{width}"))
    }
}

fn outline_points(outline: &[OutlinePoint]) -> Vec<Point2> {
    outline.iter().filter_map(OutlinePoint::to_point).collect()
}

// ── Loader ──────────────────────────────────────────────────────────────

/// Parse arrangement text and load it.
pub fn load_world_from_str(text: &str) -> Result<(World, LoadReport), ArrangementError> {
    let doc: Value = serde_json::from_str(text)?;
    if !doc.is_object() {
        return Err(ArrangementError::NotAnObject);
    }
    Ok(load_world(&doc))
}

/// Build a `World` from an already-parsed arrangement document.
///
/// Expects the `arrangements` object at the root; a document without it is
/// treated as empty (default deck, default station).
pub fn load_world(doc: &Value) -> (World, LoadReport) {
    let mut report = LoadReport::default();
    let empty = Map::new();
    let root = doc
        .get("arrangements")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let deck = load_deck(root.get("deck"), &mut report);

    let compartment_entries = root.get("compartments").and_then(Value::as_object);
    let station_entries = root
        .get("musteringStations")
        .and_then(Value::as_object)
        .filter(|m| !m.is_empty());

    let mut stations = Vec::new();
    let mut legacy_station_used = false;
    match station_entries {
        Some(entries) => {
            for (name, value) in entries {
                if let Some(s) = load_station(name, value, &mut report) {
                    stations.push(s);
                }
            }
        }
        None => {
            let legacy = compartment_entries.and_then(|c| c.get(station::LEGACY_COMPARTMENT_NAME));
            if let Some(value) = legacy {
                report.push(ArrangementWarning::LegacyStation);
                legacy_station_used = true;
                if let Some(s) = load_station(station::LEGACY_COMPARTMENT_NAME, value, &mut report) {
                    stations.push(s);
                }
            }
        }
    }
    if stations.is_empty() {
        report.push(ArrangementWarning::DefaultStation {
            x: defaults::STATION_X,
            y: defaults::STATION_Y,
        });
        stations.push(MusteringStation::new(
            defaults::STATION_NAME,
            Point2::new(defaults::STATION_X, defaults::STATION_Y),
            defaults::STATION_LENGTH,
            defaults::STATION_WIDTH,
        ));
    }

    let mut compartments = Vec::new();
    for (name, value) in compartment_entries.into_iter().flatten() {
        if legacy_station_used && name == station::LEGACY_COMPARTMENT_NAME {
            continue;
        }
        if let Some(c) = load_compartment(name, value, &mut report) {
            compartments.push(c);
        }
    }

    let mut interfaces = Vec::new();
    let interface_entries = root.get("interfaces").and_then(Value::as_object);
    for (name, value) in interface_entries.into_iter().flatten() {
        match parse_entry::<InterfaceAttributes>(value) {
            Ok(a) => interfaces.push(Interface {
                name: name.clone(),
                position: Point2::new(a.x, a.y),
                z: a.z.unwrap_or(0.0),
                width: a.width,
                height: a.height,
                thickness: a.thickness.unwrap_or(0.0),
                kind: a.kind.unwrap_or_else(|| "door".to_string()),
                connects: a.connects,
            }),
            Err(reason) => report.push(ArrangementWarning::InvalidInterface {
                name: name.clone(),
                reason,
            }),
        }
    }

    let (world, door_warnings) = World::build(deck, compartments, interfaces, stations);
    for w in door_warnings {
        report.push(w);
    }

    log::info!(
        "Loaded arrangement: {} compartments, {} interfaces ({} deck exits), {} stations, {} warnings",
        world.compartments.len(),
        world.interfaces.len(),
        world.exit_compartments().len(),
        world.stations.len(),
        report.warnings.len()
    );

    (world, report)
}

fn default_deck() -> Deck {
    Deck::rectangle(defaults::DECK_LENGTH, defaults::DECK_WIDTH)
}

fn load_deck(entry: Option<&Value>, report: &mut LoadReport) -> Deck {
    let Some(value) = entry else {
        report.push(ArrangementWarning::MissingDeck {
            length: defaults::DECK_LENGTH,
            width: defaults::DECK_WIDTH,
        });
        return default_deck();
    };

    let attrs = match parse_entry::<DeckAttributes>(value) {
        Ok(a) => a,
        Err(reason) => {
            report.push(ArrangementWarning::InvalidDeck { reason });
            return default_deck();
        }
    };

    let mut deck = match attrs.outline.as_deref().map(outline_points) {
        Some(points) if points.len() >= 3 => match Deck::from_outline(points) {
            Some(deck) => deck,
            None => default_deck(),
        },
        Some(points) => {
            report.push(ArrangementWarning::DegenerateDeckOutline {
                points: points.len(),
            });
            rectangular_deck(attrs.length, attrs.width, report)
        }
        None => rectangular_deck(attrs.length, attrs.width, report),
    };
    deck.z = attrs.z.unwrap_or(0.0);
    deck.color = attrs.color;
    deck
}

fn rectangular_deck(length: f32, width: f32, report: &mut LoadReport) -> Deck {
    match positive_extents(length, width) {
        Ok(()) => Deck::rectangle(length, width),
        Err(reason) => {
            report.push(ArrangementWarning::InvalidDeck { reason });
            default_deck()
        }
    }
}

fn load_station(name: &str, value: &Value, report: &mut LoadReport) -> Option<MusteringStation> {
    let parsed = parse_entry::<StationAttributes>(value)
        .and_then(|a| positive_extents(a.length, a.width).map(|()| a));
    match parsed {
        Ok(a) => Some(MusteringStation::new(
            name,
            Point2::new(a.x, a.y),
            a.length,
            a.width,
        )),
        Err(reason) => {
            report.push(ArrangementWarning::InvalidStation {
                name: name.to_string(),
                reason,
            });
            None
        }
    }
}

fn load_compartment(name: &str, value: &Value, report: &mut LoadReport) -> Option<Compartment> {
    let attrs = match parse_entry::<CompartmentAttributes>(value)
        .and_then(|a| positive_extents(a.length, a.width).map(|()| a))
    {
        Ok(a) => a,
        Err(reason) => {
            report.push(ArrangementWarning::InvalidCompartment {
                name: name.to_string(),
                reason,
            });
            return None;
        }
    };

    let wants_polygon = attrs
        .shape
        .as_deref()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case("polygon"));
    let polygon = if wants_polygon {
        attrs
            .outline
            .as_deref()
            .map(outline_points)
            .and_then(Shape::polygon)
    } else {
        None
    };
    if wants_polygon && polygon.is_none() {
        report.push(ArrangementWarning::PolygonFallback {
            name: name.to_string(),
        });
    }

    let shape = polygon.unwrap_or_else(|| {
        Shape::rectangle(
            Point2::new(attrs.x, attrs.y),
            attrs.length,
            attrs.width,
            attrs.rotation.unwrap_or(0.0),
        )
    });

    Some(Compartment {
        name: name.to_string(),
        shape,
        height: attrs.height.unwrap_or(0.0),
        z: attrs.z.unwrap_or(0.0),
        color: attrs.color,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_deck_uses_default() {
        let (world, report) = load_world(&json!({ "arrangements": {} }));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, ArrangementWarning::MissingDeck { .. })));
        let b = world.deck.bounds;
        assert!((b.width() - defaults::DECK_LENGTH).abs() < 1e-4);
        assert!((b.height() - defaults::DECK_WIDTH).abs() < 1e-4);
    }

    #[test]
    fn no_stations_synthesizes_default() {
        let (world, report) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": { "length": 10, "width": 10 } }
        }}));
        assert_eq!(world.stations.len(), 1);
        assert_eq!(world.stations[0].name, defaults::STATION_NAME);
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, ArrangementWarning::DefaultStation { .. })));
    }

    #[test]
    fn deck_outline_accepts_pairs_and_objects() {
        let (world, report) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": {
                "length": 1, "width": 1,
                "outline": [[0, 0], {"x": 10, "y": 0}, [10, 5], {"x": "0", "y": "5"}]
            }},
            "musteringStations": { "S": { "attributes": { "x": 8, "y": 2, "length": 2, "width": 2 } } }
        }}));
        assert!(report.is_clean(), "{:?}", report.warnings);
        assert!(matches!(world.deck.shape, Shape::Polygon(_)));
        assert!(world.deck.contains(Point2::new(9.0, 4.0)));
        assert!(!world.deck.contains(Point2::new(11.0, 4.0)));
    }

    #[test]
    fn short_deck_outline_falls_back_to_rectangle() {
        let (world, report) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": { "length": 12, "width": 6, "outline": [[0, 0], [1, 1]] } }
        }}));
        assert!(matches!(world.deck.shape, Shape::Rectangle(_)));
        assert!(report
            .warnings
            .contains(&ArrangementWarning::DegenerateDeckOutline { points: 2 }));
    }

    #[test]
    fn bad_compartment_is_skipped_not_fatal() {
        let (world, report) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": { "length": 20, "width": 20 } },
            "compartments": {
                "good": { "attributes": { "x": 0, "y": 0, "length": 2, "width": 2 } },
                "nolength": { "attributes": { "x": 0, "y": 0, "width": 2 } },
                "zero": { "attributes": { "x": 0, "y": 0, "length": 0, "width": 2 } }
            },
            "musteringStations": { "S": { "attributes": { "x": 8, "y": 8, "length": 2, "width": 2 } } }
        }}));
        assert_eq!(world.compartments.len(), 1);
        assert_eq!(world.compartments[0].name, "good");
        let skipped = report
            .warnings
            .iter()
            .filter(|w| matches!(w, ArrangementWarning::InvalidCompartment { .. }))
            .count();
        assert_eq!(skipped, 2);
    }

    #[test]
    fn polygon_compartment_and_fallback() {
        let (world, report) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": { "length": 20, "width": 20 } },
            "compartments": {
                "tri": { "attributes": {
                    "x": 0, "y": 0, "length": 4, "width": 4, "shape": "polygon",
                    "outline": [[0, 0], [4, 0], [0, 4]]
                }},
                "broken": { "attributes": {
                    "x": -5, "y": -5, "length": 2, "width": 2, "shape": "polygon"
                }}
            },
            "musteringStations": { "S": { "attributes": { "x": 8, "y": 8, "length": 2, "width": 2 } } }
        }}));
        assert!(matches!(world.compartments[0].shape, Shape::Polygon(_)));
        assert!(matches!(world.compartments[1].shape, Shape::Rectangle(_)));
        assert_eq!(
            report.warnings,
            vec![ArrangementWarning::PolygonFallback {
                name: "broken".into()
            }]
        );
    }

    #[test]
    fn legacy_station_compartment_is_not_an_obstacle() {
        let (world, report) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": { "length": 20, "width": 20 } },
            "compartments": {
                "MusteringStation": { "attributes": { "x": 7, "y": 7, "length": 3, "width": 3 } },
                "store": { "attributes": { "x": 0, "y": 0, "length": 2, "width": 2 } }
            }
        }}));
        assert_eq!(world.stations.len(), 1);
        assert_eq!(world.stations[0].center, Point2::new(7.0, 7.0));
        assert_eq!(world.compartments.len(), 1);
        assert_eq!(report.warnings, vec![ArrangementWarning::LegacyStation]);
    }

    #[test]
    fn document_order_is_preserved() {
        let (world, _) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": { "length": 40, "width": 40 } },
            "musteringStations": {
                "zulu": { "attributes": { "x": 5, "y": 0, "length": 2, "width": 2 } },
                "alpha": { "attributes": { "x": -5, "y": 0, "length": 2, "width": 2 } }
            }
        }}));
        assert_eq!(world.stations[0].name, "zulu");
        // Equidistant: first in document order wins
        assert_eq!(world.nearest_station(Point2::new(0.0, 3.0)), Some(0));
    }

    #[test]
    fn interfaces_build_deck_exit_table() {
        let (world, report) = load_world(&json!({ "arrangements": {
            "deck": { "attributes": { "length": 20, "width": 20 } },
            "compartments": {
                "cabin": { "attributes": { "x": 0, "y": 0, "length": 4, "width": 4 } }
            },
            "musteringStations": { "S": { "attributes": { "x": 8, "y": 8, "length": 2, "width": 2 } } },
            "interfaces": {
                "cabin-door": { "attributes": {
                    "x": 2, "y": 0, "width": "0.9", "height": 2.1, "type": "door",
                    "connects": ["cabin", "deck"]
                }},
                "hatch": { "attributes": { "x": 0, "y": 2, "height": 1 } }
            }
        }}));
        assert_eq!(world.interfaces.len(), 1);
        let exit = world.deck_exit_for(0).unwrap();
        assert_eq!(exit.name, "cabin-door");
        assert!((exit.width - 0.9).abs() < 1e-6);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            report.warnings[0],
            ArrangementWarning::InvalidInterface { .. }
        ));
    }

    #[test]
    fn text_loader_reports_errors() {
        assert!(matches!(
            load_world_from_str("{ not json"),
            Err(ArrangementError::Json(_))
        ));
        assert!(matches!(
            load_world_from_str("[1, 2]"),
            Err(ArrangementError::NotAnObject)
        ));
        assert!(load_world_from_str("{}").is_ok());
    }
}
