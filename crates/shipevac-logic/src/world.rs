//! Static deck model: deck boundary, compartments, doors, mustering stations.
//!
//! A `World` is built once per arrangement load and is read-only while a
//! simulation runs. Reposition edits produce a new `World` rather than
//! mutating shapes in place.

use std::collections::HashMap;

use serde::Serialize;

use crate::arrangement::ArrangementWarning;
use crate::constants::{door, station};
use crate::geometry::{Aabb, Point2};
use crate::shape::Shape;

/// The traversable deck region.
#[derive(Debug, Clone, Serialize)]
pub struct Deck {
    pub shape: Shape,
    /// Axis-aligned window used for spawn sampling.
    pub bounds: Aabb,
    /// Deck level, carried through to trajectory output.
    pub z: f32,
    pub color: Option<String>,
}

impl Deck {
    /// Rectangular deck centered on the origin.
    pub fn rectangle(length: f32, width: f32) -> Self {
        Self::from_shape(Shape::rectangle(Point2::ORIGIN, length, width, 0.0))
    }

    /// Polygonal deck. `None` if the outline has fewer than 3 points.
    pub fn from_outline(outline: Vec<Point2>) -> Option<Self> {
        Shape::polygon(outline).map(Self::from_shape)
    }

    pub fn from_shape(shape: Shape) -> Self {
        let bounds = shape.aabb();
        Self {
            shape,
            bounds,
            z: 0.0,
            color: None,
        }
    }

    pub fn contains(&self, p: Point2) -> bool {
        self.shape.contains_point(p)
    }

    /// Inside the deck and at least `margin` from its boundary.
    pub fn contains_with_margin(&self, p: Point2, margin: f32) -> bool {
        self.shape.contains_with_clearance(p, margin)
    }
}

/// An obstacle region. Agents may only cross its walls at a deck-exit door.
#[derive(Debug, Clone, Serialize)]
pub struct Compartment {
    pub name: String,
    pub shape: Shape,
    /// Cosmetic; movement is planar.
    pub height: f32,
    pub z: f32,
    pub color: Option<String>,
}

impl Compartment {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            height: 0.0,
            z: 0.0,
            color: None,
        }
    }
}

/// A named connector (door) between endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct Interface {
    pub name: String,
    pub position: Point2,
    pub z: f32,
    pub width: f32,
    pub height: f32,
    pub thickness: f32,
    /// `door` for ordinary doors; other kinds are carried but not special-cased.
    pub kind: String,
    /// Compartment names and/or the deck endpoint.
    pub connects: Vec<String>,
}

impl Interface {
    pub fn door(name: impl Into<String>, position: Point2, width: f32, height: f32) -> Self {
        Self {
            name: name.into(),
            position,
            z: 0.0,
            width,
            height,
            thickness: 0.0,
            kind: "door".to_string(),
            connects: Vec::new(),
        }
    }

    /// Builder-style endpoint list.
    pub fn connecting<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.connects = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_deck_exit(&self) -> bool {
        self.connects
            .iter()
            .any(|e| e.trim().eq_ignore_ascii_case(door::DECK_ENDPOINT))
    }

    /// Radius within which an agent may pass this door's wall.
    pub fn influence_radius(&self) -> f32 {
        (door::INFLUENCE_FACTOR * self.width.max(self.height)).max(door::MIN_INFLUENCE_RADIUS)
    }
}

/// Destination zone. `inner` is smaller than `shape` so arrival does not
/// flicker at the visual edge.
#[derive(Debug, Clone, Serialize)]
pub struct MusteringStation {
    pub name: String,
    pub center: Point2,
    pub length: f32,
    pub width: f32,
    pub shape: Shape,
    pub inner: Shape,
}

impl MusteringStation {
    pub fn new(name: impl Into<String>, center: Point2, length: f32, width: f32) -> Self {
        let inner_length = (length - station::INNER_SHRINK).max(length / 2.0);
        let inner_width = (width - station::INNER_SHRINK).max(width / 2.0);
        Self {
            name: name.into(),
            center,
            length,
            width,
            shape: Shape::rectangle(center, length, width, 0.0),
            inner: Shape::rectangle(center, inner_length, inner_width, 0.0),
        }
    }

    /// The same station re-centered; both shapes are rebuilt.
    pub fn moved_to(&self, center: Point2) -> Self {
        Self::new(self.name.clone(), center, self.length, self.width)
    }
}

/// Complete static arrangement for one simulation run.
#[derive(Debug, Clone)]
pub struct World {
    pub deck: Deck,
    pub compartments: Vec<Compartment>,
    pub interfaces: Vec<Interface>,
    pub stations: Vec<MusteringStation>,
    /// compartment index → interface index of its deck exit
    deck_exits: HashMap<usize, usize>,
}

impl World {
    /// Assemble a world, logging any door-table problems.
    pub fn new(
        deck: Deck,
        compartments: Vec<Compartment>,
        interfaces: Vec<Interface>,
        stations: Vec<MusteringStation>,
    ) -> Self {
        let (world, warnings) = Self::build(deck, compartments, interfaces, stations);
        for w in &warnings {
            log::warn!("{w}");
        }
        world
    }

    /// Assemble a world and return door-table problems to the caller.
    pub fn build(
        deck: Deck,
        compartments: Vec<Compartment>,
        interfaces: Vec<Interface>,
        stations: Vec<MusteringStation>,
    ) -> (Self, Vec<ArrangementWarning>) {
        let (deck_exits, warnings) = deck_exit_table(&compartments, &interfaces, &stations);
        (
            Self {
                deck,
                compartments,
                interfaces,
                stations,
                deck_exits,
            },
            warnings,
        )
    }

    /// First compartment whose shape contains `p`.
    pub fn compartment_index_at(&self, p: Point2) -> Option<usize> {
        self.compartments
            .iter()
            .position(|c| c.shape.contains_point(p))
    }

    pub fn deck_exit_index(&self, compartment: usize) -> Option<usize> {
        self.deck_exits.get(&compartment).copied()
    }

    pub fn deck_exit_for(&self, compartment: usize) -> Option<&Interface> {
        self.deck_exit_index(compartment)
            .and_then(|i| self.interfaces.get(i))
    }

    /// Indices of compartments that have a deck exit, in compartment order.
    pub fn exit_compartments(&self) -> Vec<usize> {
        (0..self.compartments.len())
            .filter(|i| self.deck_exits.contains_key(i))
            .collect()
    }

    /// Station whose center is closest to `p`; ties go to the lowest index.
    pub fn nearest_station(&self, p: Point2) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, s) in self.stations.iter().enumerate() {
            let d = s.center.distance_squared(&p);
            match best {
                Some((_, best_d)) if d >= best_d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }

    pub fn station(&self, index: usize) -> Option<&MusteringStation> {
        self.stations.get(index)
    }

    /// A copy of this world with one station re-centered. Out-of-range
    /// indices return an unchanged copy.
    pub fn with_station_moved(&self, index: usize, center: Point2) -> World {
        let mut world = self.clone();
        if let Some(s) = world.stations.get_mut(index) {
            *s = s.moved_to(center);
        }
        world
    }
}

/// Map each compartment to the first deck-exit interface naming it.
fn deck_exit_table(
    compartments: &[Compartment],
    interfaces: &[Interface],
    stations: &[MusteringStation],
) -> (HashMap<usize, usize>, Vec<ArrangementWarning>) {
    let by_name: HashMap<&str, usize> = compartments
        .iter()
        .enumerate()
        .map(|(i, c)| (c.name.as_str(), i))
        .collect();

    let mut table: HashMap<usize, usize> = HashMap::new();
    let mut warnings = Vec::new();

    for (ii, iface) in interfaces.iter().enumerate() {
        if !iface.is_deck_exit() {
            continue;
        }
        for endpoint in &iface.connects {
            let endpoint = endpoint.trim();
            if endpoint.eq_ignore_ascii_case(door::DECK_ENDPOINT) {
                continue;
            }
            let Some(&ci) = by_name.get(endpoint) else {
                if !stations.iter().any(|s| s.name == endpoint) {
                    warnings.push(ArrangementWarning::UnknownEndpoint {
                        interface: iface.name.clone(),
                        endpoint: endpoint.to_string(),
                    });
                }
                continue;
            };
            if let Some(&kept) = table.get(&ci) {
                warnings.push(ArrangementWarning::DuplicateDeckExit {
                    compartment: compartments[ci].name.clone(),
                    kept: interfaces[kept].name.clone(),
                    ignored: iface.name.clone(),
                });
                continue;
            }
            table.insert(ci, ii);
        }
    }

    (table, warnings)
}
