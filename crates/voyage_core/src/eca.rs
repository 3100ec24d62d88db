//! Route segmentation by emission control area.
//!
//! Segments are contiguous, ordered by progress, and their distances sum to
//! the route distance.

use serde::{Deserialize, Serialize};

use crate::{ComplianceData, RouteData, SwitchAction, SwitchingPoint, ZoneName};

const EPS_NM: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub id: String,
    pub from: String,
    pub to: String,
    pub start_nm: f64,
    pub distance_nm: f64,
    pub in_eca: bool,
    pub zone: Option<ZoneName>,
}

impl RouteSegment {
    pub fn end_nm(&self) -> f64 {
        self.start_nm + self.distance_nm
    }
}

/// Splits `route` into in-zone and out-of-zone segments.
///
/// With explicit switching points the segments follow them exactly. With
/// only an aggregate in-zone distance, the zone distance is placed at the
/// end of the route; this is an approximation, not the real crossing
/// geometry.
pub fn segment_route(route: &RouteData, compliance: Option<&ComplianceData>) -> Vec<RouteSegment> {
    let total = route.distance_nm.max(0.0);
    let origin = route.origin.to_string();
    let destination = route.destination.to_string();

    let crosses_zone = compliance.is_some_and(|c| {
        !c.switching_points.is_empty() || c.total_eca_distance_nm > EPS_NM
    });
    let pieces = match compliance {
        Some(c) if total > EPS_NM && crosses_zone => {
            if c.switching_points.is_empty() {
                aggregate_pieces(c, total, &origin, &destination)
            } else {
                explicit_pieces(&c.switching_points, total, &origin, &destination)
            }
        }
        _ => vec![Piece::open(0.0, total, origin, destination)],
    };

    number(merge(pieces))
}

struct Piece {
    from: String,
    to: String,
    start: f64,
    end: f64,
    in_eca: bool,
    zone: Option<ZoneName>,
}

impl Piece {
    fn open(start: f64, end: f64, from: String, to: String) -> Self {
        Self {
            from,
            to,
            start,
            end,
            in_eca: false,
            zone: None,
        }
    }
}

fn switch_label(point: &SwitchingPoint) -> String {
    let verb = match point.action {
        SwitchAction::EnterEca => "enter",
        SwitchAction::ExitEca => "exit",
    };
    format!("{verb} {}", point.zone)
}

fn explicit_pieces(
    points: &[SwitchingPoint],
    total: f64,
    origin: &str,
    destination: &str,
) -> Vec<Piece> {
    let mut sorted: Vec<&SwitchingPoint> = points.iter().collect();
    sorted.sort_by(|a, b| a.distance_from_origin_nm.total_cmp(&b.distance_from_origin_nm));

    // State after the first point is whatever it transitions into; before it,
    // the opposite. Every later point flips the state.
    let first = sorted[0];
    let mut in_eca = first.action != SwitchAction::EnterEca;
    let mut zone = in_eca.then(|| first.zone.clone());
    let mut start = 0.0;
    let mut from = origin.to_string();
    let mut pieces = Vec::with_capacity(sorted.len() + 1);

    for point in sorted {
        let at = point.distance_from_origin_nm.clamp(0.0, total).max(start);
        let to = switch_label(point);
        pieces.push(Piece {
            from: std::mem::replace(&mut from, to.clone()),
            to,
            start,
            end: at,
            in_eca,
            zone: zone.take(),
        });
        in_eca = !in_eca;
        zone = in_eca.then(|| point.zone.clone());
        start = at;
    }
    pieces.push(Piece {
        from,
        to: destination.to_string(),
        start,
        end: total,
        in_eca,
        zone,
    });
    pieces
}

fn aggregate_pieces(
    compliance: &ComplianceData,
    total: f64,
    origin: &str,
    destination: &str,
) -> Vec<Piece> {
    let eca = compliance.total_eca_distance_nm.clamp(0.0, total);
    let zone = compliance.zones_crossed.first().cloned();
    let boundary = total - eca;
    let label = "ECA boundary (approx.)".to_string();
    vec![
        Piece::open(0.0, boundary, origin.to_string(), label.clone()),
        Piece {
            from: label,
            to: destination.to_string(),
            start: boundary,
            end: total,
            in_eca: true,
            zone,
        },
    ]
}

/// Drops zero-length pieces and joins neighbours with the same zone state.
fn merge(pieces: Vec<Piece>) -> Vec<Piece> {
    let mut merged: Vec<Piece> = Vec::with_capacity(pieces.len());
    let only_piece_fallback = pieces.first().map(|p| Piece {
        from: p.from.clone(),
        to: pieces.last().map_or_else(|| p.to.clone(), |l| l.to.clone()),
        start: 0.0,
        end: 0.0,
        in_eca: p.in_eca,
        zone: p.zone.clone(),
    });
    for piece in pieces {
        if piece.end - piece.start <= EPS_NM {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.in_eca == piece.in_eca => {
                last.end = piece.end;
                last.to = piece.to;
                if last.zone.is_none() {
                    last.zone = piece.zone;
                }
            }
            _ => merged.push(piece),
        }
    }
    if merged.is_empty() {
        // Zero-distance route: keep a single zero-length segment.
        merged.extend(only_piece_fallback);
    }
    merged
}

fn number(pieces: Vec<Piece>) -> Vec<RouteSegment> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| RouteSegment {
            id: format!("seg_{:02}", i + 1),
            from: piece.from,
            to: piece.to,
            start_nm: piece.start,
            distance_nm: piece.end - piece.start,
            in_eca: piece.in_eca,
            zone: piece.zone,
        })
        .collect()
}
