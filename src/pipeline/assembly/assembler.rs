use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::AssemblyError;
use crate::models::{
    EntityDescriptor, EntitySegment, EntityType, MarkerOccurrence, MessageSegment, ResolvedMap,
};

/// A marker whose tag disagrees with its descriptor's type. The marker's
/// type is used for the segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeMismatch {
    pub id: String,
    pub marker_type: EntityType,
    pub descriptor_type: EntityType,
}

/// Non-fatal inconsistencies between markers, descriptors and records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyDiagnostics {
    pub type_mismatches: Vec<TypeMismatch>,
    /// Marker ids with no descriptor (rendered without `resolved`).
    pub missing_descriptors: Vec<String>,
    /// Descriptor ids with no resolution record.
    pub missing_records: Vec<String>,
    /// Descriptor ids no marker refers to.
    pub unreferenced_descriptors: Vec<String>,
}

impl AssemblyDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.type_mismatches.is_empty()
            && self.missing_descriptors.is_empty()
            && self.missing_records.is_empty()
            && self.unreferenced_descriptors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembly {
    pub segments: Vec<MessageSegment>,
    pub diagnostics: AssemblyDiagnostics,
}

/// Merge text, descriptors, occurrences and records into ordered segments.
///
/// Concatenating the segments' visible content reproduces `text` with the
/// marker delimiters removed. Fails only when `occurrences` is not sorted,
/// overlaps, or points outside `text`.
pub fn assemble(
    text: &str,
    descriptors: &[EntityDescriptor],
    occurrences: &[MarkerOccurrence],
    resolved: &ResolvedMap,
) -> Result<Vec<MessageSegment>, AssemblyError> {
    assemble_with_diagnostics(text, descriptors, occurrences, resolved).map(|a| a.segments)
}

pub fn assemble_with_diagnostics(
    text: &str,
    descriptors: &[EntityDescriptor],
    occurrences: &[MarkerOccurrence],
    resolved: &ResolvedMap,
) -> Result<Assembly, AssemblyError> {
    validate_occurrences(text, occurrences)?;

    let mut by_id: HashMap<&str, &EntityDescriptor> = HashMap::with_capacity(descriptors.len());
    for descriptor in descriptors {
        by_id.entry(descriptor.id.as_str()).or_insert(descriptor);
    }

    let mut diagnostics = AssemblyDiagnostics::default();
    let mut reported: HashSet<&str> = HashSet::new();
    let mut segments = Vec::with_capacity(occurrences.len() * 2 + 1);
    let mut cursor = 0;

    for occurrence in occurrences {
        if occurrence.start_offset > cursor {
            segments.push(MessageSegment::text(&text[cursor..occurrence.start_offset]));
        }

        let id = occurrence.id.as_str();
        let first_sighting = reported.insert(id);
        let descriptor = by_id.get(id).copied();

        match descriptor {
            Some(d) if d.entity_type() != occurrence.entity_type && first_sighting => {
                tracing::warn!(
                    %id,
                    marker_type = %occurrence.entity_type,
                    descriptor_type = %d.entity_type(),
                    "Marker type disagrees with descriptor"
                );
                diagnostics.type_mismatches.push(TypeMismatch {
                    id: id.to_string(),
                    marker_type: occurrence.entity_type,
                    descriptor_type: d.entity_type(),
                });
            }
            None if first_sighting => {
                tracing::debug!(%id, "Marker without descriptor");
                diagnostics.missing_descriptors.push(id.to_string());
            }
            _ => {}
        }

        let record = descriptor.and_then(|_| resolved.get(id));
        if descriptor.is_some() && record.is_none() && first_sighting {
            diagnostics.missing_records.push(id.to_string());
        }

        segments.push(MessageSegment::entity(
            occurrence.entity_type,
            EntitySegment {
                id: occurrence.id.clone(),
                display_text: occurrence.display_text.clone(),
                resolved: record.cloned(),
            },
        ));
        cursor = occurrence.end_offset;
    }

    if cursor < text.len() {
        segments.push(MessageSegment::text(&text[cursor..]));
    }

    let mut seen_descriptor = HashSet::new();
    diagnostics.unreferenced_descriptors = descriptors
        .iter()
        .filter(|d| seen_descriptor.insert(d.id.as_str()) && !reported.contains(d.id.as_str()))
        .map(|d| d.id.clone())
        .collect();

    Ok(Assembly {
        segments,
        diagnostics,
    })
}

fn validate_occurrences(text: &str, occurrences: &[MarkerOccurrence]) -> Result<(), AssemblyError> {
    let mut previous_end = 0;
    for o in occurrences {
        if o.start_offset > o.end_offset {
            return Err(AssemblyError::InvertedSpan {
                id: o.id.clone(),
                start: o.start_offset,
                end: o.end_offset,
            });
        }
        if o.end_offset > text.len() {
            return Err(AssemblyError::OutOfBounds {
                id: o.id.clone(),
                start: o.start_offset,
                end: o.end_offset,
                len: text.len(),
            });
        }
        if o.start_offset < previous_end {
            return Err(AssemblyError::Overlap {
                id: o.id.clone(),
                start: o.start_offset,
                previous_end,
            });
        }
        for offset in [o.start_offset, o.end_offset] {
            if !text.is_char_boundary(offset) {
                return Err(AssemblyError::NotCharBoundary {
                    id: o.id.clone(),
                    offset,
                });
            }
        }
        previous_end = o.end_offset;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CacheStatus, LodgingContext, PlaceContext, PlaceDetails, ResolvedPayload, ResolvedRecord,
    };
    use crate::pipeline::markup::scan_markers;

    fn found(id: &str, name: &str) -> ResolvedRecord {
        ResolvedRecord::found(
            id,
            ResolvedPayload::Place(PlaceDetails {
                name: name.into(),
                ..Default::default()
            }),
            5,
            CacheStatus::Miss,
        )
    }

    fn place(id: &str, name: &str) -> EntityDescriptor {
        EntityDescriptor::place(id, name, PlaceContext::default())
    }

    fn visible(segments: &[MessageSegment]) -> String {
        segments.iter().map(MessageSegment::display_content).collect()
    }

    fn run(text: &str, descriptors: &[EntityDescriptor], resolved: &ResolvedMap) -> Assembly {
        assemble_with_diagnostics(text, descriptors, &scan_markers(text), resolved).unwrap()
    }

    #[test]
    fn found_place_between_text() {
        let text = r#"Visit <place id="1">the tower</place> at noon."#;
        let resolved = ResolvedMap::from([("1".to_string(), found("1", "Eiffel Tower"))]);
        let segments = run(text, &[place("1", "Eiffel Tower")], &resolved).segments;

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], MessageSegment::text("Visit "));
        let MessageSegment::Place(entity) = &segments[1] else {
            panic!("expected place segment, got {:?}", segments[1]);
        };
        assert_eq!(entity.id, "1");
        assert_eq!(entity.display_text, "the tower");
        assert!(entity.resolved.as_ref().unwrap().found);
        assert_eq!(segments[2], MessageSegment::text(" at noon."));
    }

    #[test]
    fn failed_lookup_keeps_shape() {
        let text = r#"Visit <place id="1">the tower</place> at noon."#;
        let record = ResolvedRecord::not_found("1", Some("boom".into()), 3, CacheStatus::Miss);
        let resolved = ResolvedMap::from([("1".to_string(), record)]);
        let segments = run(text, &[place("1", "Eiffel Tower")], &resolved).segments;

        assert_eq!(segments.len(), 3);
        let resolved = segments[1].as_entity().unwrap().resolved.as_ref().unwrap();
        assert!(!resolved.found);
    }

    #[test]
    fn marker_without_descriptor_has_no_resolved() {
        let text = r#"See <place id="2">the museum</place>."#;
        let resolved = ResolvedMap::from([("2".to_string(), found("2", "Stray"))]);
        let assembly = run(text, &[], &resolved);

        let entity = assembly.segments[1].as_entity().unwrap();
        assert_eq!(entity.id, "2");
        assert!(entity.resolved.is_none());
        assert_eq!(assembly.diagnostics.missing_descriptors, vec!["2".to_string()]);
    }

    #[test]
    fn descriptor_without_record_has_no_resolved() {
        let text = r#"See <place id="3">it</place>"#;
        let assembly = run(text, &[place("3", "It")], &ResolvedMap::new());
        assert!(assembly.segments[1].as_entity().unwrap().resolved.is_none());
        assert_eq!(assembly.diagnostics.missing_records, vec!["3".to_string()]);
    }

    #[test]
    fn repeated_id_shares_the_record() {
        let text = r#"<place id="1">Louvre</place> then back to <place id="1">the Louvre</place>"#;
        let resolved = ResolvedMap::from([("1".to_string(), found("1", "Louvre"))]);
        let segments = run(text, &[place("1", "Louvre")], &resolved).segments;

        let entities: Vec<_> = segments.iter().filter_map(MessageSegment::as_entity).collect();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].resolved, entities[1].resolved);
        assert_eq!(entities[1].display_text, "the Louvre");
    }

    #[test]
    fn marker_type_wins_on_mismatch() {
        let text = r#"Sleep at <place id="h">Hotel Plaza</place>."#;
        let descriptors = [EntityDescriptor::lodging("h", "Hotel Plaza", LodgingContext::default())];
        let assembly = run(text, &descriptors, &ResolvedMap::new());

        assert_eq!(assembly.segments[1].entity_type(), Some(EntityType::Place));
        assert_eq!(
            assembly.diagnostics.type_mismatches,
            vec![TypeMismatch {
                id: "h".into(),
                marker_type: EntityType::Place,
                descriptor_type: EntityType::Lodging,
            }]
        );
    }

    #[test]
    fn unreferenced_descriptors_are_reported() {
        let text = r#"Only <place id="a">A</place>."#;
        let assembly = run(text, &[place("a", "A"), place("b", "B")], &ResolvedMap::new());
        assert_eq!(assembly.diagnostics.unreferenced_descriptors, vec!["b".to_string()]);
        assert_eq!(assembly.segments.len(), 3);
    }

    #[test]
    fn visible_text_round_trips() {
        let cases = [
            "",
            "plain text only",
            r#"<place id="1">Start</place> middle <hotel id="2" dates="a:b">Hôtel</hotel>"#,
            "Line one\n\n\n<flight id=\"f\" route=\"JFK-CDG\">flight</flight>\n<place>broken</place> end",
            r#"<place id="1">A</place><place id="2">B</place>"#,
        ];
        for text in cases {
            let assembly = run(text, &[], &ResolvedMap::new());
            let stripped = strip_markers(text);
            assert_eq!(visible(&assembly.segments), stripped, "round trip failed for {text:?}");
            assert!(
                assembly.segments.iter().all(|s| !s.display_content().is_empty() || !s.is_text()),
                "empty text segment in {text:?}"
            );
        }
    }

    /// Remove the delimiters of every scanned marker, keeping display text.
    fn strip_markers(text: &str) -> String {
        let mut out = String::new();
        let mut cursor = 0;
        for m in scan_markers(text) {
            out.push_str(&text[cursor..m.start_offset]);
            out.push_str(&m.display_text);
            cursor = m.end_offset;
        }
        out.push_str(&text[cursor..]);
        out
    }

    #[test]
    fn empty_text_gives_no_segments() {
        let segments = assemble("", &[], &[], &ResolvedMap::new()).unwrap();
        assert!(segments.is_empty());
    }

    fn occurrence(id: &str, start: usize, end: usize) -> MarkerOccurrence {
        MarkerOccurrence {
            id: id.into(),
            entity_type: EntityType::Place,
            tag: "place".into(),
            display_text: "x".into(),
            start_offset: start,
            end_offset: end,
            attributes: Default::default(),
        }
    }

    #[test]
    fn contract_violations_are_errors() {
        let text = "0123456789";
        let map = ResolvedMap::new();

        let overlap = [occurrence("a", 0, 5), occurrence("b", 4, 8)];
        assert!(matches!(
            assemble(text, &[], &overlap, &map),
            Err(AssemblyError::Overlap { .. })
        ));

        let out_of_order = [occurrence("a", 6, 8), occurrence("b", 0, 2)];
        assert!(matches!(
            assemble(text, &[], &out_of_order, &map),
            Err(AssemblyError::Overlap { .. })
        ));

        let out_of_bounds = [occurrence("a", 5, 20)];
        assert!(matches!(
            assemble(text, &[], &out_of_bounds, &map),
            Err(AssemblyError::OutOfBounds { .. })
        ));

        let inverted = [occurrence("a", 5, 2)];
        assert!(matches!(
            assemble(text, &[], &inverted, &map),
            Err(AssemblyError::InvertedSpan { .. })
        ));

        let split_char = [occurrence("a", 1, 2)];
        assert!(matches!(
            assemble("é!", &[], &split_char, &map),
            Err(AssemblyError::NotCharBoundary { .. })
        ));
    }
}
