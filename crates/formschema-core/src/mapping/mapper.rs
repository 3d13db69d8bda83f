//! Repeatable section mapper
//!
//! Spreads an ordered list of entries over the primary slots of a mapping
//! and, past `max_entries`, over its supplemental pattern. Entries that cannot
//! be placed are reported instead of silently discarded.

use super::field::RepeatableFieldMapping;
use crate::pattern::{FieldPattern, InvalidPattern, physical_index};
use crate::value::{ConversionError, Entry, FieldValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry as Slot;
use thiserror::Error;
use tracing::{debug, warn};

/// Why an entry was not placed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DropReason {
    #[error("entry exceeds capacity of {max_entries} and no supplemental pattern is configured")]
    OverCapacity { max_entries: usize },

    #[error("entry has no '{0}' attribute")]
    MissingAttribute(String),

    #[error(transparent)]
    Unconvertible(#[from] ConversionError),

    #[error("physical field '{field}' already holds an earlier entry")]
    SlotTaken { field: String },
}

/// An entry that was skipped, with its position in the input list
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Entry {index} dropped for '{field_name}': {reason}")]
pub struct EntryDropped {
    pub index: usize,
    pub field_name: String,
    pub reason: DropReason,
}

impl Serialize for EntryDropped {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("EntryDropped", 3)?;
        state.serialize_field("index", &self.index)?;
        state.serialize_field("field_name", &self.field_name)?;
        state.serialize_field("reason", &self.reason.to_string())?;
        state.end()
    }
}

/// Result of mapping one repeatable attribute
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionMapping {
    /// Physical field name to value
    pub fields: BTreeMap<String, FieldValue>,

    /// Entries that could not be placed
    pub dropped: Vec<EntryDropped>,
}

impl SectionMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every entry was placed
    pub fn is_complete(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Physical field names with rendered values
    pub fn rendered(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.render()))
            .collect()
    }
}

/// Map entries onto the physical fields described by `mapping`
///
/// Entry `i` goes to the primary pattern while `i < max_entries`, otherwise to
/// the supplemental pattern at overflow position `i - max_entries`. A physical
/// name already filled by an earlier entry is never overwritten. A malformed
/// pattern fails the whole call; everything else is reported per entry in
/// [`SectionMapping::dropped`].
pub fn map_section(
    entries: &[Entry],
    mapping: &RepeatableFieldMapping,
) -> Result<SectionMapping, InvalidPattern> {
    let primary = FieldPattern::parse(&mapping.pdf_field_pattern)?;
    let supplemental = mapping
        .supplemental_page_pattern
        .as_deref()
        .map(FieldPattern::parse)
        .transpose()?;
    let overrides = mapping.field_indices.as_deref();

    let mut result = SectionMapping::new();

    for (index, entry) in entries.iter().enumerate() {
        let target = if index < mapping.max_entries {
            Some(primary.render(physical_index(index, overrides)))
        } else {
            supplemental
                .as_ref()
                .map(|p| p.render(index - mapping.max_entries + 1))
        };

        let placed = target
            .ok_or(DropReason::OverCapacity {
                max_entries: mapping.max_entries,
            })
            .and_then(|name| {
                let value = entry
                    .get(&mapping.field_name)
                    .cloned()
                    .ok_or_else(|| DropReason::MissingAttribute(mapping.field_name.clone()))?;
                Ok((name, value.coerce(mapping.field_type)?))
            })
            .and_then(|(name, value)| match result.fields.entry(name) {
                Slot::Vacant(slot) => {
                    debug!(field = %slot.key(), index, "Mapped repeatable entry");
                    slot.insert(value);
                    Ok(())
                }
                Slot::Occupied(slot) => Err(DropReason::SlotTaken {
                    field: slot.key().clone(),
                }),
            });

        if let Err(reason) = placed {
            let dropped = EntryDropped {
                index,
                field_name: mapping.field_name.clone(),
                reason,
            };
            warn!("{}", dropped);
            result.dropped.push(dropped);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn addresses(streets: &[&str]) -> Vec<Entry> {
        streets
            .iter()
            .map(|s| Entry::from([("street".to_string(), FieldValue::text(*s))]))
            .collect()
    }

    fn street_mapping() -> RepeatableFieldMapping {
        RepeatableFieldMapping::new("street", "Pt4Line{n}a_StreetAddress[0]", FieldType::Text, 3)
    }

    #[test]
    fn test_three_addresses_fill_primary_slots() {
        let entries = addresses(&["123 Main St", "456 Oak Ave", "789 Pine Rd"]);
        let result = map_section(&entries, &street_mapping()).unwrap();

        assert!(result.is_complete());
        assert_eq!(
            result.rendered(),
            BTreeMap::from([
                ("Pt4Line1a_StreetAddress[0]".to_string(), "123 Main St".to_string()),
                ("Pt4Line2a_StreetAddress[0]".to_string(), "456 Oak Ave".to_string()),
                ("Pt4Line3a_StreetAddress[0]".to_string(), "789 Pine Rd".to_string()),
            ])
        );
    }

    #[test]
    fn test_overflow_without_supplemental_is_reported() {
        let entries = addresses(&["1 A St", "2 B St", "3 C St", "4 D St"]);
        let result = map_section(&entries, &street_mapping()).unwrap();

        assert_eq!(result.fields.len(), 3);
        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].index, 3);
        assert_eq!(
            result.dropped[0].reason,
            DropReason::OverCapacity { max_entries: 3 }
        );
    }

    #[test]
    fn test_overflow_goes_to_supplemental_one_based() {
        let mapping = street_mapping()
            .with_field_indices(vec![2, 4, 6])
            .with_supplemental("Supp_Street{index}[0]");
        let entries = addresses(&["a", "b", "c", "d", "e"]);
        let result = map_section(&entries, &mapping).unwrap();

        assert!(result.is_complete());
        let names: Vec<&str> = result.fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Pt4Line2a_StreetAddress[0]",
                "Pt4Line4a_StreetAddress[0]",
                "Pt4Line6a_StreetAddress[0]",
                "Supp_Street1[0]",
                "Supp_Street2[0]",
            ]
        );
        assert_eq!(result.fields["Supp_Street2[0]"], FieldValue::text("e"));
    }

    #[test]
    fn test_missing_attribute_and_bad_value_are_dropped() {
        let mapping =
            RepeatableFieldMapping::new("start", "Pt3Line{index}b_StartDate[0]", FieldType::Date, 3);
        let entries = vec![
            Entry::from([("start".to_string(), FieldValue::text("01/15/2020"))]),
            Entry::from([("end".to_string(), FieldValue::text("01/15/2021"))]),
            Entry::from([("start".to_string(), FieldValue::Boolean(true))]),
        ];

        let result = map_section(&entries, &mapping).unwrap();
        assert_eq!(result.fields.len(), 1);
        assert_eq!(
            result.rendered()["Pt3Line1b_StartDate[0]"],
            "01/15/2020".to_string()
        );

        assert_eq!(result.dropped.len(), 2);
        assert_eq!(
            result.dropped[0].reason,
            DropReason::MissingAttribute("start".to_string())
        );
        assert!(matches!(
            result.dropped[1].reason,
            DropReason::Unconvertible(_)
        ));
    }

    #[test]
    fn test_colliding_override_never_overwrites() {
        // Slot 0 -> Line3, slot 1 -> Line2, slot 2 falls back to Line3 again
        let mapping = RepeatableFieldMapping::new("street", "Line{index}", FieldType::Text, 3)
            .with_field_indices(vec![3]);
        let entries = addresses(&["A", "B", "C"]);

        let result = map_section(&entries, &mapping).unwrap();
        assert_eq!(result.fields["Line3"], FieldValue::text("A"));
        assert_eq!(result.fields["Line2"], FieldValue::text("B"));
        assert_eq!(result.fields.len(), 2);

        assert_eq!(result.dropped.len(), 1);
        assert_eq!(result.dropped[0].index, 2);
        assert_eq!(
            result.dropped[0].reason,
            DropReason::SlotTaken {
                field: "Line3".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_pattern_fails_whole_call() {
        let mapping = RepeatableFieldMapping::new("street", "StreetAddress[0]", FieldType::Text, 3);
        let err = map_section(&addresses(&["a"]), &mapping).unwrap_err();
        assert_eq!(err.found, 0);
    }

    #[test]
    fn test_empty_entries() {
        let result = map_section(&[], &street_mapping()).unwrap();
        assert!(result.fields.is_empty());
        assert!(result.is_complete());
    }
}
