//! # Request Form Fields
//!
//! Field catalog of the DNA sample storage request form, one entry per input.
//!
//! ## Sections
//! - Requester: who is asking, first name + last name + email are required
//! - Request: how many tissue/aliquot sample IDs are needed
//! - Sample Metadata: taxonomy, collection event, voucher
//! - Permits: sampling/Nagoya flags, each with an optional file
//! - Shipping: shipment date and tracking number
//!
//! Latitude/longitude stay text so the decimals go out exactly as typed.
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    Url,
    Number,
    Date,
    Checkbox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Requester,
    Request,
    SampleMetadata,
    Permits,
    Shipping,
}

#[derive(Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub section: Section,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    section: Section,
) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        section,
    }
}

use FieldKind::*;
use Section::*;

pub const FIELDS: &[FieldSpec] = &[
    field("first_name", "First Name", Text, Requester),
    field("last_name", "Last Name", Text, Requester),
    field("contact_person_email", "Email Address", Email, Requester),
    field("requester_institution", "Institution", Text, Requester),
    field("institution_location", "Institution Location", Text, Requester),
    field("tissue_sample_quantity", "Tissue Sample IDs Quantity Required", Number, Request),
    field("aliquot_sample_quantity", "Aliquot Sample IDs Quantity Required", Number, Request),
    field("original_sample_id", "Original Sample ID", Text, SampleMetadata),
    field("taxon_group", "Taxon Group", Text, SampleMetadata),
    field("family", "Family", Text, SampleMetadata),
    field("genus", "Genus", Text, SampleMetadata),
    field("scientific_name", "Scientific Name", Text, SampleMetadata),
    field("interspecific_epithet", "Interspecific Epithet", Text, SampleMetadata),
    field("collector_sample_id", "Collector Sample Number", Text, SampleMetadata),
    field("collector", "Collector", Text, SampleMetadata),
    field("collector_affiliation", "Collector Affiliation", Text, SampleMetadata),
    field("date_of_collection", "Date of Collection", Date, SampleMetadata),
    field("collection_location", "Collection Location", Text, SampleMetadata),
    field("decimal_latitude", "Decimal Latitude", Text, SampleMetadata),
    field("decimal_longitude", "Decimal Longitude", Text, SampleMetadata),
    field("habitat", "Habitat", Text, SampleMetadata),
    field("elevation", "Elevation (m)", Number, SampleMetadata),
    field("identified_by", "Identified By", Text, SampleMetadata),
    field("voucher_id", "Voucher ID", Text, SampleMetadata),
    field("voucher_link", "Voucher Link", Url, SampleMetadata),
    field("voucher_institution", "Voucher Institution", Text, SampleMetadata),
    field("sampling_permits_required", "Sampling Permits Required", Checkbox, Permits),
    field("nagoya_permits_required", "Nagoya Permits Required", Checkbox, Permits),
    field("shipment_date", "Shipment Date", Date, Shipping),
    field("tracking_number", "Tracking Number", Text, Shipping),
];

pub const REQUIRED_FIELDS: [&str; 3] = ["first_name", "last_name", "contact_person_email"];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    FIELDS.iter().find(|spec| spec.name == name)
}

pub fn label(name: &str) -> &str {
    field_spec(name).map_or(name, |spec| spec.label)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Slot {
    Manifest,
    SamplingPermits,
    NagoyaPermits,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Manifest, Slot::SamplingPermits, Slot::NagoyaPermits];

    pub fn field_name(self) -> &'static str {
        match self {
            Slot::Manifest => "manifest_file",
            Slot::SamplingPermits => "sampling_permits_file",
            Slot::NagoyaPermits => "nagoya_permits_file",
        }
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.field_name() == name)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_field_names_are_unique() {
        let names: HashSet<_> = FIELDS.iter().map(|spec| spec.name).collect();

        assert_eq!(names.len(), FIELDS.len());
    }

    #[test]
    fn test_required_fields_are_requester_fields() {
        for name in REQUIRED_FIELDS {
            assert_eq!(field_spec(name).unwrap().section, Requester);
        }
    }

    #[test]
    fn test_slots_are_not_fields() {
        for slot in Slot::ALL {
            assert!(field_spec(slot.field_name()).is_none());
            assert_eq!(Slot::from_field_name(slot.field_name()), Some(slot));
        }
    }

    #[test]
    fn test_label_falls_back_to_name() {
        assert_eq!(label("contact_person_email"), "Email Address");
        assert_eq!(label("unknown_field"), "unknown_field");
    }
}
