//! DTOs for the registry's record payloads.
//!
//! Records arrive as loosely shaped JSON objects: newer rows use camelCase
//! keys, imported rows keep the upper-case form columns, and some rows nest
//! those columns under `raw`. Fields are read through alias chains and the
//! first non-blank value wins.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::{
    CertificateDetails, CertificateNumber, CertificateRecord, CertificateRecordDraft,
    CertificateStatus, CertificateSummary,
};

pub(super) type RecordMap = Map<String, Value>;

const NUMBER_KEYS: &[&str] = &["certificateNo", "CERTIFICATE_NO", "id", "ID"];
const STATUS_KEYS: &[&str] = &["status", "STATUS"];
const REJECT_REASON_KEYS: &[&str] = &["rejectReason", "REJECT_REASON"];
const CHILD_NAME_KEYS: &[&str] = &["childFullName", "childName"];
const CHILD_NAME_PARTS: &[&str] = &["CHILD_FIRST_NAME", "CHILD_MIDDLE_NAME", "CHILD_LAST_NAME"];
const FAMILY_NAME_KEYS: &[&str] = &["childLastName", "CHILD_LAST_NAME", "lastName", "LAST_NAME"];
const GENDER_KEYS: &[&str] = &["gender", "GENDER"];
const DATE_OF_BIRTH_KEYS: &[&str] = &["dateOfBirth", "DATE_OF_BIRTH"];
const PLACE_OF_BIRTH_KEYS: &[&str] = &["placeOfBirth", "PLACE_OF_BIRTH"];
const DISTRICT_KEYS: &[&str] = &["birthDistrict", "district", "DISTRICT"];
const MUNICIPALITY_KEYS: &[&str] = &["birthMunicipality", "municipality", "MUNICIPALITY"];
const WARD_KEYS: &[&str] = &["birthWard", "ward", "WARD"];
const FATHER_NAME_KEYS: &[&str] = &["fatherName", "FATHER_NAME"];
const FATHER_NAME_PARTS: &[&str] = &["FATHER_FIRST_NAME", "FATHER_LAST_NAME"];
const MOTHER_NAME_KEYS: &[&str] = &["motherName", "MOTHER_NAME"];
const MOTHER_NAME_PARTS: &[&str] = &["MOTHER_FIRST_NAME", "MOTHER_LAST_NAME"];
const ADDRESS_KEYS: &[&str] = &["permanentAddress", "PERMANENT_ADDRESS"];
const REGISTRATION_KEYS: &[&str] = &["registrationDate", "registeredAt", "REGISTERED_AT"];
const ISSUED_BY_KEYS: &[&str] = &["issuedBy", "ISSUED_BY"];
const ISSUED_DATE_KEYS: &[&str] = &["issuedDate", "ISSUED_DATE"];

/// Body of `GET /api/birth-record/{id}`.
#[derive(Debug, Deserialize)]
pub(super) struct RecordEnvelopeDto {
    #[serde(default)]
    pub(super) success: bool,
    pub(super) record: Option<RecordMap>,
}

/// Body of `GET /api/birth-records`.
#[derive(Debug, Deserialize)]
pub(super) struct RecordListDto {
    #[serde(default)]
    pub(super) success: bool,
    #[serde(default)]
    pub(super) records: Vec<RecordMap>,
}

impl RecordEnvelopeDto {
    /// `None` when the registry reports no such record.
    pub(super) fn into_record(self) -> Result<Option<CertificateRecord>, String> {
        if !self.success {
            return Ok(None);
        }
        self.record.as_ref().map(record_from_map).transpose()
    }
}

impl RecordListDto {
    pub(super) fn into_summaries(self) -> Result<Vec<CertificateSummary>, String> {
        if !self.success {
            return Err("record listing reported success=false".to_owned());
        }
        Ok(self
            .records
            .iter()
            .filter_map(|map| match summary_from_map(map) {
                Ok(summary) => Some(summary),
                Err(reason) => {
                    warn!(%reason, "skipping unreadable registry row");
                    None
                }
            })
            .collect())
    }
}

/// Alias-aware view over one record object.
struct RecordFields<'a> {
    top: &'a RecordMap,
    raw: Option<&'a RecordMap>,
}

impl<'a> RecordFields<'a> {
    fn new(map: &'a RecordMap) -> Self {
        Self {
            top: map,
            raw: map.get("raw").and_then(Value::as_object),
        }
    }

    fn lookup(&self, key: &str) -> Option<&'a Value> {
        self.top
            .get(key)
            .or_else(|| self.raw.and_then(|raw| raw.get(key)))
    }

    fn text(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| self.lookup(key).and_then(scalar_text))
            .find(|value| !value.is_empty())
    }

    fn joined(&self, parts: &[&str]) -> Option<String> {
        let pieces: Vec<String> = parts
            .iter()
            .filter_map(|&key| self.text(&[key]))
            .collect();
        (!pieces.is_empty()).then(|| pieces.join(" "))
    }

    fn date(&self, keys: &[&str]) -> Option<NaiveDate> {
        keys.iter()
            .filter_map(|&key| self.text(&[key]))
            .find_map(|value| parse_date_prefix(&value))
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_owned()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time component.
fn parse_date_prefix(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub(super) fn record_from_map(map: &RecordMap) -> Result<CertificateRecord, String> {
    let fields = RecordFields::new(map);
    let raw_number = fields
        .text(NUMBER_KEYS)
        .ok_or_else(|| "record carries no certificate number".to_owned())?;
    let certificate_number = CertificateNumber::new(&raw_number)
        .map_err(|err| format!("record number {raw_number:?} is unusable: {err}"))?;

    let child_name = fields
        .text(CHILD_NAME_KEYS)
        .or_else(|| fields.joined(CHILD_NAME_PARTS))
        .unwrap_or_default();
    let family_name = fields
        .text(FAMILY_NAME_KEYS)
        .or_else(|| child_name.split_whitespace().last().map(str::to_owned))
        .unwrap_or_default();

    let details = CertificateDetails {
        gender: fields.text(GENDER_KEYS),
        date_of_birth: fields.date(DATE_OF_BIRTH_KEYS),
        place_of_birth: fields.text(PLACE_OF_BIRTH_KEYS),
        birth_district: fields.text(DISTRICT_KEYS),
        birth_municipality: fields.text(MUNICIPALITY_KEYS),
        birth_ward: fields.text(WARD_KEYS),
        father_name: fields
            .text(FATHER_NAME_KEYS)
            .or_else(|| fields.joined(FATHER_NAME_PARTS)),
        mother_name: fields
            .text(MOTHER_NAME_KEYS)
            .or_else(|| fields.joined(MOTHER_NAME_PARTS)),
        permanent_address: fields.text(ADDRESS_KEYS),
        registration_date: fields.date(REGISTRATION_KEYS),
        issued_by: fields.text(ISSUED_BY_KEYS),
        issued_date: fields.date(ISSUED_DATE_KEYS),
        child_name,
    };

    Ok(CertificateRecord::new(CertificateRecordDraft {
        certificate_number,
        status: CertificateStatus::from_label(fields.text(STATUS_KEYS).as_deref()),
        reject_reason: fields.text(REJECT_REASON_KEYS),
        family_name,
        details,
    }))
}

pub(super) fn summary_from_map(map: &RecordMap) -> Result<CertificateSummary, String> {
    record_from_map(map).map(|record| record.summary())
}
