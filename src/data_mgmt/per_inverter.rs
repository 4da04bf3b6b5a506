//! Per-inverter status records and their physical array grouping
use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{Number, Value};

use crate::constants::series;

use super::models::{FieldValue, Point};
use super::payload::PayloadError;

const SERIAL_TAG: &str = "serialNumber";
const ARRAY_TAG: &str = "array";
const WATTS_FIELD: &str = "lastReportWatts";

const NW_1_SERIALS: [&str; 7] = [
    "121834016762",
    "121834017142",
    "121834017531",
    "121834016909",
    "121834017063",
    "121834016079",
    "121834015898",
];

const NW_2_SERIALS: [&str; 7] = [
    "121834017129",
    "121834017050",
    "121834017135",
    "121834016760",
    "121834016763",
    "121834017765",
    "121834017118",
];

const SW_SERIALS: [&str; 4] = [
    "121834012995",
    "121834017144",
    "121834017073",
    "121834012414",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArrayGroup {
    Nw1,
    Nw2,
    Sw,
}

impl ArrayGroup {
    pub fn label(self) -> &'static str {
        match self {
            ArrayGroup::Nw1 => "NW_1",
            ArrayGroup::Nw2 => "NW_2",
            ArrayGroup::Sw => "SW",
        }
    }
}

impl fmt::Display for ArrayGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

type GroupTable = Vec<(HashSet<&'static str>, ArrayGroup)>;

/// Checked in order; a serial listed in several groups ends up in the last one
static ARRAY_GROUPS: Lazy<GroupTable> = Lazy::new(|| {
    vec![
        (HashSet::from(NW_1_SERIALS), ArrayGroup::Nw1),
        (HashSet::from(NW_2_SERIALS), ArrayGroup::Nw2),
        (HashSet::from(SW_SERIALS), ArrayGroup::Sw),
    ]
});

pub fn classify(serial_number: &str) -> Option<ArrayGroup> {
    classify_with(&ARRAY_GROUPS, serial_number)
}

pub fn classify_with(
    table: &[(HashSet<&str>, ArrayGroup)],
    serial_number: &str,
) -> Option<ArrayGroup> {
    let mut group = None;
    for (members, candidate) in table {
        if members.contains(serial_number) {
            group = Some(*candidate);
        }
    }
    group
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InverterStatus {
    pub serial_number: String,
    /// Epoch seconds
    pub last_report_date: i64,
    pub last_report_watts: Number,
}

impl InverterStatus {
    pub fn to_point(&self) -> Point {
        let point = Point::new(series::PER_INVERTER, self.last_report_date)
            .with_tag(SERIAL_TAG, self.serial_number.as_str())
            .with_field(WATTS_FIELD, FieldValue::from_number(&self.last_report_watts));
        match classify(&self.serial_number) {
            Some(group) => point.with_tag(ARRAY_TAG, group.label()),
            None => point,
        }
    }
}

pub fn parse_statuses(payload: Value) -> Result<Vec<InverterStatus>, PayloadError> {
    serde_json::from_value(payload).map_err(Into::into)
}
