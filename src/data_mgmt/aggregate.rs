//! Production/consumption summary: the four fixed-position readings and their series
use serde_json::Value;

use crate::constants::series;
use crate::helpers::epoch_to_iso;
use crate::interfaces::influx::{PointSink, SinkError};

use super::models::{FieldValue, Fields, Point};
use super::payload::PayloadError;
use super::watermark::Watermarks;

const READING_TIME: &str = "readingTime";
const PRODUCTION: &str = "production";
const CONSUMPTION: &str = "consumption";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReadingKind {
    ProductionInverter,
    ProductionEim,
    Consumption,
    NetConsumption,
}

impl ReadingKind {
    pub const ALL: [ReadingKind; 4] = [
        ReadingKind::ProductionInverter,
        ReadingKind::ProductionEim,
        ReadingKind::Consumption,
        ReadingKind::NetConsumption,
    ];

    /// Section and index of this reading within the summary payload
    fn location(self) -> (&'static str, usize) {
        match self {
            ReadingKind::ProductionInverter => (PRODUCTION, 0),
            ReadingKind::ProductionEim => (PRODUCTION, 1),
            ReadingKind::Consumption => (CONSUMPTION, 0),
            ReadingKind::NetConsumption => (CONSUMPTION, 1),
        }
    }

    pub fn series(self) -> &'static str {
        match self {
            ReadingKind::ProductionInverter => series::GENERAL_INFO,
            ReadingKind::ProductionEim => series::PRODUCTION,
            ReadingKind::Consumption => series::TOTAL_CONSUMPTION,
            ReadingKind::NetConsumption => series::NET_CONSUMPTION,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ReadingKind::ProductionInverter => "production (inverters)",
            ReadingKind::ProductionEim => "production (EIM)",
            ReadingKind::Consumption => "total consumption",
            ReadingKind::NetConsumption => "net consumption",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub kind: ReadingKind,
    /// Epoch seconds
    pub reading_time: i64,
    pub fields: Fields,
}

impl Reading {
    pub fn into_point(self) -> Point {
        Point {
            measurement: self.kind.series().to_string(),
            tags: Default::default(),
            time: self.reading_time,
            fields: self.fields,
        }
    }
}

/// Pull all four readings out of the summary, failing on the first shape problem
pub fn extract_readings(payload: &Value) -> Result<Vec<Reading>, PayloadError> {
    ReadingKind::ALL
        .iter()
        .map(|&kind| extract_reading(payload, kind))
        .collect()
}

fn extract_reading(payload: &Value, kind: ReadingKind) -> Result<Reading, PayloadError> {
    let (section, index) = kind.location();
    let object = payload
        .get(section)
        .and_then(Value::as_array)
        .ok_or(PayloadError::MissingSection(section))?
        .get(index)
        .ok_or(PayloadError::MissingEntry { section, index })?
        .as_object()
        .ok_or(PayloadError::NotAnObject { section, index })?;

    // Any number is accepted; the watermark decides whether it gets written
    let reading_time = object
        .get(READING_TIME)
        .and_then(epoch_seconds)
        .ok_or(PayloadError::InvalidReadingTime { section, index })?;

    let fields = object
        .iter()
        .filter_map(|(key, value)| FieldValue::from_json(value).map(|v| (key.clone(), v)))
        .collect();

    Ok(Reading {
        kind,
        reading_time,
        fields,
    })
}

/// Whole epoch seconds from a JSON number; fractional seconds are truncated
fn epoch_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs.trunc() as i64))
}

pub fn log_reading_times(readings: &[Reading]) {
    for reading in readings {
        log::info!(
            "Time of {} reading: {} ({})",
            reading.kind.description(),
            reading.reading_time,
            epoch_to_iso(reading.reading_time)
        );
    }
}

/// Write `reading` if it is newer than the last one pushed for its kind
///
/// Returns whether a write happened. The watermark only advances on a successful write.
pub fn forward_reading(
    reading: Reading,
    watermarks: &mut Watermarks,
    sink: &dyn PointSink,
) -> Result<bool, SinkError> {
    let kind = reading.kind;
    let reading_time = reading.reading_time;
    if !watermarks.is_newer(kind, reading_time) {
        log::info!(
            "Skipping {} reading; {} already pushed",
            kind.description(),
            watermarks.last_pushed(kind)
        );
        return Ok(false);
    }

    log::info!("Pushing {} to '{}'", kind.description(), kind.series());
    sink.write_points(&[reading.into_point()])?;
    watermarks.advance(kind, reading_time);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use serde_json::json;

    #[derive(Default)]
    struct RecordingSink {
        writes: RefCell<Vec<Vec<Point>>>,
    }

    impl PointSink for RecordingSink {
        fn write_points(&self, points: &[Point]) -> Result<(), SinkError> {
            self.writes.borrow_mut().push(points.to_vec());
            Ok(())
        }
    }

    struct FailingSink;

    impl PointSink for FailingSink {
        fn write_points(&self, points: &[Point]) -> Result<(), SinkError> {
            Err(SinkError::MalformedPoint {
                measurement: points[0].measurement.clone(),
                reason: "refused",
            })
        }
    }

    fn sample_payload() -> Value {
        json!({
            "production": [
                {"type": "inverters", "activeCount": 18, "readingTime": 100, "wNow": 5},
                {"type": "eim", "readingTime": 101, "wNow": 6.5, "lines": [{"wNow": 2}]}
            ],
            "consumption": [
                {"measurementType": "total-consumption", "readingTime": 102, "wNow": 1},
                {"measurementType": "net-consumption", "readingTime": 103, "wNow": 0}
            ]
        })
    }

    fn reading(kind: ReadingKind, reading_time: i64) -> Reading {
        Reading {
            kind,
            reading_time,
            fields: Fields::from([("wNow".to_string(), FieldValue::Int(1))]),
        }
    }

    #[test]
    fn test_extract_readings() {
        let readings = extract_readings(&sample_payload()).unwrap();
        let kinds_and_times: Vec<_> = readings
            .iter()
            .map(|r| (r.kind, r.reading_time))
            .collect();
        assert_eq!(
            kinds_and_times,
            vec![
                (ReadingKind::ProductionInverter, 100),
                (ReadingKind::ProductionEim, 101),
                (ReadingKind::Consumption, 102),
                (ReadingKind::NetConsumption, 103),
            ]
        );

        let eim = &readings[1].fields;
        assert_eq!(eim["readingTime"], FieldValue::Int(101));
        assert_eq!(eim["wNow"], FieldValue::Float(6.5));
        assert_eq!(eim["type"], FieldValue::String("eim".into()));
        assert!(!eim.contains_key("lines"));
    }

    #[test]
    fn test_series_names() {
        let series: Vec<_> = ReadingKind::ALL.iter().map(|k| k.series()).collect();
        assert_eq!(
            series,
            vec![
                "general_info",
                "production",
                "total_consumption",
                "net_consumption"
            ]
        );
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            extract_readings(&json!({"consumption": []})),
            Err(PayloadError::MissingSection("production"))
        ));
        assert!(matches!(
            extract_readings(&json!({"production": {"readingTime": 1}})),
            Err(PayloadError::MissingSection("production"))
        ));

        let mut short = sample_payload();
        short["consumption"].as_array_mut().unwrap().pop();
        assert!(matches!(
            extract_readings(&short),
            Err(PayloadError::MissingEntry {
                section: "consumption",
                index: 1
            })
        ));

        let mut not_object = sample_payload();
        not_object["production"][0] = json!(42);
        assert!(matches!(
            extract_readings(&not_object),
            Err(PayloadError::NotAnObject {
                section: "production",
                index: 0
            })
        ));

        let mut bad_time = sample_payload();
        bad_time["production"][1]["readingTime"] = json!("yesterday");
        assert!(matches!(
            extract_readings(&bad_time),
            Err(PayloadError::InvalidReadingTime {
                section: "production",
                index: 1
            })
        ));

        let mut missing_time = sample_payload();
        missing_time["consumption"][0]
            .as_object_mut()
            .unwrap()
            .remove("readingTime");
        assert!(matches!(
            extract_readings(&missing_time),
            Err(PayloadError::InvalidReadingTime {
                section: "consumption",
                index: 0
            })
        ));
    }

    #[test]
    fn test_any_numeric_reading_time_accepted() {
        let mut payload = sample_payload();
        payload["production"][0]["readingTime"] = json!(100.9);
        payload["consumption"][0]["readingTime"] = json!(-5);

        let readings = extract_readings(&payload).unwrap();
        assert_eq!(readings[0].reading_time, 100);
        assert_eq!(readings[2].reading_time, -5);
    }

    #[test]
    fn test_negative_reading_time_held_back() {
        let sink = RecordingSink::default();
        let mut watermarks = Watermarks::default();

        let kind = ReadingKind::Consumption;
        assert!(!forward_reading(reading(kind, -5), &mut watermarks, &sink).unwrap());
        assert_eq!(watermarks.last_pushed(kind), 0);
        assert!(sink.writes.borrow().is_empty());
    }

    #[test]
    fn test_into_point() {
        let point = reading(ReadingKind::NetConsumption, 103).into_point();
        assert_eq!(point.measurement, "net_consumption");
        assert_eq!(point.time, 103);
        assert!(point.tags.is_empty());
        assert_eq!(point.fields["wNow"], FieldValue::Int(1));
    }

    #[test]
    fn test_newer_reading_forwarded_once() {
        let sink = RecordingSink::default();
        let mut watermarks = Watermarks::default();

        let kind = ReadingKind::Consumption;
        assert!(forward_reading(reading(kind, 102), &mut watermarks, &sink).unwrap());
        assert_eq!(watermarks.last_pushed(kind), 102);

        // Equal and older timestamps are held back
        assert!(!forward_reading(reading(kind, 102), &mut watermarks, &sink).unwrap());
        assert!(!forward_reading(reading(kind, 50), &mut watermarks, &sink).unwrap());
        assert_eq!(watermarks.last_pushed(kind), 102);

        // Other kinds have their own watermark
        assert!(
            forward_reading(reading(ReadingKind::NetConsumption, 50), &mut watermarks, &sink)
                .unwrap()
        );

        let writes = sink.writes.borrow();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0][0].measurement, "total_consumption");
        assert_eq!(writes[1][0].measurement, "net_consumption");
    }

    #[test]
    fn test_failed_write_keeps_watermark() {
        let mut watermarks = Watermarks::default();
        let kind = ReadingKind::ProductionEim;

        assert!(forward_reading(reading(kind, 101), &mut watermarks, &FailingSink).is_err());
        assert_eq!(watermarks.last_pushed(kind), 0);
    }
}
