use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// License plate recognition event as delivered by the camera message queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraEvent {
    /// Camera identifier
    #[serde(default)]
    pub camera_id: Option<u32>,
    /// Capture time in the camera's local clock
    #[serde(default, with = "camera_time")]
    pub capture_time: Option<NaiveDateTime>,
    /// Time the recognition engine processed the frame
    #[serde(default)]
    pub processing_time: Option<DateTime<FixedOffset>>,
    /// Attached image (absent, inline base64 or object store reference)
    #[serde(default)]
    pub image: EventImage,
    /// Measured speed reported by the camera
    #[serde(default)]
    pub speed: Option<u32>,
    /// Country code of the recognized plate
    #[serde(default)]
    pub country: Option<String>,
    /// Recognized plate text
    #[serde(default)]
    pub plate: Option<String>,
    /// Secondary plate text (trailer or second reading)
    #[serde(default)]
    pub plate2: Option<String>,
    /// Country code of the secondary plate
    #[serde(default)]
    pub country2: Option<String>,
    /// Location label of the camera lane
    #[serde(default)]
    pub location: Option<String>,
    /// Direction of travel through the lane
    #[serde(default, deserialize_with = "lenient_direction")]
    pub direction: Option<Direction>,
}

impl CameraEvent {
    pub fn new(
        camera_id: Option<u32>,
        capture_time: Option<NaiveDateTime>,
        processing_time: Option<DateTime<FixedOffset>>,
        image: EventImage,
        speed: Option<u32>,
        country: Option<&str>,
        plate: Option<&str>,
    ) -> Self {
        Self {
            camera_id,
            capture_time,
            processing_time,
            image,
            speed,
            country: country.map(str::to_string),
            plate: plate.map(str::to_string),
            ..Default::default()
        }
    }

    pub fn with_plate2(mut self, plate2: &str) -> Self {
        self.plate2 = Some(plate2.to_string());
        self
    }

    pub fn with_country2(mut self, country2: &str) -> Self {
        self.country2 = Some(country2.to_string());
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }
}

/// Direction of travel for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Entry => "entry",
            Direction::Exit => "exit",
        }
    }
}

/// Image attached to a camera event.
///
/// On the wire the `image` field is `null`, a base64 string, or an object
/// store reference object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventImage {
    /// No image attached
    #[default]
    Absent,
    /// Base64-encoded image bytes, as received
    Raw(String),
    /// Object already stored in a remote object store
    Remote(RemoteImageReference),
}

impl EventImage {
    /// Wrap raw image bytes the way the camera sends them
    pub fn from_bytes(bytes: &[u8]) -> Self {
        EventImage::Raw(STANDARD.encode(bytes))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireImage {
    Raw(String),
    Remote(RemoteImageReference),
}

impl<'de> Deserialize<'de> for EventImage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<WireImage>::deserialize(deserializer)? {
            None => EventImage::Absent,
            Some(WireImage::Raw(encoded)) => EventImage::Raw(encoded),
            Some(WireImage::Remote(reference)) => EventImage::Remote(reference),
        })
    }
}

/// Reference to an image object held by a remote object store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteImageReference {
    #[serde(default)]
    pub object_id: Option<String>,
    #[serde(default)]
    pub bucket_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<ObjectStoreService>,
}

impl RemoteImageReference {
    pub fn new(object_id: &str, bucket_id: &str, service_name: &str) -> Self {
        Self {
            object_id: Some(object_id.to_string()),
            bucket_id: Some(bucket_id.to_string()),
            service_name: Some(ObjectStoreService::from(service_name.to_string())),
        }
    }
}

/// Object store backing a remote image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectStoreService {
    AwsS3,
    /// Any identifier this component does not know how to reference
    Unrecognized(String),
}

impl ObjectStoreService {
    pub const AWS_S3: &'static str = "AWS_S3";

    pub fn as_str(&self) -> &str {
        match self {
            ObjectStoreService::AwsS3 => Self::AWS_S3,
            ObjectStoreService::Unrecognized(name) => name,
        }
    }
}

impl From<String> for ObjectStoreService {
    fn from(name: String) -> Self {
        if name == Self::AWS_S3 {
            ObjectStoreService::AwsS3
        } else {
            ObjectStoreService::Unrecognized(name)
        }
    }
}

impl From<ObjectStoreService> for String {
    fn from(service: ObjectStoreService) -> Self {
        match service {
            ObjectStoreService::AwsS3 => ObjectStoreService::AWS_S3.to_string(),
            ObjectStoreService::Unrecognized(name) => name,
        }
    }
}

/// Unknown directions are dropped rather than failing the whole event
fn lenient_direction<'de, D>(deserializer: D) -> Result<Option<Direction>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<String>::deserialize(deserializer)?.as_deref() {
        Some("ENTRY") => Some(Direction::Entry),
        Some("EXIT") => Some(Direction::Exit),
        Some(other) => {
            warn!(direction = %other, "Unknown event direction, ignoring");
            None
        }
        None => None,
    })
}

/// Camera clock timestamps, e.g. `12/12/2016 14:46:50.000000`.
/// Unparseable timestamps are dropped rather than failing the whole event.
mod camera_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::warn;

    const FORMAT: &str = "%m/%d/%Y %H:%M:%S%.f";

    pub fn serialize<S>(time: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(time) => serializer.serialize_str(&time.format("%m/%d/%Y %H:%M:%S%.6f").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };

        match NaiveDateTime::parse_from_str(&s, FORMAT) {
            Ok(time) => Ok(Some(time)),
            Err(e) => {
                warn!(capture_time = %s, error = %e, "Unparseable capture time, ignoring");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_deserialize_event_with_inline_image() {
        let json = r#"{
            "camera_id": 2070,
            "capture_time": "12/12/2016 14:46:50.000000",
            "processing_time": "2016-12-16T17:03:21.389+02:00",
            "image": "dGhlcXVpY2ticm93bmZveGp1bXBzb3ZlcnRoZWxhenlkb2c=",
            "speed": 950,
            "country": "NOR",
            "plate": "AA11111",
            "plate2": null,
            "country2": null,
            "location": "HERE",
            "direction": "ENTRY"
        }"#;

        let event: CameraEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.camera_id, Some(2070));
        assert_eq!(event.direction, Some(Direction::Entry));
        assert_eq!(event.location.as_deref(), Some("HERE"));
        assert!(matches!(event.image, EventImage::Raw(_)));

        let capture = event.capture_time.unwrap();
        assert_eq!((capture.year(), capture.month(), capture.day()), (2016, 12, 12));
        assert_eq!(capture.hour(), 14);

        let processed = event.processing_time.unwrap();
        assert_eq!(processed.offset().local_minus_utc(), 2 * 3600);
    }

    #[test]
    fn test_deserialize_event_with_remote_reference() {
        let json = r#"{
            "camera_id": 2070,
            "image": {
                "object_id": "08a34a1f081e4bd69c3c1947c77299f9.jpg",
                "bucket_id": "helmes-test",
                "service_name": "AWS_S3"
            },
            "direction": "EXIT"
        }"#;

        let event: CameraEvent = serde_json::from_str(json).unwrap();
        match event.image {
            EventImage::Remote(reference) => {
                assert_eq!(reference.service_name, Some(ObjectStoreService::AwsS3));
                assert_eq!(reference.bucket_id.as_deref(), Some("helmes-test"));
            }
            other => panic!("Expected Remote, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_all_null_event() {
        let json = r#"{
            "camera_id": null,
            "capture_time": null,
            "processing_time": null,
            "image": null,
            "speed": null,
            "country": null,
            "plate": null
        }"#;

        let event: CameraEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, CameraEvent::default());
        assert_eq!(event.image, EventImage::Absent);
    }

    #[test]
    fn test_reference_with_null_fields() {
        let json = r#"{ "object_id": null, "bucket_id": "some-bucket", "service_name": "AWS_S3" }"#;
        let event: CameraEvent =
            serde_json::from_str(&format!(r#"{{ "image": {} }}"#, json)).unwrap();

        assert_eq!(
            event.image,
            EventImage::Remote(RemoteImageReference {
                object_id: None,
                bucket_id: Some("some-bucket".to_string()),
                service_name: Some(ObjectStoreService::AwsS3),
            })
        );
    }

    #[test]
    fn test_unrecognized_service_name_is_kept() {
        let service = ObjectStoreService::from("INVALID-IDENTIFIER".to_string());
        assert_eq!(
            service,
            ObjectStoreService::Unrecognized("INVALID-IDENTIFIER".to_string())
        );
        assert_eq!(service.as_str(), "INVALID-IDENTIFIER");
        assert_eq!(
            serde_json::to_string(&ObjectStoreService::AwsS3).unwrap(),
            "\"AWS_S3\""
        );
    }

    #[test]
    fn test_bad_capture_time_and_direction_are_ignored() {
        let json = r#"{
            "camera_id": 2070,
            "capture_time": "yesterday",
            "image": "cGxhdGU=",
            "direction": "SIDEWAYS"
        }"#;

        let event: CameraEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.capture_time, None);
        assert_eq!(event.direction, None);
        assert_eq!(event.camera_id, Some(2070));
        assert_eq!(event.image, EventImage::Raw("cGxhdGU=".to_string()));
    }

    #[test]
    fn test_event_serializes_back_to_wire_shape() {
        let event = CameraEvent::new(
            Some(2070),
            None,
            None,
            EventImage::Absent,
            Some(950),
            Some("NOR"),
            Some("AA11111"),
        )
        .with_direction(Direction::Exit);

        let value = serde_json::to_value(&event).unwrap();
        assert!(value["image"].is_null());
        assert_eq!(value["direction"], "EXIT");
        assert_eq!(serde_json::from_value::<CameraEvent>(value).unwrap(), event);
    }
}
