use serde::{Deserialize, Serialize};

/// One foreground-transition observation reported by the detection layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockEvent {
    pub package_name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl LockEvent {
    pub fn new(package_name: &str, class_name: &str, timestamp: i64) -> Self {
        Self {
            package_name: package_name.to_string(),
            class_name: class_name.to_string(),
            timestamp,
        }
    }
}

/// What the overlay is currently locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedAppInfo {
    pub package_name: String,
    pub class_name: String,
    pub display_name: String,
    pub timestamp: i64,
}

impl From<LockEvent> for LockedAppInfo {
    fn from(event: LockEvent) -> Self {
        let display_name = display_name_for(&event.package_name);
        Self {
            package_name: event.package_name,
            class_name: event.class_name,
            display_name,
            timestamp: event.timestamp,
        }
    }
}

/// Derive a human-readable label from a package identifier.
///
/// Takes the last dot-separated segment and capitalizes its first character.
/// Falls back to the whole identifier when that segment is empty.
pub fn display_name_for(package_name: &str) -> String {
    let segment = package_name.rsplit('.').next().unwrap_or(package_name);
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => package_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_uses_last_segment() {
        assert_eq!(display_name_for("com.whatsapp"), "Whatsapp");
        assert_eq!(display_name_for("org.telegram.messenger"), "Messenger");
    }

    #[test]
    fn test_display_name_without_dots() {
        assert_eq!(display_name_for("signal"), "Signal");
    }

    #[test]
    fn test_display_name_keeps_rest_of_segment() {
        assert_eq!(display_name_for("com.google.android.apps.photosGo"), "PhotosGo");
    }

    #[test]
    fn test_display_name_empty_segment_falls_back() {
        assert_eq!(display_name_for("com.example."), "com.example.");
        assert_eq!(display_name_for(""), "");
    }

    #[test]
    fn test_event_uses_camel_case_fields() {
        let event: LockEvent = serde_json::from_str(
            r#"{"packageName":"com.whatsapp","className":"MainActivity","timestamp":100}"#,
        )
        .unwrap();
        assert_eq!(event, LockEvent::new("com.whatsapp", "MainActivity", 100));
    }

    #[test]
    fn test_event_class_and_timestamp_optional() {
        let event: LockEvent = serde_json::from_str(r#"{"packageName":"com.a"}"#).unwrap();
        assert_eq!(event.class_name, "");
        assert_eq!(event.timestamp, 0);
    }

    #[test]
    fn test_info_from_event_derives_display_name() {
        let info = LockedAppInfo::from(LockEvent::new("com.whatsapp", "MainActivity", 100));
        assert_eq!(info.package_name, "com.whatsapp");
        assert_eq!(info.class_name, "MainActivity");
        assert_eq!(info.display_name, "Whatsapp");
        assert_eq!(info.timestamp, 100);
    }
}
