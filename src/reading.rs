use serde_json::{Map, Value};

/// Decoded status object from one device response.
pub type DeviceReading = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum ReadingError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response is JSON but not an object")]
    NotAnObject,
}

/// Decodes a device response into a [`DeviceReading`].
///
/// Framing on `}` strips the closing brace, so it is put back first. If that
/// does not parse, the bytes are tried as received, which covers devices
/// that closed the stream after a complete object.
pub fn decode(response: &[u8]) -> Result<DeviceReading, ReadingError> {
    let mut repaired = Vec::with_capacity(response.len() + 1);
    repaired.extend_from_slice(response);
    repaired.push(b'}');

    let value: Value = match serde_json::from_slice(&repaired) {
        Ok(value) => value,
        Err(repair_err) => serde_json::from_slice(response).map_err(|_| repair_err)?,
    };

    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ReadingError::NotAnObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_stripped_brace() {
        let reading = decode(br#"{"CommVer":1,"BTemp":[[205,210]]"#).unwrap();
        assert_eq!(reading["CommVer"], 1);
        assert_eq!(reading["BTemp"][0][1], 210);
    }

    #[test]
    fn accepts_complete_object() {
        let reading = decode(br#"{"SOC":875}"#).unwrap();
        assert_eq!(reading["SOC"], 875);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode(b"<html>oops"), Err(ReadingError::Json(_))));
        assert!(matches!(decode(b""), Err(ReadingError::Json(_))));
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(decode(b"[1,2,3]"), Err(ReadingError::NotAnObject)));
    }
}
