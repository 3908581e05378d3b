use crate::reading::DeviceReading;

use serde_json::Value;

/// Where a field lives in the device's status object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    /// Top-level key
    Key(&'static str),
    /// Element `[row][col]` of a top-level array-of-arrays
    Index(&'static str, usize, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Raw,
    Div10,
    Div100,
    Div1000,
}

impl Scale {
    pub fn divisor(&self) -> Option<f64> {
        match self {
            Self::Raw => None,
            Self::Div10 => Some(10.0),
            Self::Div100 => Some(100.0),
            Self::Div1000 => Some(1000.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub path: Path,
    pub scale: Scale,
}

const fn key(name: &'static str, scale: Scale) -> Field {
    Field {
        name,
        path: Path::Key(name),
        scale,
    }
}

const fn index(name: &'static str, array: &'static str, row: usize, col: usize, scale: Scale) -> Field {
    Field {
        name,
        path: Path::Index(array, row, col),
        scale,
    }
}

use Scale::*;

/// Every field published for a device, in publish order.
pub const FIELDS: &[Field] = &[
    key("CommVer", Raw),
    key("DevType", Raw),
    key("SOC", Div10),
    key("SOH", Raw),
    key("Cycle", Raw),
    key("Status", Raw),
    key("Alarm", Raw),
    key("Protect", Raw),
    key("RemCap", Div100),
    key("FullCap", Div100),
    index("BVol", "BVol", 0, 0, Div100),
    index("BCur", "BCur", 0, 0, Div10),
    index("BTemp1", "BTemp", 0, 0, Div10),
    index("BTemp2", "BTemp", 0, 1, Div10),
    index("MosTemp", "MosTemp", 0, 0, Div10),
    index("EnvTemp", "EnvTemp", 0, 0, Div10),
    index("CellVol1", "CellVol", 0, 0, Div1000),
    index("CellVol2", "CellVol", 0, 1, Div1000),
    index("CellVol3", "CellVol", 0, 2, Div1000),
    index("CellVol4", "CellVol", 0, 3, Div1000),
    index("CellVol5", "CellVol", 0, 4, Div1000),
    index("CellVol6", "CellVol", 0, 5, Div1000),
    index("CellVol7", "CellVol", 0, 6, Div1000),
    index("CellVol8", "CellVol", 0, 7, Div1000),
    index("CellVol9", "CellVol", 0, 8, Div1000),
    index("CellVol10", "CellVol", 0, 9, Div1000),
    index("CellVol11", "CellVol", 0, 10, Div1000),
    index("CellVol12", "CellVol", 0, 11, Div1000),
    index("CellVol13", "CellVol", 0, 12, Div1000),
    index("CellVol14", "CellVol", 0, 13, Div1000),
    index("CellVol15", "CellVol", 0, 14, Div1000),
    index("CellVol16", "CellVol", 0, 15, Div1000),
    index("CellVolMax", "CellVolExt", 0, 0, Div1000),
    index("CellVolMin", "CellVolExt", 0, 1, Div1000),
    key("PVVol", Div10),
    key("PVCur", Div100),
    key("PVPower", Raw),
    key("GridVol", Div10),
    key("ACOutVol", Div10),
    key("ACOutPower", Raw),
];

impl Field {
    fn lookup<'a>(&self, reading: &'a DeviceReading) -> Option<&'a Value> {
        match self.path {
            Path::Key(k) => reading.get(k),
            Path::Index(k, row, col) => reading.get(k)?.get(row)?.get(col),
        }
    }

    /// Publishable string for this field, or None if the reading lacks it
    /// (or a scaled field is not numeric).
    pub fn extract(&self, reading: &DeviceReading) -> Option<String> {
        let value = self.lookup(reading)?;

        match self.scale.divisor() {
            None => stringify(value),
            Some(divisor) => {
                let raw = match value {
                    Value::Number(n) => n.as_f64()?,
                    Value::String(s) => s.trim().parse().ok()?,
                    _ => return None,
                };
                format_number(raw / divisor)
            }
        }
    }
}

/// Extracts every field in [`FIELDS`] that the reading carries.
pub fn extract_all(reading: &DeviceReading) -> Vec<(&'static str, String)> {
    FIELDS
        .iter()
        .filter_map(|field| field.extract(reading).map(|v| (field.name, v)))
        .collect()
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => serde_json::to_string(other).ok(),
    }
}

// Shortest round-trip form, so 210/10 is "21" and 205/10 is "20.5".
fn format_number(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    if value == 0.0 {
        return Some("0".to_string());
    }
    Some(value.to_string())
}
