//! Unit conversion tool.
//!
//! Supports distance, weight, volume (table-driven through a base unit)
//! and temperature (formula-based).

use async_trait::async_trait;

use switchboard_core::error::ToolError;
use switchboard_core::tool::Tool;

/// Distance units expressed in meters.
const DISTANCE: &[(&str, f64)] = &[
    ("mm", 0.001),
    ("cm", 0.01),
    ("m", 1.0),
    ("km", 1000.0),
    ("in", 0.0254),
    ("ft", 0.3048),
    ("yd", 0.9144),
    ("mi", 1609.344),
];

/// Weight units expressed in kilograms.
const WEIGHT: &[(&str, f64)] = &[
    ("mg", 0.000_001),
    ("g", 0.001),
    ("kg", 1.0),
    ("t", 1000.0),
    ("oz", 0.028_349_5),
    ("lb", 0.453_592),
    ("st", 6.350_29),
];

/// Volume units expressed in liters.
const VOLUME: &[(&str, f64)] = &[
    ("ml", 0.001),
    ("l", 1.0),
    ("cup", 0.236_588),
    ("pt", 0.473_176),
    ("qt", 0.946_353),
    ("gal", 3.785_41),
    ("floz", 0.029_573_5),
];

fn table_lookup(table: &[(&str, f64)], unit: &str) -> Option<f64> {
    table
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, factor)| *factor)
}

fn convert_linear(table: &[(&str, f64)], value: f64, from: &str, to: &str) -> Option<f64> {
    let from_factor = table_lookup(table, from)?;
    let to_factor = table_lookup(table, to)?;
    Some(value * from_factor / to_factor)
}

fn convert_temperature(value: f64, from: &str, to: &str) -> Option<f64> {
    let celsius = match from {
        "c" => value,
        "f" => (value - 32.0) * 5.0 / 9.0,
        "k" => value - 273.15,
        _ => return None,
    };
    match to {
        "c" => Some(celsius),
        "f" => Some(celsius * 9.0 / 5.0 + 32.0),
        "k" => Some(celsius + 273.15),
        _ => None,
    }
}

fn convert(value: f64, from: &str, to: &str) -> Option<(f64, &'static str)> {
    if let Some(result) = convert_temperature(value, from, to) {
        return Some((result, "temperature"));
    }
    if let Some(result) = convert_linear(DISTANCE, value, from, to) {
        return Some((result, "distance"));
    }
    if let Some(result) = convert_linear(WEIGHT, value, from, to) {
        return Some((result, "weight"));
    }
    if let Some(result) = convert_linear(VOLUME, value, from, to) {
        return Some((result, "volume"));
    }
    None
}

pub struct UnitConvertTool;

#[async_trait]
impl Tool for UnitConvertTool {
    fn name(&self) -> &str {
        "unit_convert"
    }

    fn description(&self) -> &str {
        "Convert a value between units of distance (mm, cm, m, km, in, ft, yd, mi), \
         weight (mg, g, kg, t, oz, lb, st), volume (ml, l, cup, pt, qt, gal, floz), \
         or temperature (c, f, k)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "value": {
                    "type": "number",
                    "description": "The numeric value to convert"
                },
                "from_unit": {
                    "type": "string",
                    "description": "The source unit, e.g. 'km' or 'f'"
                },
                "to_unit": {
                    "type": "string",
                    "description": "The target unit, e.g. 'mi' or 'c'"
                }
            },
            "required": ["value", "from_unit", "to_unit"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let value = arguments["value"]
            .as_f64()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'value' argument".into()))?;
        let from = arguments["from_unit"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'from_unit' argument".into()))?
            .to_lowercase();
        let to = arguments["to_unit"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'to_unit' argument".into()))?
            .to_lowercase();

        let (result, category) = convert(value, &from, &to).ok_or_else(|| {
            ToolError::InvalidArguments(format!(
                "Cannot convert from '{from}' to '{to}': unknown or incompatible units"
            ))
        })?;

        Ok(serde_json::json!({
            "value": value,
            "from_unit": from,
            "to_unit": to,
            "result": result,
            "category": category,
        }))
    }
}
