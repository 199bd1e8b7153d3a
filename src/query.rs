//! Query parameter normalization shared by cache keys and request URLs.
//!
//! Parameters are any `Serialize` value that produces a JSON object. Normalization drops
//! `null` members recursively and sorts object members by key, so two structurally equal
//! parameter values always produce the same canonical form regardless of field order.

// self
use crate::{_prelude::*, error::ConfigError};

/// Canonical JSON form of a parameter object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizedParams(JsonValue);
impl NormalizedParams {
	/// Serializes and normalizes `params`.
	pub fn new<P>(params: &P) -> Result<Self, ConfigError>
	where
		P: ?Sized + Serialize,
	{
		let value = strip_nulls(serde_json::to_value(params)?);

		match value {
			JsonValue::Object(_) => Ok(Self(value)),
			other => Err(ConfigError::InvalidQuery { kind: json_kind(&other) }),
		}
	}

	/// Stable string form used inside cache keys.
	pub fn canonical(&self) -> String {
		self.0.to_string()
	}

	/// Flattens the object into `key=value` pairs.
	///
	/// Arrays repeat the key once per element; nested objects are sent as JSON text.
	pub fn pairs(&self) -> Vec<(String, String)> {
		let JsonValue::Object(map) = &self.0 else {
			return Vec::new();
		};
		let mut pairs = Vec::with_capacity(map.len());

		for (key, value) in map {
			match value {
				JsonValue::Array(items) =>
					pairs.extend(items.iter().map(|item| (key.clone(), scalar_text(item)))),
				other => pairs.push((key.clone(), scalar_text(other))),
			}
		}

		pairs
	}
}

fn strip_nulls(value: JsonValue) -> JsonValue {
	match value {
		JsonValue::Object(map) => {
			// Sort explicitly; `serde_json/preserve_order` may be unified in by another crate.
			let mut members = map
				.into_iter()
				.filter(|(_, v)| !v.is_null())
				.map(|(k, v)| (k, strip_nulls(v)))
				.collect::<Vec<_>>();

			members.sort_by(|(a, _), (b, _)| a.cmp(b));

			JsonValue::Object(members.into_iter().collect())
		},
		JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(strip_nulls).collect()),
		other => other,
	}
}

fn scalar_text(value: &JsonValue) -> String {
	match value {
		JsonValue::String(s) => s.clone(),
		other => other.to_string(),
	}
}

fn json_kind(value: &JsonValue) -> &'static str {
	match value {
		JsonValue::Null => "null",
		JsonValue::Bool(_) => "a boolean",
		JsonValue::Number(_) => "a number",
		JsonValue::String(_) => "a string",
		JsonValue::Array(_) => "an array",
		JsonValue::Object(_) => "an object",
	}
}
