//! Backend configuration validation.
//!
//! Each backend owns a free-form TOML table under
//! `[state.implementations.<name>]`. Backends describe the keys they accept
//! with a [`Schema`] and check the table before building themselves, so a
//! typo in `port` fails at startup instead of on the first request.

use std::ops::RangeInclusive;
use thiserror::Error;

/// Problems found while checking a backend table.
#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("Missing required field: {0}")]
	MissingField(String),
	#[error("Invalid value for field '{field}': {message}")]
	InvalidValue { field: String, message: String },
	#[error("Field '{field}' must be {expected}, found {found}")]
	TypeMismatch {
		field: String,
		expected: &'static str,
		found: &'static str,
	},
}

/// Accepted shape of a single key.
#[derive(Debug, Clone)]
pub enum FieldKind {
	Text,
	/// Integer within the inclusive range.
	Integer(RangeInclusive<i64>),
}

impl FieldKind {
	/// Integer usable as a TCP port.
	pub fn port() -> Self {
		FieldKind::Integer(1..=65535)
	}

	/// Whole number of seconds, at most five minutes.
	pub fn seconds() -> Self {
		FieldKind::Integer(1..=300)
	}

	fn describe(&self) -> &'static str {
		match self {
			FieldKind::Text => "a string",
			FieldKind::Integer(_) => "an integer",
		}
	}
}

type Check = Box<dyn Fn(&toml::Value) -> Result<(), String> + Send + Sync>;

/// A key a backend table may carry.
pub struct Field {
	name: &'static str,
	kind: FieldKind,
	check: Option<Check>,
}

impl std::fmt::Debug for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Field")
			.field("name", &self.name)
			.field("kind", &self.kind)
			.field("checked", &self.check.is_some())
			.finish()
	}
}

impl Field {
	pub fn new(name: &'static str, kind: FieldKind) -> Self {
		Self {
			name,
			kind,
			check: None,
		}
	}

	/// String field that must contain something other than whitespace.
	pub fn non_empty_text(name: &'static str) -> Self {
		Self::new(name, FieldKind::Text).validated_by(|value| match value.as_str() {
			Some(s) if !s.trim().is_empty() => Ok(()),
			_ => Err("cannot be empty".to_string()),
		})
	}

	/// Adds a check run once the value has the right kind. The closure
	/// returns the message reported to the operator.
	pub fn validated_by<F>(mut self, check: F) -> Self
	where
		F: Fn(&toml::Value) -> Result<(), String> + Send + Sync + 'static,
	{
		self.check = Some(Box::new(check));
		self
	}

	fn verify(&self, value: &toml::Value) -> Result<(), ValidationError> {
		let matches_kind = match &self.kind {
			FieldKind::Text => value.is_str(),
			FieldKind::Integer(_) => value.is_integer(),
		};
		if !matches_kind {
			return Err(ValidationError::TypeMismatch {
				field: self.name.to_string(),
				expected: self.kind.describe(),
				found: value.type_str(),
			});
		}

		if let (FieldKind::Integer(range), Some(n)) = (&self.kind, value.as_integer()) {
			if !range.contains(&n) {
				return Err(self.invalid(format!(
					"{} is outside {}..={}",
					n,
					range.start(),
					range.end()
				)));
			}
		}

		if let Some(check) = &self.check {
			check(value).map_err(|message| self.invalid(message))?;
		}
		Ok(())
	}

	fn invalid(&self, message: String) -> ValidationError {
		ValidationError::InvalidValue {
			field: self.name.to_string(),
			message,
		}
	}
}

/// The set of keys a backend table accepts.
///
/// Unknown keys are ignored so configuration files can carry settings for
/// newer versions.
#[derive(Debug, Default)]
pub struct Schema {
	required: Vec<Field>,
	optional: Vec<Field>,
}

impl Schema {
	/// A schema accepting any table.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn required(mut self, field: Field) -> Self {
		self.required.push(field);
		self
	}

	pub fn optional(mut self, field: Field) -> Self {
		self.optional.push(field);
		self
	}

	/// Checks that `config` is a table, every required key is present, and
	/// every present key has the declared kind and passes its check.
	pub fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let table = config.as_table().ok_or(ValidationError::TypeMismatch {
			field: "<root>".to_string(),
			expected: "a table",
			found: config.type_str(),
		})?;

		for field in &self.required {
			match table.get(field.name) {
				Some(value) => field.verify(value)?,
				None => return Err(ValidationError::MissingField(field.name.to_string())),
			}
		}
		for field in &self.optional {
			if let Some(value) = table.get(field.name) {
				field.verify(value)?;
			}
		}
		Ok(())
	}
}

/// Validation hook every backend exposes for its configuration table.
pub trait ConfigSchema: Send + Sync {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError>;
}

impl ConfigSchema for Schema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::validate(self, config)
	}
}
