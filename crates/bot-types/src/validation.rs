//! Schema validation for JSON documents and implementation configuration.
//!
//! A [`Schema`] checks every field and reports all violations at once, so a
//! rejected order or config block lists each offending field.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// A single violated field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	#[error("{0} is required")]
	MissingField(String),
	/// The value has the right type but is rejected by a bound or validator.
	#[error("{field}: {message}")]
	InvalidValue { field: String, message: String },
	#[error("{field} should be {expected}, found {actual}")]
	TypeMismatch {
		field: String,
		expected: String,
		actual: String,
	},
}

impl ValidationError {
	/// Name of the offending field.
	pub fn field(&self) -> &str {
		match self {
			ValidationError::MissingField(field) => field,
			ValidationError::InvalidValue { field, .. } => field,
			ValidationError::TypeMismatch { field, .. } => field,
		}
	}
}

/// Every violation found in one document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
	pub fn single(error: ValidationError) -> Self {
		Self(vec![error])
	}

	/// Names of all offending fields, in schema order.
	pub fn fields(&self) -> Vec<&str> {
		self.0.iter().map(ValidationError::field).collect()
	}
}

impl fmt::Display for ValidationErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
		f.write_str(&messages.join("; "))
	}
}

#[derive(Debug)]
pub enum FieldType {
	String,
	/// Whole number within optional inclusive bounds.
	Integer { min: Option<i64>, max: Option<i64> },
	Boolean,
}

impl FieldType {
	fn check(&self, field: &str, value: &Value) -> Result<(), ValidationError> {
		let mismatch = |expected: &str| ValidationError::TypeMismatch {
			field: field.to_string(),
			expected: expected.to_string(),
			actual: type_name(value).to_string(),
		};
		let out_of_range = |message: String| ValidationError::InvalidValue {
			field: field.to_string(),
			message,
		};

		match self {
			FieldType::String if !value.is_string() => Err(mismatch("string")),
			FieldType::Boolean if !value.is_boolean() => Err(mismatch("boolean")),
			FieldType::Integer { min, max } => {
				let n = value.as_i64().ok_or_else(|| mismatch("integer"))?;
				match (min, max) {
					(Some(lo), _) if n < *lo => Err(out_of_range(format!("{} is below {}", n, lo))),
					(_, Some(hi)) if n > *hi => Err(out_of_range(format!("{} is above {}", n, hi))),
					_ => Ok(()),
				}
			}
			_ => Ok(()),
		}
	}
}

pub type FieldValidator = Box<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

pub struct Field {
	pub name: String,
	pub field_type: FieldType,
	pub validator: Option<FieldValidator>,
}

impl fmt::Debug for Field {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"Field({}: {:?}{})",
			self.name,
			self.field_type,
			if self.validator.is_some() { ", custom" } else { "" }
		)
	}
}

impl Field {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		Self {
			name: name.into(),
			field_type,
			validator: None,
		}
	}

	/// Adds a custom check, run only once the type check passed.
	pub fn with_validator<F>(self, validator: F) -> Self
	where
		F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
	{
		Self {
			validator: Some(Box::new(validator)),
			..self
		}
	}

	fn check(&self, value: &Value) -> Option<ValidationError> {
		if let Err(e) = self.field_type.check(&self.name, value) {
			return Some(e);
		}
		let validator = self.validator.as_ref()?;
		validator(value)
			.err()
			.map(|message| ValidationError::InvalidValue {
				field: self.name.clone(),
				message,
			})
	}
}

/// Required and optional fields of one document kind.
#[derive(Debug)]
pub struct Schema {
	pub required: Vec<Field>,
	pub optional: Vec<Field>,
}

impl Schema {
	pub fn new(required: Vec<Field>, optional: Vec<Field>) -> Self {
		Self { required, optional }
	}

	/// Checks a JSON object, ignoring keys the schema does not name.
	pub fn validate(&self, document: &Value) -> Result<(), ValidationErrors> {
		let Some(object) = document.as_object() else {
			return Err(ValidationErrors::single(ValidationError::TypeMismatch {
				field: "root".to_string(),
				expected: "object".to_string(),
				actual: type_name(document).to_string(),
			}));
		};

		let required = self.required.iter().filter_map(|field| match object.get(&field.name) {
			Some(value) => field.check(value),
			None => Some(ValidationError::MissingField(field.name.clone())),
		});
		let optional = self
			.optional
			.iter()
			.filter_map(|field| object.get(&field.name).and_then(|value| field.check(value)));

		let errors: Vec<ValidationError> = required.chain(optional).collect();
		if errors.is_empty() {
			Ok(())
		} else {
			Err(ValidationErrors(errors))
		}
	}

	/// Checks a TOML table through its JSON form.
	pub fn validate_toml(&self, config: &toml::Value) -> Result<(), ValidationErrors> {
		match serde_json::to_value(config) {
			Ok(document) => self.validate(&document),
			Err(e) => Err(ValidationErrors::single(ValidationError::InvalidValue {
				field: "root".to_string(),
				message: e.to_string(),
			})),
		}
	}
}

fn type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

/// Configuration schema of a pluggable implementation.
pub trait ConfigSchema: Send + Sync {
	/// Validates the implementation's TOML configuration block.
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationErrors>;
}
