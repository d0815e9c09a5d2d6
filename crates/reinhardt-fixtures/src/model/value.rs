//! Typed field values and record instances.
//!
//! Values arriving from a fixture are first read as loosely typed
//! [`FieldValue`]s and then coerced to the declared [`FieldKind`] of their
//! field. Coercion is a pure function of `(value, kind)` and is idempotent.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use uuid::Uuid;

use super::{FieldKind, ModelId};

const DATETIME_FORMATS: &[&str] = &[
	"%Y-%m-%dT%H:%M:%S%.f",
	"%Y-%m-%d %H:%M:%S%.f",
	"%Y-%m-%dT%H:%M",
	"%Y-%m-%d %H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Surrogate identifier assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SurrogateId {
	/// Integer primary key.
	Int(i64),
	/// UUID primary key.
	Uuid(Uuid),
	/// Any other textual primary key.
	Text(String),
}

impl SurrogateId {
	/// Reads an identifier from a fixture value.
	///
	/// Numbers must fit in `i64`. Strings holding an integer become
	/// [`SurrogateId::Int`] and strings that parse as UUIDs become
	/// [`SurrogateId::Uuid`].
	pub fn from_json(value: &Value) -> Option<Self> {
		match value {
			Value::Number(n) => n.as_i64().map(Self::Int),
			Value::String(s) => Some(Self::from(s.as_str())),
			_ => None,
		}
	}

	/// Converts the identifier to its fixture representation.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Int(i) => Value::from(*i),
			Self::Uuid(u) => Value::String(u.to_string()),
			Self::Text(s) => Value::String(s.clone()),
		}
	}
}

impl From<i64> for SurrogateId {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<Uuid> for SurrogateId {
	fn from(value: Uuid) -> Self {
		Self::Uuid(value)
	}
}

impl From<&str> for SurrogateId {
	fn from(value: &str) -> Self {
		if let Ok(i) = value.parse::<i64>() {
			return Self::Int(i);
		}
		match Uuid::parse_str(value) {
			Ok(uuid) => Self::Uuid(uuid),
			Err(_) => Self::Text(value.to_string()),
		}
	}
}

impl fmt::Display for SurrogateId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(i) => write!(f, "{}", i),
			Self::Uuid(u) => write!(f, "{}", u),
			Self::Text(s) => write!(f, "{}", s),
		}
	}
}

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	/// SQL NULL.
	Null,
	/// Boolean value.
	Boolean(bool),
	/// Integer value.
	Integer(i64),
	/// Floating point value.
	Float(f64),
	/// Text value.
	String(String),
	/// Timestamp.
	DateTime(NaiveDateTime),
	/// Calendar date.
	Date(NaiveDate),
	/// Resolved single-valued relation.
	Ref(SurrogateId),
	/// Resolved multi-valued relation.
	RefList(Vec<SurrogateId>),
}

impl FieldValue {
	/// Reads a scalar fixture value without applying any declared kind.
	///
	/// Arrays and objects have no scalar reading and return `None`.
	pub fn from_json(value: &Value) -> Option<Self> {
		match value {
			Value::Null => Some(Self::Null),
			Value::Bool(b) => Some(Self::Boolean(*b)),
			Value::Number(n) => match n.as_i64() {
				Some(i) => Some(Self::Integer(i)),
				None => n.as_f64().map(Self::Float),
			},
			Value::String(s) => Some(Self::String(s.clone())),
			Value::Array(_) | Value::Object(_) => None,
		}
	}

	/// Converts the value to its fixture representation.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Null => Value::Null,
			Self::Boolean(b) => Value::Bool(*b),
			Self::Integer(i) => Value::from(*i),
			Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
			Self::String(s) => Value::String(s.clone()),
			Self::DateTime(dt) => Value::String(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
			Self::Date(d) => Value::String(d.format(DATE_FORMAT).to_string()),
			Self::Ref(id) => id.to_json(),
			Self::RefList(ids) => Value::Array(ids.iter().map(SurrogateId::to_json).collect()),
		}
	}

	/// Returns true for [`FieldValue::Null`].
	pub fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Coerces the value to `kind`.
	///
	/// Returns `None` when the value has no faithful reading as `kind`.
	/// `Null` is passed through for every kind; whether null is allowed is
	/// a property of the field, not of the kind.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures::model::{FieldKind, FieldValue};
	/// let count = FieldValue::String("42".into()).coerce_to(&FieldKind::Integer);
	/// assert_eq!(count, Some(FieldValue::Integer(42)));
	///
	/// let weight = FieldValue::String("1.2".into()).coerce_to(&FieldKind::Float);
	/// assert_eq!(weight, Some(FieldValue::Float(1.2)));
	///
	/// // Already coerced values are left alone.
	/// assert_eq!(
	///     FieldValue::Integer(42).coerce_to(&FieldKind::Integer),
	///     Some(FieldValue::Integer(42))
	/// );
	/// ```
	pub fn coerce_to(&self, kind: &FieldKind) -> Option<FieldValue> {
		if self.is_null() {
			return Some(Self::Null);
		}

		match kind {
			FieldKind::Integer => match self {
				Self::Integer(i) => Some(Self::Integer(*i)),
				Self::String(s) => s.trim().parse::<i64>().ok().map(Self::Integer),
				Self::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
					Some(Self::Integer(*f as i64))
				}
				_ => None,
			},
			FieldKind::Float => match self {
				Self::Float(f) => Some(Self::Float(*f)),
				Self::Integer(i) => Some(Self::Float(*i as f64)),
				Self::String(s) => s
					.trim()
					.parse::<f64>()
					.ok()
					.filter(|f| f.is_finite())
					.map(Self::Float),
				_ => None,
			},
			FieldKind::String => match self {
				Self::String(s) => Some(Self::String(s.clone())),
				Self::Integer(i) => Some(Self::String(i.to_string())),
				Self::Float(f) => Some(Self::String(f.to_string())),
				Self::Boolean(b) => Some(Self::String(b.to_string())),
				_ => None,
			},
			FieldKind::Boolean => match self {
				Self::Boolean(b) => Some(Self::Boolean(*b)),
				Self::Integer(0) => Some(Self::Boolean(false)),
				Self::Integer(1) => Some(Self::Boolean(true)),
				Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
					"true" | "t" | "1" => Some(Self::Boolean(true)),
					"false" | "f" | "0" => Some(Self::Boolean(false)),
					_ => None,
				},
				_ => None,
			},
			FieldKind::DateTime => match self {
				Self::DateTime(dt) => Some(Self::DateTime(*dt)),
				Self::Date(d) => Some(Self::DateTime(d.and_time(NaiveTime::MIN))),
				Self::String(s) => parse_datetime(s.trim()).map(Self::DateTime),
				_ => None,
			},
			FieldKind::Date => match self {
				Self::Date(d) => Some(Self::Date(*d)),
				Self::DateTime(dt) => Some(Self::Date(dt.date())),
				Self::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
					.ok()
					.map(Self::Date),
				_ => None,
			},
			FieldKind::ForeignKey { .. } => match self {
				Self::Ref(id) => Some(Self::Ref(id.clone())),
				Self::Integer(i) => Some(Self::Ref(SurrogateId::Int(*i))),
				Self::String(s) => Some(Self::Ref(SurrogateId::from(s.as_str()))),
				_ => None,
			},
			FieldKind::ManyToMany { .. } => match self {
				Self::RefList(ids) => Some(Self::RefList(ids.clone())),
				_ => None,
			},
		}
	}

	/// Compares two values for natural ordering.
	///
	/// Values of different variants order by variant; floats use total
	/// ordering.
	pub(crate) fn ordering_cmp(&self, other: &Self) -> std::cmp::Ordering {
		use std::cmp::Ordering;
		match (self, other) {
			(Self::Null, Self::Null) => Ordering::Equal,
			(Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
			(Self::Integer(a), Self::Integer(b)) => a.cmp(b),
			(Self::Float(a), Self::Float(b)) => a.total_cmp(b),
			(Self::Integer(a), Self::Float(b)) => (*a as f64).total_cmp(b),
			(Self::Float(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
			(Self::String(a), Self::String(b)) => a.cmp(b),
			(Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
			(Self::Date(a), Self::Date(b)) => a.cmp(b),
			(Self::Ref(a), Self::Ref(b)) => a.cmp(b),
			(Self::RefList(a), Self::RefList(b)) => a.cmp(b),
			_ => self.rank().cmp(&other.rank()),
		}
	}

	fn rank(&self) -> u8 {
		match self {
			Self::Null => 0,
			Self::Boolean(_) => 1,
			Self::Integer(_) | Self::Float(_) => 2,
			Self::String(_) => 3,
			Self::DateTime(_) => 4,
			Self::Date(_) => 5,
			Self::Ref(_) => 6,
			Self::RefList(_) => 7,
		}
	}
}

impl fmt::Display for FieldValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_json())
	}
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
		return Some(dt.naive_utc());
	}
	DATETIME_FORMATS
		.iter()
		.find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
		.or_else(|| {
			NaiveDate::parse_from_str(raw, DATE_FORMAT)
				.ok()
				.map(|d| d.and_time(NaiveTime::MIN))
		})
}

/// The natural key of one instance.
#[derive(Debug, Clone, PartialEq)]
pub struct NaturalKeyValue(pub Vec<FieldValue>);

impl NaturalKeyValue {
	/// Converts the key to its fixture representation (a JSON array).
	pub fn to_json(&self) -> Value {
		Value::Array(self.0.iter().map(FieldValue::to_json).collect())
	}

	/// Key values in order.
	pub fn values(&self) -> &[FieldValue] {
		&self.0
	}
}

impl fmt::Display for NaturalKeyValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.to_json())
	}
}

/// One record instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
	/// Model the record belongs to.
	pub model: ModelId,
	/// Surrogate identifier, if assigned.
	pub pk: Option<SurrogateId>,
	/// Field values by name.
	pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
	/// Creates an empty record without a primary key.
	pub fn new(model: ModelId) -> Self {
		Self {
			model,
			pk: None,
			fields: BTreeMap::new(),
		}
	}

	/// Creates an empty record with a primary key.
	pub fn with_pk(model: ModelId, pk: impl Into<SurrogateId>) -> Self {
		Self {
			model,
			pk: Some(pk.into()),
			fields: BTreeMap::new(),
		}
	}

	/// Adds a field value, builder style.
	pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
		self.fields.insert(name.into(), value);
		self
	}

	/// Sets a field value.
	pub fn set(&mut self, name: impl Into<String>, value: FieldValue) {
		self.fields.insert(name.into(), value);
	}

	/// Returns a field value.
	pub fn get(&self, name: &str) -> Option<&FieldValue> {
		self.fields.get(name)
	}
}
