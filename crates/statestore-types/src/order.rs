//! Order record and stored envelope types.
//!
//! An order travels through the system in two shapes: the [`OrderRecord`]
//! exchanged with HTTP clients, and the [`StateEntry`] envelope that wraps it
//! under its state key when persisted. The persisted form is always a JSON
//! array containing a single entry.

use crate::StateKey;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Errors raised while decoding an inbound order body.
#[derive(Debug, Error)]
pub enum OrderDecodeError {
	/// The body was not a JSON order object.
	#[error("Failed to read JSON data: {0}")]
	Malformed(#[from] serde_json::Error),
}

/// How malformed order bodies are treated.
///
/// `Lenient` logs the failure and continues with a zero-valued record,
/// `Strict` rejects the body. An empty body is accepted under both policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodePolicy {
	#[default]
	Lenient,
	Strict,
}

/// Identifier payload of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
	/// Opaque order identifier, empty when the client omitted it.
	#[serde(rename = "orderId", default, deserialize_with = "null_as_default")]
	pub order_id: String,
}

/// An order as submitted by clients: `{"data":{"orderId":"..."}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
	#[serde(default, deserialize_with = "null_as_default")]
	pub data: OrderData,
}

impl OrderRecord {
	/// Creates a record carrying the given order id.
	pub fn new(order_id: impl Into<String>) -> Self {
		Self {
			data: OrderData {
				order_id: order_id.into(),
			},
		}
	}

	/// Returns the order identifier.
	pub fn order_id(&self) -> &str {
		&self.data.order_id
	}

	/// Decodes the first JSON value of a request body into a record.
	///
	/// Content after the first value is ignored. An empty or whitespace-only
	/// body, as well as a literal `null`, yields the zero-valued record under
	/// either policy. A malformed body yields the zero-valued record under
	/// [`DecodePolicy::Lenient`] and an error under [`DecodePolicy::Strict`].
	pub fn decode(body: &[u8], policy: DecodePolicy) -> Result<Self, OrderDecodeError> {
		let first = serde_json::Deserializer::from_slice(body)
			.into_iter::<Option<OrderRecord>>()
			.next();

		match first {
			None | Some(Ok(None)) => Ok(Self::default()),
			Some(Ok(Some(record))) => Ok(record),
			Some(Err(e)) => match policy {
				DecodePolicy::Lenient => {
					tracing::warn!(error = %e, "Failed to read JSON data, continuing with an empty order");
					Ok(Self::default())
				},
				DecodePolicy::Strict => Err(OrderDecodeError::Malformed(e)),
			},
		}
	}
}

/// Key-wrapped representation of an order as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
	pub key: String,
	pub value: OrderRecord,
}

impl StateEntry {
	/// Wraps a record under the fixed order key.
	pub fn for_order(record: OrderRecord) -> Self {
		Self {
			key: StateKey::Order.as_str().to_string(),
			value: record,
		}
	}
}

/// Serializes entries as the JSON array written to the store.
pub fn encode_entries(entries: &[StateEntry]) -> Result<Vec<u8>, serde_json::Error> {
	serde_json::to_vec(entries)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
	D: Deserializer<'de>,
	T: Default + Deserialize<'de>,
{
	Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
