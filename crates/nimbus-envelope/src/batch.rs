//! Batch envelope for stream-style event sources.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::EnvelopeError;
use crate::serialization::SerializationConfig;
use crate::Envelope;

/// Status of one record in a batch envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordStatus {
    /// Not yet extracted or packed.
    Pending,
    /// Payload extracted from the record body.
    Extracted,
    /// Payload packed back into the record body.
    Packed,
    /// Extraction, handling, or packing failed for this record.
    Failed(String),
}

/// One record of a batch event.
#[derive(Debug, Clone)]
pub struct BatchRecord<T> {
    body: Vec<u8>,
    payload: Option<T>,
    status: RecordStatus,
}

impl<T> BatchRecord<T> {
    fn from_body(body: Vec<u8>) -> Self {
        Self {
            body,
            payload: None,
            status: RecordStatus::Pending,
        }
    }

    fn from_payload(payload: T) -> Self {
        Self {
            body: Vec::new(),
            payload: Some(payload),
            status: RecordStatus::Pending,
        }
    }

    /// The record's typed payload, if extracted.
    pub fn payload(&self) -> Option<&T> {
        self.payload.as_ref()
    }

    /// The record's native body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The record's current status.
    pub fn status(&self) -> &RecordStatus {
        &self.status
    }
}

/// Envelope for batched event sources with multiple independent records.
///
/// Extraction and packing apply per record: a malformed record is marked
/// [`RecordStatus::Failed`] without corrupting sibling records. Retry of
/// failed records is a platform concern, not handled here.
#[derive(Debug, Clone)]
pub struct BatchEnvelope<T> {
    records: Vec<BatchRecord<T>>,
}

impl<T> Default for BatchEnvelope<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T> BatchEnvelope<T> {
    /// Create a batch from per-record bodies.
    pub fn from_bodies(bodies: Vec<Vec<u8>>) -> Self {
        Self {
            records: bodies.into_iter().map(BatchRecord::from_body).collect(),
        }
    }

    /// Create a batch from a single native body holding a JSON array of records.
    pub fn from_body(body: &[u8]) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| EnvelopeError::PayloadDeserialization(e.to_string()))?;
        let items = match value {
            Value::Array(items) => items,
            _ => {
                return Err(EnvelopeError::PayloadDeserialization(
                    "batch body is not a JSON array".to_string(),
                ))
            }
        };
        let bodies = items
            .into_iter()
            .map(|item| {
                serde_json::to_vec(&item)
                    .map_err(|e| EnvelopeError::PayloadDeserialization(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_bodies(bodies))
    }

    /// Create a batch from typed payloads awaiting packing.
    pub fn from_payloads(payloads: Vec<T>) -> Self {
        Self {
            records: payloads.into_iter().map(BatchRecord::from_payload).collect(),
        }
    }

    /// All records in delivery order.
    pub fn records(&self) -> &[BatchRecord<T>] {
        &self.records
    }

    /// Iterate the successfully extracted payloads with their record indexes.
    pub fn payloads(&self) -> impl Iterator<Item = (usize, &T)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(i, record)| record.payload.as_ref().map(|p| (i, p)))
    }

    /// Take the successfully extracted payloads with their record indexes.
    pub fn take_payloads(&mut self) -> Vec<(usize, T)> {
        self.records
            .iter_mut()
            .enumerate()
            .filter_map(|(i, record)| record.payload.take().map(|p| (i, p)))
            .collect()
    }

    /// Append a record awaiting packing.
    pub fn push_payload(&mut self, payload: T) {
        self.records.push(BatchRecord::from_payload(payload));
    }

    /// Append a failed placeholder record, keeping sibling positions aligned.
    pub fn push_failure(&mut self, reason: impl Into<String>) {
        self.records.push(BatchRecord {
            body: Vec::new(),
            payload: None,
            status: RecordStatus::Failed(reason.into()),
        });
    }

    /// Consume the batch into per-record payload results, in delivery order.
    pub fn into_payload_results(self) -> Vec<Result<T, String>> {
        self.records
            .into_iter()
            .map(|record| match (record.payload, record.status) {
                (Some(payload), _) => Ok(payload),
                (None, RecordStatus::Failed(reason)) => Err(reason),
                (None, _) => Err("no payload".to_string()),
            })
            .collect()
    }

    /// Mark a record as failed outside extraction, e.g. by the handler.
    pub fn fail_record(&mut self, index: usize, reason: impl Into<String>) {
        if let Some(record) = self.records.get_mut(index) {
            record.status = RecordStatus::Failed(reason.into());
            record.payload = None;
        }
    }

    /// Indexes and reasons of failed records.
    pub fn failures(&self) -> Vec<(usize, &str)> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(i, record)| match &record.status {
                RecordStatus::Failed(reason) => Some((i, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Whether any record has failed.
    pub fn has_failures(&self) -> bool {
        self.records
            .iter()
            .any(|record| matches!(record.status, RecordStatus::Failed(_)))
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize the packed record bodies into one JSON array body.
    ///
    /// Failed records appear as `null` placeholders so sibling positions
    /// stay aligned with the incoming batch.
    pub fn into_body(self) -> Result<Vec<u8>, EnvelopeError> {
        let items = self
            .records
            .into_iter()
            .map(|record| match record.status {
                RecordStatus::Packed => serde_json::from_slice(&record.body)
                    .map_err(|e| EnvelopeError::PayloadSerialization(e.to_string())),
                _ => Ok(Value::Null),
            })
            .collect::<Result<Vec<Value>, _>>()?;
        serde_json::to_vec(&Value::Array(items))
            .map_err(|e| EnvelopeError::PayloadSerialization(e.to_string()))
    }
}

impl<T> Envelope for BatchEnvelope<T>
where
    T: Serialize + DeserializeOwned,
{
    type Payload = T;

    fn extract_payload(&mut self, config: &SerializationConfig) -> Result<(), EnvelopeError> {
        for record in &mut self.records {
            match config.decode::<T>(&record.body) {
                Ok(payload) => {
                    record.payload = Some(payload);
                    record.status = RecordStatus::Extracted;
                }
                Err(err) => {
                    record.payload = None;
                    record.status = RecordStatus::Failed(err.to_string());
                }
            }
        }
        Ok(())
    }

    fn pack_payload(&mut self, config: &SerializationConfig) -> Result<(), EnvelopeError> {
        for record in &mut self.records {
            if matches!(record.status, RecordStatus::Failed(_)) {
                continue;
            }
            match record.payload.as_ref() {
                Some(payload) => match config.encode(payload) {
                    Ok(body) => {
                        record.body = body;
                        record.status = RecordStatus::Packed;
                    }
                    Err(err) => {
                        record.status = RecordStatus::Failed(err.to_string());
                    }
                },
                None => {
                    record.status = RecordStatus::Failed("no payload to pack".to_string());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Reading {
        sensor: String,
        value: i64,
    }

    fn batch_bodies() -> Vec<Vec<u8>> {
        vec![
            br#"{"sensor":"a","value":1}"#.to_vec(),
            br#"not json"#.to_vec(),
            br#"{"sensor":"c","value":3}"#.to_vec(),
        ]
    }

    #[test]
    fn test_extract_isolates_record_failures() {
        let config = SerializationConfig::new();
        let mut batch = BatchEnvelope::<Reading>::from_bodies(batch_bodies());

        batch.extract_payload(&config).unwrap();

        let extracted: Vec<_> = batch.payloads().collect();
        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted[0].0, 0);
        assert_eq!(extracted[1].0, 2);

        let failures = batch.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(*batch.records()[0].status(), RecordStatus::Extracted);
    }

    #[test]
    fn test_from_body_requires_array() {
        let err = BatchEnvelope::<Reading>::from_body(br#"{"sensor":"a"}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::PayloadDeserialization(_)));
    }

    #[test]
    fn test_pack_keeps_failed_records_as_null() {
        let config = SerializationConfig::new();
        let mut batch = BatchEnvelope::from_payloads(vec![
            Reading {
                sensor: "a".to_string(),
                value: 1,
            },
            Reading {
                sensor: "b".to_string(),
                value: 2,
            },
        ]);
        batch.fail_record(1, "handler rejected");
        batch.pack_payload(&config).unwrap();

        let body = batch.into_body().unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value[0]["sensor"], "a");
        assert!(value[1].is_null());
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let config = SerializationConfig::new();
        let payloads = vec![
            Reading {
                sensor: "a".to_string(),
                value: 1,
            },
            Reading {
                sensor: "b".to_string(),
                value: 2,
            },
        ];

        let mut out = BatchEnvelope::from_payloads(payloads.clone());
        out.pack_payload(&config).unwrap();
        let body = out.into_body().unwrap();

        let mut back = BatchEnvelope::<Reading>::from_body(&body).unwrap();
        back.extract_payload(&config).unwrap();
        let restored: Vec<_> = back.take_payloads().into_iter().map(|(_, p)| p).collect();
        assert_eq!(restored, payloads);
    }
}
