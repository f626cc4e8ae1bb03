use exam_core::model::{ExamId, FinishReason};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn exam_id_to_i64(id: ExamId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("exam_id overflow".into()))
}

pub(crate) fn exam_id_from_i64(v: i64) -> Result<ExamId, StorageError> {
    u64::try_from(v)
        .map(ExamId::new)
        .map_err(|_| StorageError::Serialization("exam_id sign overflow".into()))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn parse_finish_reason(s: &str) -> Result<FinishReason, StorageError> {
    match s {
        "submitted" => Ok(FinishReason::Submitted),
        "timed_out" => Ok(FinishReason::TimedOut),
        _ => Err(StorageError::Serialization(format!(
            "invalid finish_reason: {s}"
        ))),
    }
}
