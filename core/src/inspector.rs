//! Async dispatch of device queries onto a bounded pool of blocking workers.

use crate::drive::{self, DosDevices, LogicalDrive};
use crate::{
    ControlCode, DeviceBackend, DeviceGeometry, DevicePerformance, DiskCacheInformation, ErrorKind,
    InspectorConfig, WindriveError,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// The public query surface. Every call is independent: nothing is cached and
/// no handle outlives the call that opened it.
#[async_trait]
pub trait DiskInfoProvider: Send + Sync {
    async fn logical_drives(&self) -> Result<Vec<LogicalDrive>, WindriveError>;
    async fn dos_devices(&self) -> Result<DosDevices, WindriveError>;
    async fn device_performance(&self, identifier: &str) -> Result<DevicePerformance, WindriveError>;
    async fn device_geometry(&self, identifier: &str) -> Result<DeviceGeometry, WindriveError>;
    async fn disk_cache_information(
        &self,
        identifier: &str,
    ) -> Result<DiskCacheInformation, WindriveError>;

    /// Enumerate logical drives, then run the three metadata queries for each
    /// drive concurrently. Per-query failures are kept in the report; only a
    /// failed enumeration fails the survey.
    async fn survey(&self) -> Result<Vec<DriveReport>, WindriveError> {
        let drives = self.logical_drives().await?;
        let mut reports = Vec::with_capacity(drives.len());

        for drive in drives {
            let (performance, geometry, cache) = tokio::join!(
                self.device_performance(&drive.name),
                self.device_geometry(&drive.name),
                self.disk_cache_information(&drive.name),
            );
            reports.push(DriveReport {
                drive,
                performance: performance.into(),
                geometry: geometry.into(),
                cache: cache.into(),
            });
        }

        Ok(reports)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryOutcome<T> {
    Ok(T),
    Error { kind: ErrorKind, message: String },
}

impl<T> QueryOutcome<T> {
    pub fn ok(&self) -> Option<&T> {
        match self {
            QueryOutcome::Ok(value) => Some(value),
            QueryOutcome::Error { .. } => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            QueryOutcome::Ok(_) => None,
            QueryOutcome::Error { kind, .. } => Some(*kind),
        }
    }
}

impl<T> From<Result<T, WindriveError>> for QueryOutcome<T> {
    fn from(result: Result<T, WindriveError>) -> Self {
        match result {
            Ok(value) => QueryOutcome::Ok(value),
            Err(e) => QueryOutcome::Error {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriveReport {
    pub drive: LogicalDrive,
    pub performance: QueryOutcome<DevicePerformance>,
    pub geometry: QueryOutcome<DeviceGeometry>,
    pub cache: QueryOutcome<DiskCacheInformation>,
}

/// Runs each query on `spawn_blocking`, at most `max_concurrent_queries` at a
/// time. The timeout starts before a slot is acquired. The permit moves into
/// the worker, so a call that timed out keeps its slot until the OS call
/// actually returns.
pub struct DriveInspector<B: DeviceBackend> {
    backend: Arc<B>,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl<B: DeviceBackend> Clone for DriveInspector<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            permits: Arc::clone(&self.permits),
            timeout: self.timeout,
        }
    }
}

impl<B: DeviceBackend> DriveInspector<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &InspectorConfig::default())
    }

    pub fn with_config(backend: B, config: &InspectorConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            permits: Arc::new(Semaphore::new(config.max_concurrent_queries.max(1))),
            timeout: config.query_timeout(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn dispatch<T, F>(
        &self,
        operation: &'static str,
        device: Option<&str>,
        job: F,
    ) -> Result<T, WindriveError>
    where
        T: Send + 'static,
        F: FnOnce(&B) -> Result<T, WindriveError> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let backend = Arc::clone(&self.backend);
        let started = Instant::now();

        // The deadline covers waiting for a slot as well as the OS call.
        let run = async move {
            let permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return Err(WindriveError::SystemQuery(
                        "query worker pool is closed".to_string(),
                    ))
                }
            };

            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                job(&backend)
            })
            .await
            .unwrap_or_else(|e| {
                Err(WindriveError::SystemQuery(format!(
                    "{} worker failed: {}",
                    operation, e
                )))
            })
        };

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(operation, device, ?limit, "query timed out");
                    let reason = format!("{} timed out after {:?}", operation, limit);
                    return Err(match device {
                        Some(device) => WindriveError::DeviceNotFound {
                            device: device.to_string(),
                            reason,
                        },
                        None => WindriveError::SystemQuery(reason),
                    });
                }
            },
            None => run.await,
        };

        match &result {
            Ok(_) => tracing::debug!(operation, device, elapsed = ?started.elapsed(), "query completed"),
            Err(e) => tracing::debug!(operation, device, kind = ?e.kind(), error = %e, "query failed"),
        }
        result
    }

    async fn query<T, D>(&self, identifier: &str, code: ControlCode, decode: D) -> Result<T, WindriveError>
    where
        T: Send + 'static,
        D: FnOnce(&[u8]) -> Result<T, WindriveError> + Send + 'static,
    {
        let normalized = drive::normalize(identifier)?;
        let path = drive::device_path(&normalized);
        let target = path.clone();

        self.dispatch(code.name(), Some(&path), move |backend| {
            let raw = backend.control(&target, code)?;
            decode(&raw)
        })
        .await
    }
}

#[async_trait]
impl<B: DeviceBackend> DiskInfoProvider for DriveInspector<B> {
    async fn logical_drives(&self) -> Result<Vec<LogicalDrive>, WindriveError> {
        self.dispatch("GetLogicalDriveStrings", None, |backend| backend.logical_drives())
            .await
    }

    async fn dos_devices(&self) -> Result<DosDevices, WindriveError> {
        self.dispatch("QueryDosDevice", None, |backend| backend.dos_devices())
            .await
    }

    async fn device_performance(&self, identifier: &str) -> Result<DevicePerformance, WindriveError> {
        self.query(identifier, ControlCode::DiskPerformance, |raw| {
            DevicePerformance::decode(raw, Utc::now())
        })
        .await
    }

    async fn device_geometry(&self, identifier: &str) -> Result<DeviceGeometry, WindriveError> {
        self.query(identifier, ControlCode::DriveGeometryEx, DeviceGeometry::decode)
            .await
    }

    async fn disk_cache_information(
        &self,
        identifier: &str,
    ) -> Result<DiskCacheInformation, WindriveError> {
        self.query(identifier, ControlCode::CacheInformation, DiskCacheInformation::decode)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBackend;

    #[tokio::test]
    async fn test_identifier_is_normalized_before_dispatch() {
        let backend = MockBackend::new();
        let inspector = DriveInspector::new(backend.clone());

        inspector.device_performance("C:\\").await.unwrap();

        assert_eq!(
            backend.calls(),
            vec![(r"\\.\C:".to_string(), ControlCode::DiskPerformance)]
        );
    }

    #[tokio::test]
    async fn test_invalid_identifier_never_reaches_backend() {
        let backend = MockBackend::new();
        let inspector = DriveInspector::new(backend.clone());

        let err = inspector.device_geometry("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_outcome_from_result() {
        let ok = QueryOutcome::from(Ok::<u32, WindriveError>(7));
        assert_eq!(ok.ok(), Some(&7));
        assert_eq!(ok.error_kind(), None);

        let failed = QueryOutcome::<u32>::from(Err(WindriveError::AccessDenied(
            "open on \\\\.\\C:".to_string(),
        )));
        assert_eq!(failed.ok(), None);
        assert_eq!(failed.error_kind(), Some(ErrorKind::AccessDenied));
    }
}
