/// Tests for the platform device backend
/// On Windows these run against the real device tables; elsewhere they check
/// that every call is refused cleanly.

#[cfg(target_os = "windows")]
mod windows_backend_tests {
    use windrive_core::{DiskInfoProvider, DriveInspector, DriveType, ErrorKind};
    use windrive_platform::PlatformBackend;

    #[tokio::test]
    async fn test_logical_drives_are_enumerated() {
        let inspector = DriveInspector::new(PlatformBackend::new());
        let drives = inspector.logical_drives().await;

        assert!(drives.is_ok(), "Drive enumeration failed: {:?}", drives);
        let drives = drives.unwrap();
        assert!(!drives.is_empty(), "No logical drives found!");

        for drive in &drives {
            println!("Found drive: {} ({})", drive.name, drive.drive_type().as_str());
            if drive.drive_type() == DriveType::Cdrom {
                assert!(drive.clusters().is_none(),
                    "Optical drive {} carries cluster statistics", drive.name);
            }
        }
    }

    #[tokio::test]
    async fn test_drive_names_normalize_idempotently() {
        let inspector = DriveInspector::new(PlatformBackend::new());

        for drive in inspector.logical_drives().await.unwrap() {
            let once = windrive_core::drive::normalize(&drive.name).unwrap();
            let twice = windrive_core::drive::normalize(&once).unwrap();
            assert_eq!(once, twice, "normalize is not idempotent for {}", drive.name);
        }
    }

    #[tokio::test]
    async fn test_geometry_for_every_drive() {
        let inspector = DriveInspector::new(PlatformBackend::new());

        for drive in inspector.logical_drives().await.unwrap() {
            match inspector.device_geometry(&drive.name).await {
                Ok(geometry) => {
                    println!("{}: {} bytes, {} bytes/sector",
                        drive.name, geometry.disk_size, geometry.bytes_per_sector);
                }
                Err(e) if drive.drive_type() == DriveType::Cdrom => {
                    assert_eq!(e.kind(), ErrorKind::UnsupportedOperation,
                        "Optical drive {} failed unexpectedly: {}", drive.name, e);
                }
                // Remote and removable drives may refuse the request or be
                // locked by another process.
                Err(e) => println!("{}: geometry unavailable: {}", drive.name, e),
            }
        }
    }

    #[tokio::test]
    async fn test_dos_devices_include_drive_letters() {
        let inspector = DriveInspector::new(PlatformBackend::new());
        let devices = inspector.dos_devices().await.unwrap();

        assert!(!devices.is_empty(), "No DOS devices found!");
        let drives = inspector.logical_drives().await.unwrap();
        for drive in drives {
            let letter = windrive_core::drive::normalize(&drive.name).unwrap();
            assert!(devices.contains_key(&letter),
                "Drive {} has no DOS device entry", letter);
        }
    }

    #[test]
    fn test_elevation_check_is_stable() {
        let elevated = windrive_platform::windows::is_elevated();
        println!("Running elevated: {}", elevated);
        assert_eq!(windrive_platform::windows::is_elevated(), elevated);
    }

    #[tokio::test]
    async fn test_missing_device_is_not_found() {
        let inspector = DriveInspector::new(PlatformBackend::new());
        let err = inspector.device_performance("PhysicalDrive999").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeviceNotFound);
    }
}

#[cfg(not(target_os = "windows"))]
mod unsupported_backend_tests {
    use windrive_core::{
        ControlCode, DeviceBackend, DiskInfoProvider, DriveInspector, ErrorKind,
    };
    use windrive_platform::PlatformBackend;

    #[test]
    fn test_backend_refuses_control_codes() {
        let backend = PlatformBackend::new();
        let err = backend
            .control(r"\\.\C:", ControlCode::DiskPerformance)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
        assert!(err.to_string().contains("requires Windows"));
    }

    #[test]
    fn test_enumeration_is_unsupported_off_windows() {
        let inspector = DriveInspector::new(PlatformBackend::new());
        let err = tokio_test::block_on(inspector.logical_drives()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    }

    #[tokio::test]
    async fn test_invalid_identifier_fails_before_the_backend() {
        let inspector = DriveInspector::new(PlatformBackend::new());
        let err = inspector.disk_cache_information("").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
