use windows::core::PCWSTR;
use windows::Win32::Storage::FileSystem::{
    GetDiskFreeSpaceW, GetDriveTypeW, GetLogicalDriveStringsW, QueryDosDeviceW,
};
use windrive_core::error::win32_code_from_hresult;
use windrive_core::layout::{split_multi_sz, to_wide};
use windrive_core::{ClusterStats, DosDevices, DriveType, LogicalDrive, WindriveError};

const ERROR_FILE_NOT_FOUND: i32 = 2;
const ERROR_INSUFFICIENT_BUFFER: i32 = 122;

/// Starting size of the `QueryDosDeviceW` name list, in UTF-16 units.
const DOS_DEVICE_BUFFER: usize = 16 * 1024;
/// Give up growing past this; the device table is never this large.
const DOS_DEVICE_BUFFER_LIMIT: usize = 4 * 1024 * 1024;

fn last_os_error() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Every root string reported by `GetLogicalDriveStringsW`, classified.
pub fn logical_drives() -> Result<Vec<LogicalDrive>, WindriveError> {
    let roots = logical_drive_strings()?;
    log::debug!("Found {} logical drive roots", roots.len());

    Ok(roots
        .into_iter()
        .map(|root| {
            let wide = to_wide(&root);
            let drive_type = DriveType::from_raw(unsafe { GetDriveTypeW(PCWSTR(wide.as_ptr())) });

            let clusters = match drive_type {
                DriveType::Cdrom => None,
                _ => cluster_stats(&root, &wide),
            };
            log::debug!("{} is {}", root, drive_type.as_str());

            LogicalDrive::new(root, drive_type, clusters)
        })
        .collect())
}

fn logical_drive_strings() -> Result<Vec<String>, WindriveError> {
    // A zero-length probe returns the size needed, including the final NUL.
    let needed = unsafe { GetLogicalDriveStringsW(None) } as usize;
    if needed == 0 {
        return Err(WindriveError::enumeration(
            "GetLogicalDriveStringsW",
            last_os_error() as u32,
        ));
    }

    // Slack for a drive mounted between the two calls.
    let mut buffer = vec![0u16; needed + 4];
    let written = unsafe { GetLogicalDriveStringsW(Some(&mut buffer)) } as usize;
    if written == 0 {
        return Err(WindriveError::enumeration(
            "GetLogicalDriveStringsW",
            last_os_error() as u32,
        ));
    }
    if written > buffer.len() {
        return Err(WindriveError::SystemQuery(format!(
            "GetLogicalDriveStringsW needs {} units after reporting {}",
            written, needed
        )));
    }

    Ok(split_multi_sz(&buffer[..written]))
}

/// `None` when the root has no accessible filesystem (empty card reader,
/// unformatted volume) or reports zero bytes per sector.
fn cluster_stats(root: &str, wide: &[u16]) -> Option<ClusterStats> {
    let mut sectors_per_cluster = 0u32;
    let mut bytes_per_sector = 0u32;
    let mut free_clusters = 0u32;
    let mut total_clusters = 0u32;

    let result = unsafe {
        GetDiskFreeSpaceW(
            PCWSTR(wide.as_ptr()),
            Some(&mut sectors_per_cluster as *mut u32),
            Some(&mut bytes_per_sector as *mut u32),
            Some(&mut free_clusters as *mut u32),
            Some(&mut total_clusters as *mut u32),
        )
    };

    if let Err(e) = result {
        log::debug!(
            "GetDiskFreeSpaceW({}) failed with OS error {}",
            root,
            win32_code_from_hresult(e.code().0)
        );
        return None;
    }
    if bytes_per_sector == 0 {
        return None;
    }

    Some(ClusterStats::new(
        sectors_per_cluster,
        bytes_per_sector,
        free_clusters,
        total_clusters,
    ))
}

/// Every DOS device name mapped to the first target it resolves to.
pub fn dos_devices() -> Result<DosDevices, WindriveError> {
    let names = dos_device_names()?;
    let mut devices = DosDevices::new();
    let mut target = vec![0u16; 4096];

    for name in names {
        let wide = to_wide(&name);
        loop {
            let written = unsafe { QueryDosDeviceW(PCWSTR(wide.as_ptr()), Some(&mut target)) } as usize;
            if written != 0 {
                if let Some(first) = split_multi_sz(&target[..written]).into_iter().next() {
                    devices.insert(name.clone(), first);
                }
                break;
            }

            match last_os_error() {
                ERROR_INSUFFICIENT_BUFFER if target.len() < DOS_DEVICE_BUFFER_LIMIT => {
                    let grown = target.len() * 2;
                    target.resize(grown, 0);
                }
                ERROR_FILE_NOT_FOUND => {
                    log::debug!("DOS device {} disappeared during enumeration", name);
                    break;
                }
                code => {
                    return Err(WindriveError::SystemQuery(format!(
                        "QueryDosDeviceW({}) failed with OS error {}",
                        name, code
                    )))
                }
            }
        }
    }

    log::debug!("Resolved {} DOS devices", devices.len());
    Ok(devices)
}

fn dos_device_names() -> Result<Vec<String>, WindriveError> {
    let mut buffer = vec![0u16; DOS_DEVICE_BUFFER];

    loop {
        let written = unsafe { QueryDosDeviceW(PCWSTR::null(), Some(&mut buffer)) } as usize;
        if written != 0 {
            return Ok(split_multi_sz(&buffer[..written]));
        }

        match last_os_error() {
            ERROR_INSUFFICIENT_BUFFER if buffer.len() < DOS_DEVICE_BUFFER_LIMIT => {
                let grown = buffer.len() * 2;
                log::trace!("Growing DOS device name buffer to {} units", grown);
                buffer.resize(grown, 0);
            }
            code => return Err(WindriveError::enumeration("QueryDosDeviceW", code as u32)),
        }
    }
}
