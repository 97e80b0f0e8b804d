use std::ffi::c_void;
use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FILE_FLAGS_AND_ATTRIBUTES, FILE_SHARE_READ, FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows::Win32::System::IO::DeviceIoControl;
use windrive_core::error::win32_code_from_hresult;
use windrive_core::layout::to_wide;
use windrive_core::{ControlCode, WindriveError};

/// An open device handle, closed on drop.
pub struct DeviceHandle {
    handle: HANDLE,
    path: String,
}

impl DeviceHandle {
    /// Open `path` for metadata queries. Both read and write sharing are
    /// requested so the call never conflicts with mounted filesystems.
    pub fn open(path: &str, desired_access: u32) -> Result<Self, WindriveError> {
        let wide = to_wide(path);

        let handle = unsafe {
            CreateFileW(
                PCWSTR(wide.as_ptr()),
                desired_access,
                FILE_SHARE_READ | FILE_SHARE_WRITE,
                None,
                OPEN_EXISTING,
                FILE_FLAGS_AND_ATTRIBUTES(0),
                HANDLE::default(),
            )
        }
        .map_err(|e| {
            let code = win32_code_from_hresult(e.code().0);
            log::debug!("CreateFileW({}) failed with OS error {}", path, code);
            WindriveError::from_os_error(code, path, "open")
        })?;

        Ok(Self {
            handle,
            path: path.to_string(),
        })
    }

    /// Issue `code` with no input buffer and return the output truncated to
    /// the bytes the driver wrote.
    pub fn control(&self, code: ControlCode) -> Result<Vec<u8>, WindriveError> {
        let mut buffer = vec![0u8; code.output_size()];
        let mut returned = 0u32;

        let result = unsafe {
            DeviceIoControl(
                self.handle,
                code.code(),
                None,
                0,
                Some(buffer.as_mut_ptr() as *mut c_void),
                buffer.len() as u32,
                Some(&mut returned as *mut u32),
                None,
            )
        };
        result.map_err(|e| {
            let os_code = win32_code_from_hresult(e.code().0);
            log::debug!("{} on {} failed with OS error {}", code, self.path, os_code);
            WindriveError::from_os_error(os_code, &self.path, code.name())
        })?;

        buffer.truncate(returned as usize);
        log::trace!("{} on {} returned {} bytes", code, self.path, returned);
        Ok(buffer)
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}
