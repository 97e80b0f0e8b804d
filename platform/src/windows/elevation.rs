use std::ffi::c_void;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Security::{GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};
use windows::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};
use windrive_core::WindriveError;

/// Whether the process token carries an elevated (Administrator) session.
/// Any failure to read the token counts as not elevated.
pub fn is_elevated() -> bool {
    let mut token = HANDLE::default();
    if let Err(e) = unsafe { OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) } {
        log::debug!("OpenProcessToken failed: {}", e);
        return false;
    }

    let mut elevation = TOKEN_ELEVATION::default();
    let mut written = 0u32;
    let queried = unsafe {
        GetTokenInformation(
            token,
            TokenElevation,
            Some(&mut elevation as *mut TOKEN_ELEVATION as *mut c_void),
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut written,
        )
    };
    unsafe {
        let _ = CloseHandle(token);
    }

    queried
        .map(|_| elevation.TokenIsElevated != 0)
        .unwrap_or_else(|e| {
            log::debug!("GetTokenInformation(TokenElevation) failed: {}", e);
            false
        })
}

/// Log a hint when a device query was refused and the process is not
/// elevated. Raw device handles for performance and cache queries usually
/// need Administrator rights.
pub fn hint_on_access_denied(error: &WindriveError) {
    if matches!(error, WindriveError::AccessDenied(_)) && !is_elevated() {
        log::warn!("{}; re-run as Administrator to query this device", error);
    }
}
