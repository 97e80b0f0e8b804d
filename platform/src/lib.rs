#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod unsupported;

#[cfg(target_os = "windows")]
pub use self::windows::WindowsBackend as PlatformBackend;

#[cfg(not(target_os = "windows"))]
pub use self::unsupported::UnsupportedBackend as PlatformBackend;
