//! COM + Media Foundation lifetime guard.

use std::marker::PhantomData;

use windows::Win32::Media::MediaFoundation::{MFShutdown, MFStartup, MFSTARTUP_FULL, MF_VERSION};
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use media_capture_core::models::error::CaptureError;

/// Keeps COM and Media Foundation initialized on the current thread.
///
/// `CoInitializeEx` + `MFStartup` on creation, `MFShutdown` +
/// `CoUninitialize` on drop. Both calls are reference counted by the
/// system, so every reader and writer holds its own guard. Not `Send`:
/// the guard must be dropped on the thread that created it.
pub struct MfRuntime {
    _thread_bound: PhantomData<*const ()>,
}

impl MfRuntime {
    pub fn new() -> Result<Self, CaptureError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| CaptureError::Unknown(format!("CoInitializeEx failed: {}", e)))?;

            if let Err(e) = MFStartup(MF_VERSION, MFSTARTUP_FULL) {
                CoUninitialize();
                return Err(CaptureError::Unknown(format!("MFStartup failed: {}", e)));
            }
        }
        Ok(Self {
            _thread_bound: PhantomData,
        })
    }
}

impl Drop for MfRuntime {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = MFShutdown() {
                log::warn!("MFShutdown failed: {}", e);
            }
            CoUninitialize();
        }
    }
}
