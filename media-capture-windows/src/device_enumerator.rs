//! Capture device enumeration via `MFEnumDeviceSources`.
//!
//! Lists video or audio capture sources with their friendly names and
//! symbolic links, and re-activates a media source from a symbolic link.

use std::ffi::c_void;
use std::{ptr, slice};

use windows::core::{GUID, PWSTR};
use windows::Win32::Media::MediaFoundation::*;
use windows::Win32::System::Com::CoTaskMemFree;

use media_capture_core::models::device::{CaptureDevice, DeviceKind};
use media_capture_core::models::error::CaptureError;

/// `IMFActivate` array returned by `MFEnumDeviceSources`.
///
/// Releases every element and frees the array on drop.
struct ActivateList {
    items: *mut Option<IMFActivate>,
    count: u32,
}

impl ActivateList {
    fn as_slice(&self) -> &[Option<IMFActivate>] {
        if self.items.is_null() {
            return &[];
        }
        unsafe { slice::from_raw_parts(self.items, self.count as usize) }
    }
}

impl Drop for ActivateList {
    fn drop(&mut self) {
        if self.items.is_null() {
            return;
        }
        unsafe {
            for i in 0..self.count as usize {
                ptr::drop_in_place(self.items.add(i));
            }
            CoTaskMemFree(Some(self.items as *const c_void));
        }
    }
}

/// Enumerates capture devices of one kind.
///
/// Requires an `MfRuntime` on the calling thread.
pub struct DeviceEnumerator {
    kind: DeviceKind,
    attributes: IMFAttributes,
}

impl DeviceEnumerator {
    pub fn new(kind: DeviceKind) -> Result<Self, CaptureError> {
        let source_type = match kind {
            DeviceKind::Video => MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE_VIDCAP_GUID,
            DeviceKind::Audio => MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE_AUDCAP_GUID,
        };
        unsafe {
            let mut attributes: Option<IMFAttributes> = None;
            MFCreateAttributes(&mut attributes, 1)
                .map_err(|e| CaptureError::EnumerationFailed(format!("MFCreateAttributes failed: {}", e)))?;
            let attributes = attributes
                .ok_or_else(|| CaptureError::EnumerationFailed("MFCreateAttributes returned nothing".into()))?;
            attributes
                .SetGUID(&MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE, &source_type)
                .map_err(|e| CaptureError::EnumerationFailed(format!("SetGUID failed: {}", e)))?;
            Ok(Self { kind, attributes })
        }
    }

    /// List every device. The returned devices carry no COM handle.
    pub fn list(&self) -> Result<Vec<CaptureDevice>, CaptureError> {
        let list = self.enumerate()?;
        let mut devices = Vec::with_capacity(list.count as usize);

        for (index, activate) in list.as_slice().iter().enumerate() {
            let Some(activate) = activate else {
                continue;
            };
            let name = allocated_string(activate, &MF_DEVSOURCE_ATTRIBUTE_FRIENDLY_NAME)
                .unwrap_or_else(|| format!("Device {}", index));
            let symbolic_link = allocated_string(activate, &self.symbolic_link_key()).unwrap_or_else(|| {
                log::warn!("Symbolic link attribute not found for {}", name);
                String::new()
            });
            devices.push(CaptureDevice::new(self.kind, index, name, symbolic_link));
        }

        log::debug!("Found {} {} capture device(s)", devices.len(), self.kind);
        Ok(devices)
    }

    /// Activate the media source whose symbolic link equals `symbolic_link`.
    ///
    /// The enumeration list is released before this returns; the source
    /// stays alive on its own reference.
    pub fn activate(&self, symbolic_link: &str) -> Result<IMFMediaSource, CaptureError> {
        let list = self.enumerate().map_err(|e| CaptureError::DeviceOpenFailure(e.to_string()))?;
        let key = self.symbolic_link_key();

        let activate = list
            .as_slice()
            .iter()
            .flatten()
            .find(|a| allocated_string(a, &key).is_some_and(|link| link.eq_ignore_ascii_case(symbolic_link)))
            .ok_or_else(|| CaptureError::DeviceOpenFailure(format!("device {} is no longer attached", symbolic_link)))?;

        unsafe {
            activate
                .ActivateObject::<IMFMediaSource>()
                .map_err(|e| CaptureError::DeviceOpenFailure(format!("ActivateObject failed: {}", e)))
        }
    }

    fn enumerate(&self) -> Result<ActivateList, CaptureError> {
        let mut list = ActivateList {
            items: ptr::null_mut(),
            count: 0,
        };
        unsafe {
            MFEnumDeviceSources(&self.attributes, &mut list.items, &mut list.count)
                .map_err(|e| CaptureError::EnumerationFailed(format!("MFEnumDeviceSources failed: {}", e)))?;
        }
        Ok(list)
    }

    fn symbolic_link_key(&self) -> GUID {
        match self.kind {
            DeviceKind::Video => MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE_VIDCAP_SYMBOLIC_LINK,
            DeviceKind::Audio => MF_DEVSOURCE_ATTRIBUTE_SOURCE_TYPE_AUDCAP_SYMBOLIC_LINK,
        }
    }
}

/// Read a string attribute allocated by the activation object.
fn allocated_string(activate: &IMFActivate, key: &GUID) -> Option<String> {
    unsafe {
        let mut value = PWSTR::null();
        let mut length = 0u32;
        activate.GetAllocatedString(key, &mut value, &mut length).ok()?;
        let text = value.to_string().ok();
        CoTaskMemFree(Some(value.0 as *const c_void));
        text
    }
}
