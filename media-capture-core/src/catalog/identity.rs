//! Vendor/product code extraction from symbolic device identifiers.

use std::sync::LazyLock;

use regex::Regex;

static VENDOR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vid_([0-9a-f]{4})").expect("valid vendor pattern"));

static PRODUCT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)pid_([0-9a-f]{4})").expect("valid product pattern"));

/// USB vendor and product codes of a device.
///
/// Either code is an empty string when the identifier does not carry it
/// (virtual cameras, non-USB devices). Callers must tolerate that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: String,
    pub product_id: String,
}

impl DeviceIdentity {
    /// Parse `vid_XXXX` / `pid_XXXX` out of a symbolic link.
    ///
    /// Codes are returned as they appear in the identifier.
    pub fn parse(symbolic_link: &str) -> Self {
        let capture = |pattern: &Regex| {
            pattern
                .captures(symbolic_link)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        let identity = Self {
            vendor_id: capture(&VENDOR_PATTERN),
            product_id: capture(&PRODUCT_PATTERN),
        };
        if identity.vendor_id.is_empty() {
            log::debug!("vendor id not found in {:?}", symbolic_link);
        }
        if identity.product_id.is_empty() {
            log::debug!("product id not found in {:?}", symbolic_link);
        }
        identity
    }

    pub fn is_empty(&self) -> bool {
        self.vendor_id.is_empty() && self.product_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_usb_camera_link() {
        let id = DeviceIdentity::parse(
            r"\\?\usb#vid_046d&pid_085b&mi_00#7&1a2b3c4d&0&0000#{e5323777-f976-4f5b-9b55-b94699c46e44}\global",
        );
        assert_eq!(id.vendor_id, "046d");
        assert_eq!(id.product_id, "085b");
    }

    #[test]
    fn case_insensitive_prefix_and_digits() {
        let id = DeviceIdentity::parse(r"\\?\USB#VID_1BCF&PID_2B8A&MI_00#6&ABC");
        assert_eq!(id.vendor_id, "1BCF");
        assert_eq!(id.product_id, "2B8A");
    }

    #[test]
    fn missing_codes_are_empty() {
        let id = DeviceIdentity::parse(r"\\?\root#image#0000#{e5323777}");
        assert_eq!(id, DeviceIdentity::default());
        assert!(id.is_empty());

        assert!(DeviceIdentity::parse("").is_empty());
    }

    #[test]
    fn requires_four_hex_digits() {
        let id = DeviceIdentity::parse("usb#vid_04&pid_zz12");
        assert!(id.is_empty());
    }
}
