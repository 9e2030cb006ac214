//! Read-only vendor/product name lookup parsed from a `usb.ids` file.
//!
//! Format (tab-indented):
//! ```text
//! # comment
//! 046d  Logitech, Inc.
//! 	085b  C925e
//! 		00  interface name (ignored)
//! C 00  (Defined at Interface level)
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Vendor and product names keyed by upper-case hex IDs.
#[derive(Debug, Clone, Default)]
pub struct UsbIdTable {
    vendors: HashMap<String, String>,
    products: HashMap<(String, String), String>,
}

impl UsbIdTable {
    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let mut table = Self::default();
        let mut current_vendor: Option<String> = None;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let depth = line.chars().take_while(|c| *c == '\t').count();
            let Some((id, name)) = split_entry(trimmed) else {
                if depth == 0 {
                    current_vendor = None;
                }
                continue;
            };

            match depth {
                0 => {
                    table.vendors.insert(id.clone(), name);
                    current_vendor = Some(id);
                }
                1 => {
                    if let Some(vendor) = &current_vendor {
                        table.products.insert((vendor.clone(), id), name);
                    }
                }
                _ => {}
            }
        }

        table
    }

    pub fn vendor_name(&self, vendor_id: &str) -> Option<&str> {
        self.vendors.get(&vendor_id.to_uppercase()).map(String::as_str)
    }

    pub fn product_name(&self, vendor_id: &str, product_id: &str) -> Option<&str> {
        self.products
            .get(&(vendor_id.to_uppercase(), product_id.to_uppercase()))
            .map(String::as_str)
    }

    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}

/// Split `"046d  Logitech, Inc."` into `("046D", "Logitech, Inc.")`.
///
/// Only four-hex-digit IDs with a non-empty name qualify.
fn split_entry(line: &str) -> Option<(String, String)> {
    let (id, rest) = line.split_once(char::is_whitespace)?;
    if id.len() != 4 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let name = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return None;
    }
    Some((id.to_uppercase(), name))
}
