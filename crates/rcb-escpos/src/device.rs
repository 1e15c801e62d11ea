use std::{
    fs,
    path::{Path, PathBuf},
};

/// Locate the `usblp` character device for a USB printer.
///
/// Each `class/usbmisc/lpN` entry links to the USB interface; the parent of
/// that interface carries the `idVendor`/`idProduct` attributes.
pub fn find_usblp_device(
    sys_root: &Path,
    dev_root: &Path,
    vendor: u16,
    product: u16,
) -> Option<PathBuf> {
    let rd = fs::read_dir(sys_root.join("class/usbmisc")).ok()?;

    let mut names: Vec<String> = rd
        .flatten()
        .map(|ent| ent.file_name().to_string_lossy().to_string())
        .filter(|name| name.starts_with("lp"))
        .collect();
    names.sort();

    names.into_iter().find_map(|name| {
        let usb_dev = sys_root
            .join("class/usbmisc")
            .join(&name)
            .join("device")
            .join("..");
        let matches = read_hex_attr(&usb_dev.join("idVendor")) == Some(vendor)
            && read_hex_attr(&usb_dev.join("idProduct")) == Some(product);
        matches.then(|| dev_root.join("usb").join(&name))
    })
}

fn read_hex_attr(path: &Path) -> Option<u16> {
    let raw = fs::read_to_string(path).ok()?;
    u16::from_str_radix(raw.trim(), 16).ok()
}
