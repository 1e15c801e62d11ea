//! ESC/POS printer adapter.
//!
//! This crate implements the `rcb-core` PrinterSink over a Linux `usblp`
//! character device.

use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

pub mod device;
pub mod encoder;

use rcb_core::{
    config::{profile_max_dimension, Config},
    errors::Error,
    job::PrintJob,
    ports::PrinterSink,
    Result,
};

/// Where print jobs are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrinterTarget {
    /// An explicit device node (or any writable file).
    Device(PathBuf),
    /// The `usblp` device matching a USB vendor/product id, looked up per job.
    Usb { vendor: u16, product: u16 },
}

pub struct EscPosPrinter {
    target: PrinterTarget,
    // One job fully flushed before the next starts.
    write_lock: Mutex<()>,
}

impl EscPosPrinter {
    pub fn new(target: PrinterTarget) -> Self {
        Self {
            target,
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        if profile_max_dimension(&cfg.printer_profile).is_none() {
            tracing::warn!(
                profile = %cfg.printer_profile,
                max_dimension = cfg.printer_max_dimension,
                "unknown printer profile, using default width"
            );
        }

        let target = match &cfg.printer_device {
            Some(path) => PrinterTarget::Device(path.clone()),
            None => PrinterTarget::Usb {
                vendor: cfg.printer_vendor,
                product: cfg.printer_product,
            },
        };
        Self::new(target)
    }

    pub fn target(&self) -> &PrinterTarget {
        &self.target
    }

    /// Resolve the device path for the next write.
    pub fn resolve(&self) -> Result<PathBuf> {
        match &self.target {
            PrinterTarget::Device(path) => Ok(path.clone()),
            PrinterTarget::Usb { vendor, product } => {
                device::find_usblp_device(Path::new("/sys"), Path::new("/dev"), *vendor, *product)
                    .ok_or_else(|| {
                        Error::Printer(format!(
                            "no usblp device for USB id {vendor:04x}:{product:04x}"
                        ))
                    })
            }
        }
    }
}

#[async_trait]
impl PrinterSink for EscPosPrinter {
    async fn print(&self, job: &PrintJob) -> Result<()> {
        let bytes = encoder::encode_job(job);

        let _guard = self.write_lock.lock().await;
        let path = self.resolve()?;
        tracing::debug!(device = %path.display(), bytes = bytes.len(), "writing print job");

        tokio::task::spawn_blocking(move || write_device(&path, &bytes))
            .await
            .map_err(|e| Error::Printer(format!("write task failed: {e}")))?
    }
}

fn write_device(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut dev = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| Error::Printer(format!("open {}: {e}", path.display())))?;
    dev.write_all(bytes)
        .and_then(|_| dev.flush())
        .map_err(|e| Error::Printer(format!("write {}: {e}", path.display())))
}
