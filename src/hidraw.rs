// SPDX-License-Identifier: MIT

//! Transport layer for the Linux hidraw character devices, a thin wrapper
//! around the `HIDIOC*` ioctls from `linux/hidraw.h` plus plain reads and
//! writes for Input/Output report exchange. See hidraw(4).

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use nix::libc::c_int;
use tracing::debug;

use crate::{ensure, Error, Result};

/// `HID_MAX_DESCRIPTOR_SIZE`, the kernel cap on descriptor length.
const MAX_DESCRIPTOR_SIZE: usize = 4096;

/// Longest name/phys string the kernel is asked for.
const MAX_STRING_SIZE: usize = 256;

/// `struct hidraw_report_descriptor`.
#[repr(C)]
struct RawReportDescriptor {
    size: u32,
    value: [u8; MAX_DESCRIPTOR_SIZE],
}

/// `struct hidraw_devinfo`: the bus type and the vendor/product pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct DevInfo {
    pub bustype: u32,
    pub vendor: u16,
    pub product: u16,
}

impl std::fmt::Display for DevInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bus {} vendor 0x{:04X} product 0x{:04X}",
            bus_name(self.bustype),
            self.vendor,
            self.product
        )
    }
}

/// Bus type constants from `linux/input.h`.
fn bus_name(bustype: u32) -> String {
    match bustype {
        0x03 => "USB".into(),
        0x05 => "Bluetooth".into(),
        0x06 => "Virtual".into(),
        0x18 => "I2C".into(),
        0x1C => "SPI".into(),
        n => format!("0x{n:02X}"),
    }
}

mod ioctl {
    use super::{DevInfo, RawReportDescriptor};
    use nix::libc::c_int;

    nix::ioctl_read!(hidiocgrdescsize, b'H', 0x01, c_int);
    nix::ioctl_read!(hidiocgrdesc, b'H', 0x02, RawReportDescriptor);
    nix::ioctl_read!(hidiocgrawinfo, b'H', 0x03, DevInfo);
    nix::ioctl_read_buf!(hidiocgrawname, b'H', 0x04, u8);
    nix::ioctl_read_buf!(hidiocgrawphys, b'H', 0x05, u8);
    nix::ioctl_readwrite_buf!(hidiocsfeature, b'H', 0x06, u8);
    nix::ioctl_readwrite_buf!(hidiocgfeature, b'H', 0x07, u8);
}

fn io_error(op: &str, errno: nix::errno::Errno) -> Error {
    Error::io(op, std::io::Error::from_raw_os_error(errno as i32))
}

/// Everything up to the first NUL, lossily decoded.
fn from_nul_terminated(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// An open hidraw device node.
#[derive(Debug)]
pub struct Device {
    file: File,
}

impl Device {
    /// Open the device node at `path` for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Device> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::io(format!("failed to open '{}'", path.display()), e))?;
        debug!(path = %path.display(), "opened hidraw device");
        Ok(Device { file })
    }

    fn fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }

    /// The length in bytes of the device's report descriptor.
    pub fn report_descriptor_size(&self) -> Result<usize> {
        let mut size: c_int = 0;
        unsafe { ioctl::hidiocgrdescsize(self.fd(), &mut size) }
            .map_err(|e| io_error("failed to get report descriptor size", e))?;
        Ok(size as usize)
    }

    /// The device's report descriptor bytes, exactly as the kernel
    /// returns them.
    pub fn report_descriptor(&self) -> Result<Vec<u8>> {
        let size = self.report_descriptor_size()?.min(MAX_DESCRIPTOR_SIZE);
        let mut raw = RawReportDescriptor {
            size: size as u32,
            value: [0; MAX_DESCRIPTOR_SIZE],
        };
        unsafe { ioctl::hidiocgrdesc(self.fd(), &mut raw) }
            .map_err(|e| io_error("failed to get report descriptor", e))?;
        debug!(len = size, "read report descriptor");
        Ok(raw.value[..size].to_vec())
    }

    /// The device name as reported by the kernel.
    pub fn name(&self) -> Result<String> {
        let mut buf = [0u8; MAX_STRING_SIZE];
        unsafe { ioctl::hidiocgrawname(self.fd(), &mut buf) }
            .map_err(|e| io_error("failed to get device name", e))?;
        Ok(from_nul_terminated(&buf))
    }

    /// The physical address string, e.g. the USB port path.
    pub fn phys(&self) -> Result<String> {
        let mut buf = [0u8; MAX_STRING_SIZE];
        unsafe { ioctl::hidiocgrawphys(self.fd(), &mut buf) }
            .map_err(|e| io_error("failed to get physical address", e))?;
        Ok(from_nul_terminated(&buf))
    }

    /// Bus type and vendor/product IDs.
    pub fn info(&self) -> Result<DevInfo> {
        let mut info = DevInfo::default();
        unsafe { ioctl::hidiocgrawinfo(self.fd(), &mut info) }
            .map_err(|e| io_error("failed to get device info", e))?;
        Ok(info)
    }

    /// Fetch a feature report. `buf[0]` must hold the Report ID (0 for
    /// devices without IDs); the kernel fills the remainder. Returns the
    /// number of bytes transferred; a short transfer is an error.
    pub fn feature_get(&self, buf: &mut [u8]) -> Result<usize> {
        ensure!(
            !buf.is_empty(),
            Error::InvalidArgument("feature buffer must not be empty".into())
        );
        let expected = buf.len();
        let n = unsafe { ioctl::hidiocgfeature(self.fd(), buf) }
            .map_err(|e| io_error("failed to get feature report", e))? as usize;
        debug!(report_id = buf[0], len = n, "fetched feature report");
        ensure!(
            n >= expected,
            Error::ProtocolShort {
                op: "get feature report".into(),
                expected,
                actual: n,
            }
        );
        Ok(n)
    }

    /// Send a feature report. `buf[0]` must hold the Report ID; the whole
    /// buffer is consumed by the device.
    pub fn feature_set(&self, buf: &[u8]) -> Result<usize> {
        ensure!(
            !buf.is_empty(),
            Error::InvalidArgument("feature buffer must not be empty".into())
        );
        let mut copy = buf.to_vec();
        let n = unsafe { ioctl::hidiocsfeature(self.fd(), &mut copy) }
            .map_err(|e| io_error("failed to set feature report", e))? as usize;
        debug!(report_id = buf[0], len = n, "sent feature report");
        ensure!(
            n >= buf.len(),
            Error::ProtocolShort {
                op: "set feature report".into(),
                expected: buf.len(),
                actual: n,
            }
        );
        Ok(n)
    }

    /// Write one Output report to the data channel.
    pub fn write_report(&mut self, buf: &[u8]) -> Result<usize> {
        let n = self
            .file
            .write(buf)
            .map_err(|e| Error::io("failed to write output report", e))?;
        ensure!(
            n == buf.len(),
            Error::ProtocolShort {
                op: "write output report".into(),
                expected: buf.len(),
                actual: n,
            }
        );
        Ok(n)
    }

    /// Read one Input report from the data channel, blocking until the
    /// device produces one. Returns the number of bytes read.
    pub fn read_report(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.file
            .read(buf)
            .map_err(|e| Error::io("failed to read input report", e))
    }
}
