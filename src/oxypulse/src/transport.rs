use std::{future::Future, io, time::Duration};

use tokio::io::AsyncReadExt;
use tokio_serial::{SerialPortBuilderExt, SerialPortType, SerialStream};

use crate::ConnectionError;

/// Opens a connection to the oximeter.
pub trait Transport: Send + Sync + 'static {
    type Connection: DeviceConnection;

    fn open(
        &self,
        baud_rate: u32,
    ) -> impl Future<Output = Result<Self::Connection, ConnectionError>> + Send;

    fn name(&self) -> String;
}

/// An open byte stream from the device.
pub trait DeviceConnection: Send + 'static {
    /// Reads the next chunk into `buf`. `Ok(0)` means the device closed the
    /// stream. Must be safe to cancel.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Releases the device. A second call does nothing.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}

pub struct SerialTransport {
    port: String,
}

impl SerialTransport {
    pub fn new(port: impl Into<String>) -> Self {
        Self { port: port.into() }
    }
}

impl Transport for SerialTransport {
    type Connection = SerialConnection;

    async fn open(&self, baud_rate: u32) -> Result<SerialConnection, ConnectionError> {
        let stream = tokio_serial::new(&self.port, baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|source| ConnectionError::Open {
                port: self.port.clone(),
                source,
            })?;

        info!("Opened {} at {} baud", self.port, baud_rate);
        Ok(SerialConnection {
            port: self.port.clone(),
            stream: Some(stream),
        })
    }

    fn name(&self) -> String {
        self.port.clone()
    }
}

pub struct SerialConnection {
    port: String,
    stream: Option<SerialStream>,
}

impl DeviceConnection for SerialConnection {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.read(buf).await,
            None => Ok(0),
        }
    }

    async fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Closed {}", self.port);
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

/// Serial ports present on this machine.
pub fn list_ports() -> Result<Vec<PortInfo>, ConnectionError> {
    let ports = tokio_serial::available_ports().map_err(ConnectionError::Ports)?;

    Ok(ports
        .into_iter()
        .map(|port| {
            let description = match port.port_type {
                SerialPortType::UsbPort(usb) => format!(
                    "USB {:04x}:{:04x} {}",
                    usb.vid,
                    usb.pid,
                    usb.product.unwrap_or_default()
                ),
                SerialPortType::PciPort => "PCI".to_owned(),
                SerialPortType::BluetoothPort => "Bluetooth".to_owned(),
                SerialPortType::Unknown => "Unknown".to_owned(),
            };

            PortInfo {
                name: port.port_name,
                description,
            }
        })
        .collect())
}
