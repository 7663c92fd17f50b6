// In-process transport straight into an emulator bank

use tracing::debug;

use super::RegisterTransport;
use crate::emulator::EmulatorBank;
use crate::error::TransportError;

/// Talks to emulated axes living in the same process
#[derive(Clone)]
pub struct LocalTransport {
    bank: EmulatorBank,
    online: bool,
}

impl LocalTransport {
    pub fn new(bank: EmulatorBank) -> Self {
        Self {
            bank,
            online: false,
        }
    }

    fn ensure_online(&self) -> Result<(), TransportError> {
        if self.online {
            Ok(())
        } else {
            Err(TransportError::Link("local link closed".to_string()))
        }
    }
}

impl RegisterTransport for LocalTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        debug!("Local transport attached to units {:?}", self.bank.units());
        self.online = true;
        Ok(())
    }

    fn close(&mut self) {
        self.online = false;
    }

    fn read_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, TransportError> {
        self.ensure_online()?;
        let axis = self.bank.axis(unit)?;
        let words = axis.lock().read_registers(address, count as usize)?;
        Ok(words)
    }

    fn write_registers(
        &mut self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), TransportError> {
        self.ensure_online()?;
        let axis = self.bank.axis(unit)?;
        axis.lock().write_registers(address, values)?;
        Ok(())
    }
}
