//! Known downstream devices
//!
//! Source addresses seen on the link, in order of first appearance. The set
//! only grows for the lifetime of a session.

/// Append-only, insertion-ordered set of device addresses
#[derive(Debug, Clone)]
pub struct KnownDevices {
    order: Vec<u8>,
    seen: [bool; 256],
}

impl KnownDevices {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            seen: [false; 256],
        }
    }

    /// Record an address; returns true if it was not known yet
    pub fn insert(&mut self, address: u8) -> bool {
        let slot = &mut self.seen[address as usize];
        if *slot {
            return false;
        }
        *slot = true;
        self.order.push(address);
        true
    }

    pub fn contains(&self, address: u8) -> bool {
        self.seen[address as usize]
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Addresses in order of first appearance
    pub fn as_slice(&self) -> &[u8] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.order.iter().copied()
    }
}

impl Default for KnownDevices {
    fn default() -> Self {
        Self::new()
    }
}
