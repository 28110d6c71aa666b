//! Client IPC contract (spec 4.E).
//!
//! Every client socket is represented by an opaque [`ConnHandle`].
//! Service handlers never touch the socket directly: they look up
//! private per-connection state, find a paired connection with
//! [`ConnTable::partner_get`] for routing asynchronous callbacks apart
//! from synchronous replies, and queue replies with
//! [`ConnTable::send_response`]. A connection that can't drain its
//! write queue is given one more tick before it's torn down.

use std::any::Any;
use std::collections::HashMap;
use std::io::{self, Write};

use bytes::BytesMut;
use thiserror::Error;

use availmf_types::ServiceId;

/// Opaque handle to a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnHandle(u64);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcError {
    #[error("connection handle not found")]
    NotFound,
}

/// A socket a [`ConnEntry`] can write to. Implemented for
/// [`mio::net::UnixStream`] in production and for an in-memory buffer
/// in tests.
pub trait Transport {
    fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize>;
}

impl Transport for mio::net::UnixStream {
    fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }
}

/// Bytes still queued past this threshold mark the connection for
/// delayed disconnect.
pub const WRITE_BACKPRESSURE_BYTES: usize = 1 << 20;

struct ConnEntry<T> {
    service: ServiceId,
    stream: T,
    write_buf: BytesMut,
    private_data: Option<Box<dyn Any + Send>>,
    partner: Option<ConnHandle>,
    pending_disconnect: bool,
}

/// Table of live client connections for one service.
pub struct ConnTable<T> {
    conns: HashMap<u64, ConnEntry<T>>,
    next_id: u64,
}

impl<T: Transport> ConnTable<T> {
    pub fn new() -> Self {
        Self { conns: HashMap::new(), next_id: 0 }
    }

    /// Registers a new connection, allocating its private data slot as
    /// empty.
    pub fn conn_init(&mut self, service: ServiceId, stream: T) -> ConnHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.conns.insert(
            id,
            ConnEntry { service, stream, write_buf: BytesMut::new(), private_data: None, partner: None, pending_disconnect: false },
        );
        ConnHandle(id)
    }

    pub fn set_private_data(&mut self, handle: ConnHandle, data: Box<dyn Any + Send>) -> Result<(), IpcError> {
        self.entry_mut(handle)?.private_data = Some(data);
        Ok(())
    }

    pub fn private_data(&self, handle: ConnHandle) -> Result<Option<&(dyn Any + Send)>, IpcError> {
        Ok(self.entry(handle)?.private_data.as_deref())
    }

    /// Links two connections as response/dispatch partners of each
    /// other.
    pub fn set_partner(&mut self, a: ConnHandle, b: ConnHandle) -> Result<(), IpcError> {
        self.entry_mut(a)?.partner = Some(b);
        self.entry_mut(b)?.partner = Some(a);
        Ok(())
    }

    pub fn partner_get(&self, handle: ConnHandle) -> Result<Option<ConnHandle>, IpcError> {
        Ok(self.entry(handle)?.partner)
    }

    pub fn service(&self, handle: ConnHandle) -> Result<ServiceId, IpcError> {
        Ok(self.entry(handle)?.service)
    }

    /// Enqueues `bytes` and attempts a non-blocking write. If the
    /// backlog exceeds [`WRITE_BACKPRESSURE_BYTES`] after the attempt,
    /// the connection is marked for delayed disconnect.
    pub fn send_response(&mut self, handle: ConnHandle, bytes: &[u8]) -> Result<(), IpcError> {
        let entry = self.entry_mut(handle)?;
        entry.write_buf.extend_from_slice(bytes);
        drain(entry);
        if entry.write_buf.len() > WRITE_BACKPRESSURE_BYTES {
            entry.pending_disconnect = true;
        }
        Ok(())
    }

    /// Drives one event-loop tick: drains pending writes, and tears
    /// down every connection that was already marked pending from the
    /// previous tick, invoking `on_exit` for each.
    pub fn tick(&mut self, mut on_exit: impl FnMut(ConnHandle, ServiceId)) {
        let mut to_remove = Vec::new();
        for (&id, entry) in self.conns.iter_mut() {
            drain(entry);
            if entry.pending_disconnect {
                to_remove.push(id);
            }
        }
        for id in to_remove {
            if let Some(entry) = self.conns.remove(&id) {
                on_exit(ConnHandle(id), entry.service);
            }
        }
    }

    fn entry(&self, handle: ConnHandle) -> Result<&ConnEntry<T>, IpcError> {
        self.conns.get(&handle.0).ok_or(IpcError::NotFound)
    }

    fn entry_mut(&mut self, handle: ConnHandle) -> Result<&mut ConnEntry<T>, IpcError> {
        self.conns.get_mut(&handle.0).ok_or(IpcError::NotFound)
    }
}

impl<T: Transport> Default for ConnTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn drain<T: Transport>(entry: &mut ConnEntry<T>) {
    while !entry.write_buf.is_empty() {
        match entry.stream.write_nonblocking(&entry.write_buf) {
            Ok(0) => break,
            Ok(n) => {
                let _ = entry.write_buf.split_to(n);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                tracing::warn!(error = %e, "connection write failed, marking for delayed disconnect");
                entry.pending_disconnect = true;
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemTransport {
        written: Vec<u8>,
        block_after: Option<usize>,
    }

    impl Transport for MemTransport {
        fn write_nonblocking(&mut self, buf: &[u8]) -> io::Result<usize> {
            if let Some(limit) = self.block_after {
                if self.written.len() >= limit {
                    return Err(io::Error::from(io::ErrorKind::WouldBlock));
                }
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
    }

    #[test]
    fn send_response_writes_immediately_when_not_blocked() {
        let mut table: ConnTable<MemTransport> = ConnTable::new();
        let handle = table.conn_init(ServiceId::Ckpt, MemTransport::default());
        table.send_response(handle, b"hello").unwrap();
        assert_eq!(table.entry(handle).unwrap().stream.written, b"hello");
        assert!(table.entry(handle).unwrap().write_buf.is_empty());
    }

    #[test]
    fn partner_link_is_bidirectional() {
        let mut table: ConnTable<MemTransport> = ConnTable::new();
        let a = table.conn_init(ServiceId::Amf, MemTransport::default());
        let b = table.conn_init(ServiceId::Amf, MemTransport::default());
        table.set_partner(a, b).unwrap();
        assert_eq!(table.partner_get(a).unwrap(), Some(b));
        assert_eq!(table.partner_get(b).unwrap(), Some(a));
    }

    #[test]
    fn backpressure_marks_for_delayed_disconnect_then_tears_down_next_tick() {
        let mut table: ConnTable<MemTransport> = ConnTable::new();
        let handle = table.conn_init(ServiceId::Ckpt, MemTransport { block_after: Some(0), ..Default::default() });
        let big = vec![0u8; WRITE_BACKPRESSURE_BYTES + 1];
        table.send_response(handle, &big).unwrap();
        assert!(table.entry(handle).unwrap().pending_disconnect);

        let mut exited = Vec::new();
        table.tick(|h, s| exited.push((h, s)));
        assert_eq!(exited, vec![(handle, ServiceId::Ckpt)]);
        assert!(table.private_data(handle).is_err(), "connection should be gone after tick");
    }

    #[test]
    fn private_data_roundtrips() {
        let mut table: ConnTable<MemTransport> = ConnTable::new();
        let handle = table.conn_init(ServiceId::Amf, MemTransport::default());
        table.set_private_data(handle, Box::new(42u32)).unwrap();
        let data = table.private_data(handle).unwrap().unwrap();
        assert_eq!(data.downcast_ref::<u32>(), Some(&42));
    }
}
