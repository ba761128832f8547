use crate::prelude::*;

use std::io::{Read, Write};

use super::request::ClientMessage;
use super::wire;

/// Inbound lines larger than this are nonsense for this protocol.
const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Debug, Copy, Clone)]
pub(super) enum State {
    /// Connected but not yet joined; only `join` is acceptable.
    Pending,
    Play,
}

#[derive(Debug)]
pub struct Inbox<'a>(pub(super) &'a mut Client);

impl Inbox<'_> {
    pub fn submit(&mut self, response: Response) {
        response.encode(&mut self.0.output);
        self.0.waiting_for_write = true;
    }
    pub fn reborrow(&mut self) -> Inbox<'_> {
        Inbox(self.0)
    }
}

pub struct Client {
    conn: TcpStream,
    pub(super) state: State,
    input: Vec<u8>,
    output: Vec<u8>,
    output_cursor: usize,

    pub(super) waiting_for_write: bool,
}

impl Client {
    pub(super) fn is_playing(&self) -> bool {
        matches!(self.state, State::Play)
    }
    pub(super) fn conn(&self) -> &TcpStream {
        &self.conn
    }
    pub(super) fn inbox(&mut self) -> Inbox<'_> {
        Inbox(self)
    }
    pub fn accept(conn: TcpStream) -> io::Result<Self> {
        conn.set_nonblocking(true)?;
        Ok(Self {
            conn,
            state: State::Pending,
            input: vec![],
            output: vec![],
            output_cursor: 0,
            waiting_for_write: false,
        })
    }

    /// Flushes as much of the output buffer as the socket will take right
    /// now; the rest waits for the next writable event.
    pub(super) fn write(&mut self) -> Result<(), Disconnection> {
        while self.output_cursor < self.output.len() {
            match self.conn.write(&self.output[self.output_cursor..]) {
                Ok(0) => return Err(Disconnection),
                Ok(n) => self.output_cursor += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.waiting_for_write = true;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::debug!("write error: {e}");
                    return Err(Disconnection);
                }
            }
        }
        self.output.clear();
        self.output_cursor = 0;
        Ok(())
    }

    /// Reads everything the socket has, dispatching each complete line.
    /// Partial lines carry over to the next readable event.
    pub fn read(network: &mut super::Network, world: &mut crate::World, pid: usize) -> Result<(), Disconnection> {
        loop {
            let mut chunk = [0u8; 4096];
            let client = network.clients.get(pid).ok_or(Disconnection)?;
            match client.conn.read(&mut chunk) {
                Ok(0) => return Err(Disconnection),
                Ok(n) => {
                    client.input.extend_from_slice(&chunk[..n]);
                    if client.input.len() > MAX_LINE_BYTES {
                        log::debug!("client {pid} overflowed the input buffer");
                        return Err(Disconnection);
                    }
                    loop {
                        let client = network.clients.get(pid).ok_or(Disconnection)?;
                        let Some(line) = wire::take_line(&mut client.input) else { break };
                        if line.is_empty() {
                            continue;
                        }
                        Self::dispatch(network, world, pid, &line)?;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) if e.kind() == io::ErrorKind::ConnectionReset => return Err(Disconnection),
                Err(e) => {
                    log::debug!("read error from client {pid}: {e}");
                    return Err(Disconnection);
                }
            }
        }
    }

    fn dispatch(
        network: &mut super::Network,
        world: &mut crate::World,
        pid: usize,
        line: &[u8],
    ) -> Result<(), Disconnection> {
        let message: ClientMessage = wire::decode(line)?;
        let state = network.clients.get(pid).ok_or(Disconnection)?.state;
        match state {
            State::Pending => match message {
                ClientMessage::Join { uid, name } if !uid.is_empty() => {
                    let client = network.clients.get(pid).ok_or(Disconnection)?;
                    client.state = State::Play;
                    world.login(pid, uid, name, Inbox(client));
                    Ok(())
                }
                _ => {
                    log::debug!("client {pid} spoke before joining");
                    Err(Disconnection)
                }
            },
            State::Play => world.play_request(pid, super::Inboxes(network), message),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields = f.debug_struct("Client");
        if let Ok(addr) = self.conn.peer_addr() {
            fields.field("conn", &addr);
        }
        fields.field("state", &self.state);
        fields.finish()
    }
}
