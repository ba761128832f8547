use crate::prelude::*;

pub mod client;
mod inboxes;
mod request;
mod response;
pub mod wire;

pub use inboxes::Inboxes;
pub use response::Response;

#[derive(Debug)]
pub struct Network {
    pub(super) listener: std::net::TcpListener,

    pub(super) poller: polling::Poller,
    pub(super) events: Vec<polling::Event>,

    pub(super) clients: SlotMap<client::Client>,
}

const LISTENER: usize = usize::MAX - 1;

impl Network {
    pub fn new(listen_addr: &str) -> io::Result<Self> {
        let poller = polling::Poller::new()?;

        let listener = std::net::TcpListener::bind(listen_addr)?;
        listener.set_nonblocking(true)?;
        poller.add(&listener, polling::Event::readable(LISTENER))?;
        log::info!("listening on {listen_addr}");
        Ok(Self {
            listener,
            poller,
            events: vec![],
            clients: SlotMap::new(),
        })
    }

    /// Drives client sockets until the next tick is due.
    pub fn process_packets_until(&mut self, deadline: time::Instant, world: &mut crate::World) {
        loop {
            let timeout = match deadline.checked_duration_since(time::Instant::now()) {
                Some(v) => Some(v),
                None => return,
            };
            match self.poller.wait(&mut self.events, timeout) {
                Ok(0) => return,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    log::error!("poll failed: {e}");
                    return;
                }
            }
            while let Some(event) = self.events.pop() {
                if event.key == LISTENER {
                    self.poller
                        .modify(&self.listener, polling::Event::readable(LISTENER))
                        .expect("unable to listen for connecting clients. network down?");
                    self.accept_clients();
                    continue;
                }

                let Some(client) = self.clients.get(event.key) else { continue };
                let was_waiting_for_write = core::mem::take(&mut client.waiting_for_write);

                if event.readable {
                    // may queue responses and set the waiting_for_write flag
                    if client::Client::read(self, world, event.key).is_err() {
                        self.drop_client(event.key, world);
                        continue;
                    }
                }
                let Some(client) = self.clients.get(event.key) else { continue };
                if event.writable && client.write().is_err() {
                    self.drop_client(event.key, world);
                    continue;
                }
                let Some(client) = self.clients.get(event.key) else { continue };
                let interest = polling::Event {
                    key: event.key,
                    readable: true,
                    writable: client.waiting_for_write || (was_waiting_for_write && !event.writable),
                };
                if let Err(e) = self.poller.modify(client.conn(), interest) {
                    log::error!("lost track of client {}: {e}", event.key);
                    self.drop_client(event.key, world);
                }
            }
        }
    }

    fn accept_clients(&mut self) {
        loop {
            match self.listener.accept() {
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    log::error!("failed to accept a connection: {e}");
                    break;
                }
                Ok((conn, addr)) => {
                    let key = self.clients.next_idx();
                    let registered = client::Client::accept(conn).and_then(|client| {
                        self.poller.add(client.conn(), polling::Event::readable(key))?;
                        Ok(client)
                    });
                    match registered {
                        Ok(client) => {
                            let idx = self.clients.insert(client);
                            log::debug!("new connection from {addr} as client {idx}");
                        }
                        Err(e) => log::warn!("failed to set up connection from {addr}: {e}"),
                    }
                }
            }
        }
    }

    fn drop_client(&mut self, key: usize, world: &mut crate::World) {
        if let Some(client) = self.clients.release(key) {
            log::debug!("client {key} disconnected");
            let _ = self.poller.delete(client.conn());
            world.logout(key);
        }
    }
}
