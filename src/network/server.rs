//! TCP Server
//!
//! Single-threaded reactor: one `mio::Poll` drives the listener and every
//! client socket.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mio::event::Event;
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token, Waker};
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::Config;
use crate::error::Result;
use crate::store::Store;

use super::Connection;

const LISTENER: Token = Token(0);
const WAKER: Token = Token(1);
const FIRST_CLIENT_TOKEN: usize = 2;

/// Requested listen backlog; the kernel clamps it to the platform maximum
const MAX_BACKLOG: i32 = i32::MAX;

/// Stops a running [`Server`] from another thread (or a signal handler)
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Ask the loop to exit and wake it if it is blocked in poll
    pub fn shutdown(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            tracing::warn!("Failed to wake event loop: {}", e);
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// TCP server for kvstore
pub struct Server {
    config: Config,

    store: Arc<Store>,

    /// Readiness multiplexer; `None` once shut down
    poll: Option<Poll>,

    /// Non-blocking, address-reusable listener; `None` once shut down
    listener: Option<TcpListener>,

    /// Live connections by token; removal happens only in `close_connection`
    connections: HashMap<Token, Connection>,

    next_token: usize,

    /// An accept failed before the backlog was drained; retry every tick
    pending_accept: bool,

    local_addr: SocketAddr,

    stop: Arc<AtomicBool>,

    waker: Arc<Waker>,
}

impl Server {
    /// Bind the listener and set up the event loop
    pub fn new(config: Config, store: Arc<Store>) -> Result<Self> {
        config.validate()?;
        let addr = config.socket_addr()?;

        let mut listener = bind_listener(addr)?;
        let local_addr = listener.local_addr()?;

        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER)?);

        tracing::info!("Server listening on {}", local_addr);

        Ok(Self {
            config,
            store,
            poll: Some(poll),
            listener: Some(listener),
            connections: HashMap::new(),
            next_token: FIRST_CLIENT_TOKEN,
            pending_accept: false,
            local_addr,
            stop: Arc::new(AtomicBool::new(false)),
            waker,
        })
    }

    /// Run the event loop until shutdown is requested (blocking)
    pub fn run(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(self.config.max_events);
        let timeout = Duration::from_millis(self.config.poll_timeout_ms);

        tracing::info!("Server running");

        while !self.stop.load(Ordering::SeqCst) {
            if let Err(e) = self.poll_once(&mut events, timeout) {
                self.shutdown();
                return Err(e.into());
            }
        }

        self.shutdown();
        Ok(())
    }

    /// One wait on the multiplexer plus dispatch of whatever it reported
    fn poll_once(&mut self, events: &mut Events, timeout: Duration) -> io::Result<()> {
        let Some(poll) = self.poll.as_mut() else {
            return Ok(());
        };

        if let Err(e) = poll.poll(events, Some(timeout)) {
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(e);
        }

        for event in events.iter() {
            match event.token() {
                LISTENER => self.accept_connections(),
                WAKER => {}
                token => self.handle_client(token, event),
            }
        }

        // The listener is edge-triggered: a backlog left behind by a failed
        // accept produces no new event
        if self.pending_accept {
            self.accept_connections();
        }

        Ok(())
    }

    /// Accept every pending connection
    fn accept_connections(&mut self) {
        loop {
            let Some(listener) = self.listener.as_ref() else {
                return;
            };

            match listener.accept() {
                Ok((stream, addr)) => self.register_connection(stream, addr),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.pending_accept = false;
                    return;
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if !self.pending_accept {
                        tracing::warn!("accept error, retrying next tick: {}", e);
                    }
                    self.pending_accept = true;
                    return;
                }
            }
        }
    }

    fn register_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        let Some(poll) = self.poll.as_ref() else {
            return;
        };

        let token = Token(self.next_token);
        self.next_token += 1;

        // mio hands out accepted sockets already in non-blocking mode
        let mut conn = Connection::new(stream, token, Arc::clone(&self.store), &self.config);
        if let Err(e) = conn.register(poll.registry()) {
            tracing::warn!("Failed to register {}: {}", addr, e);
            return;
        }

        self.connections.insert(token, conn);
        tracing::debug!(
            "New connection from {} ({:?}), total connections: {}",
            addr,
            token,
            self.connections.len()
        );
    }

    /// Route a readiness event to its connection
    fn handle_client(&mut self, token: Token, event: &Event) {
        let Some(poll) = self.poll.as_ref() else {
            return;
        };
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        let mut keep_open = true;

        if event.is_readable() {
            keep_open = conn.handle_readable();
        }

        if keep_open && (event.is_writable() || conn.has_pending_writes()) {
            keep_open = conn.handle_writable();
        }

        if event.is_error() || (event.is_read_closed() && event.is_write_closed()) {
            keep_open = false;
        }

        if keep_open {
            if let Err(e) = conn.update_interest(poll.registry()) {
                tracing::warn!("Failed to update interest for {}: {}", conn.peer_addr(), e);
                keep_open = false;
            }
        }

        if !keep_open {
            self.close_connection(token);
        }
    }

    /// Deregister and drop a connection, closing its socket
    fn close_connection(&mut self, token: Token) {
        let Some(mut conn) = self.connections.remove(&token) else {
            return;
        };

        if let Some(poll) = self.poll.as_ref() {
            if let Err(e) = conn.deregister(poll.registry()) {
                tracing::debug!("deregister {:?} failed: {}", token, e);
            }
        }

        tracing::debug!(
            "Closing connection {} ({:?}), remaining: {}",
            conn.peer_addr(),
            token,
            self.connections.len()
        );
    }

    /// Close every connection, then the multiplexer, then the listener
    ///
    /// Idempotent.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        if self.poll.is_none() && self.listener.is_none() {
            return;
        }

        let tokens: Vec<Token> = self.connections.keys().copied().collect();
        for token in tokens {
            self.close_connection(token);
        }

        drop(self.poll.take());
        drop(self.listener.take());

        tracing::info!("Server stopped");
    }

    /// Handle for stopping the loop from elsewhere
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            stop: Arc::clone(&self.stop),
            waker: Arc::clone(&self.waker),
        }
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Non-blocking listener with SO_REUSEADDR and the largest backlog allowed
fn bind_listener(addr: SocketAddr) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(MAX_BACKLOG)?;
    Ok(TcpListener::from_std(socket.into()))
}
