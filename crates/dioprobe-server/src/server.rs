//! Event loop.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token, Waker};
use prometheus::Registry;
use tracing::{debug, error, info, warn};

use crate::connection::{Connection, Ready};
use crate::error::{ServerError, ServerResult};
use crate::http;
use crate::scrape::ScrapeWorker;

const LISTENER_TOKEN: Token = Token(0);
const SIGNAL_TOKEN: Token = Token(1);
const WAKER_TOKEN: Token = Token(2);
const FIRST_CONNECTION_TOKEN: usize = 3;

/// Upper bound on simultaneously open client connections.
const MAX_CONNECTIONS: usize = 256;

/// Stops a running [`Server`] from another thread.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    waker: Arc<Waker>,
}

impl ShutdownHandle {
    /// Asks the event loop to exit after the current iteration.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        if let Err(e) = self.waker.wake() {
            warn!("failed to wake event loop for shutdown: {e}");
        }
    }
}

/// HTTP server for the probe endpoints.
pub struct Server {
    poll: Poll,
    listener: TcpListener,
    local_addr: SocketAddr,
    scrapes: ScrapeWorker,
    connections: HashMap<Token, Connection>,
    next_token: usize,
    shutdown: Arc<AtomicBool>,
    waker: Arc<Waker>,
    #[cfg(unix)]
    signals: Option<signal_hook_mio::v1_0::Signals>,
}

impl Server {
    /// Binds the listener. `/metrics` will render `registry` on the scrape
    /// worker thread.
    pub fn bind(addr: SocketAddr, registry: Registry) -> ServerResult<Self> {
        let poll = Poll::new()?;
        let mut listener =
            TcpListener::bind(addr).map_err(|source| ServerError::BindFailed { addr, source })?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;
        let local_addr = listener.local_addr()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKER_TOKEN)?);
        let scrapes = ScrapeWorker::spawn(registry, Arc::clone(&waker))?;

        info!("HTTP endpoint listening on {local_addr}");
        Ok(Self {
            poll,
            listener,
            local_addr,
            scrapes,
            connections: HashMap::new(),
            next_token: FIRST_CONNECTION_TOKEN,
            shutdown: Arc::new(AtomicBool::new(false)),
            waker,
            #[cfg(unix)]
            signals: None,
        })
    }

    /// Binds the listener and stops on SIGINT or SIGTERM.
    pub fn with_signal_handling(addr: SocketAddr, registry: Registry) -> ServerResult<Self> {
        #[allow(unused_mut)]
        let mut server = Self::bind(addr, registry)?;

        #[cfg(unix)]
        {
            use signal_hook::consts::{SIGINT, SIGTERM};

            let mut signals = signal_hook_mio::v1_0::Signals::new([SIGINT, SIGTERM])
                .map_err(ServerError::Signal)?;
            server
                .poll
                .registry()
                .register(&mut signals, SIGNAL_TOKEN, Interest::READABLE)
                .map_err(ServerError::Signal)?;
            server.signals = Some(signals);
        }

        Ok(server)
    }

    /// Returns the bound address (useful when binding port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a handle that stops [`Server::run`].
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
            waker: Arc::clone(&self.waker),
        }
    }

    /// Serves requests until shutdown is requested.
    pub fn run(&mut self) -> ServerResult<()> {
        let mut events = Events::with_capacity(128);

        while !self.shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(e.into());
            }

            for event in &events {
                match event.token() {
                    LISTENER_TOKEN => self.accept(),
                    SIGNAL_TOKEN => self.handle_signals(),
                    WAKER_TOKEN => self.complete_scrapes(),
                    token => self.handle_connection(token),
                }
            }
        }

        info!("HTTP endpoint on {} shut down", self.local_addr);
        Ok(())
    }

    fn accept(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    if self.connections.len() >= MAX_CONNECTIONS {
                        warn!("connection limit reached, dropping {addr}");
                        continue;
                    }
                    let token = Token(self.next_token);
                    self.next_token = self.next_token.wrapping_add(1).max(FIRST_CONNECTION_TOKEN);

                    if let Err(e) = self.poll.registry().register(
                        &mut stream,
                        token,
                        Interest::READABLE | Interest::WRITABLE,
                    ) {
                        warn!("failed to register connection from {addr}: {e}");
                        continue;
                    }
                    debug!("HTTP connection from {addr}");
                    self.connections.insert(token, Connection::new(stream));
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    error!("HTTP accept error: {e}");
                    break;
                }
            }
        }
    }

    fn handle_connection(&mut self, token: Token) {
        let Some(conn) = self.connections.get_mut(&token) else {
            return;
        };

        let ready = match conn.on_ready() {
            Ok(Ready::Metrics) if self.scrapes.submit(token) => Ok(Ready::Open),
            Ok(Ready::Metrics) => {
                error!("scrape worker is gone, failing /metrics");
                conn.respond(&http::http_response(500, "text/plain", "Internal Server Error"))
            }
            other => other,
        };
        self.settle(token, ready);
    }

    /// Hands finished renders to their connections.
    fn complete_scrapes(&mut self) {
        let completed: Vec<_> = self.scrapes.completed().collect();
        for (token, response) in completed {
            // The client may have hung up while the probe ran.
            let Some(conn) = self.connections.get_mut(&token) else {
                continue;
            };
            let ready = conn.respond(&response);
            self.settle(token, ready);
        }
    }

    fn settle(&mut self, token: Token, ready: io::Result<Ready>) {
        let keep = match ready {
            Ok(ready) => ready != Ready::Closed,
            Err(e) => {
                debug!("HTTP connection error: {e}");
                false
            }
        };

        if !keep {
            if let Some(mut conn) = self.connections.remove(&token) {
                let _ = self.poll.registry().deregister(&mut conn.stream);
            }
        }
    }

    #[cfg(unix)]
    fn handle_signals(&mut self) {
        if let Some(signals) = self.signals.as_mut() {
            for signal in signals.pending() {
                info!(signal, "received shutdown signal");
                self.shutdown.store(true, Ordering::SeqCst);
            }
        }
    }

    #[cfg(not(unix))]
    fn handle_signals(&mut self) {}
}
