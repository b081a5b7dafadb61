//! Accept loop and per-connection handling.
//!
//! ```text
//! accept ─▶ registry.insert ─▶ spawn ─▶ read_line ─▶ parse ─▶ resolve ─▶ write
//!                                                                      │
//!                                          registry.remove ◀─ close ◀──┘
//! ```
//!
//! One thread runs the accept loop and every accepted connection gets its own
//! thread. The connection registry is the only state shared between them.
//! A peer that never sends a line feed keeps its thread blocked in `recv`
//! forever: there is no per-connection deadline.

use std::collections::HashSet;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::config::ServerSettings;
use crate::context::Context;
use crate::request::{parse_request, HttpError};
use crate::response::Response;
use crate::router::Router;
use crate::socket::{Socket, SocketError};


const MODULE: &str = "SERVER";


/// Set of client sockets currently being handled.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: Mutex<HashSet<Socket>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn clients(&self) -> MutexGuard<'_, HashSet<Socket>> {
        // The set stays consistent even if a holder panicked.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, socket: Socket) -> bool {
        self.clients().insert(socket)
    }

    pub fn remove(&self, socket: &Socket) -> bool {
        self.clients().remove(socket)
    }

    pub fn contains(&self, socket: &Socket) -> bool {
        self.clients().contains(socket)
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients().is_empty()
    }

    /// Shut down every registered socket and forget them. Returns how many there were.
    pub fn shutdown_all(&self) -> usize {
        let mut clients = self.clients();
        for client in clients.iter() {
            client.shutdown();
        }
        let count = clients.len();
        clients.clear();
        count
    }
}


struct Shared {
    name: String,
    router: Router,
    registry: ConnectionRegistry,
}

impl Shared {
    fn process(&self, ctx: &Context, line: &str) -> Response {
        let result = parse_request(line).and_then(|mut request| {
            info!("[{}] New Request [qid={}]: method: {}; uri: {}; version: {}",
                MODULE, ctx.qid, request.method, request.uri, request.version);
            self.router.resolve(&mut request, Response::new(&self.name))
        });

        match result {
            Ok(response) => response,
            Err(e) => {
                info!("[{}] Request [qid={}] failed: {}", MODULE, ctx.qid, e);
                Response::from_error(e, &self.name)
            }
        }
    }
}


/// Keeps a socket registered for as long as its handler runs.
///
/// Dropping the guard unregisters the socket and then closes it, on every
/// exit path of the handling thread, panics included.
struct ConnectionGuard {
    socket: Socket,
    shared: Arc<Shared>,
}

impl ConnectionGuard {
    fn register(socket: Socket, shared: Arc<Shared>) -> Self {
        shared.registry.insert(socket);
        Self { socket, shared }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        // Unregister first so `stop` never shuts down a descriptor that was
        // already released and possibly reused.
        self.shared.registry.remove(&self.socket);
        self.socket.close();
    }
}


pub struct Server {
    shared: Arc<Shared>,
    backlog: i32,
    listener: Option<Socket>,
    /// Stop flag of the running accept loop; a fresh one per `start`.
    stopping: Arc<AtomicBool>,
    accept_loop: Option<JoinHandle<()>>,
}

impl Server {
    pub fn new(router: Router, settings: &ServerSettings) -> Server {
        Server {
            shared: Arc::new(Shared {
                name: settings.name.clone(),
                router,
                registry: ConnectionRegistry::new(),
            }),
            backlog: settings.backlog,
            listener: None,
            stopping: Arc::new(AtomicBool::new(false)),
            accept_loop: None,
        }
    }

    /// Bind `port` and run the accept loop on its own thread.
    ///
    /// Returns once the socket listens; bind/listen failures are returned here.
    pub fn start(&mut self, port: u16) -> Result<(), SocketError> {
        if self.listener.is_some() {
            warn!("[{}] Server is already started", MODULE);
            return Ok(());
        }

        // A previous accept loop may still be draining; it owns its listener.
        self.wait();

        let listener = Socket::listen(port, self.backlog)?;
        let stopping = Arc::new(AtomicBool::new(false));

        let shared = Arc::clone(&self.shared);
        let flag = Arc::clone(&stopping);
        let handle = thread::Builder::new()
            .name("octopus-accept".to_string())
            .spawn(move || accept_loop(listener, shared, flag));

        match handle {
            Ok(handle) => {
                self.accept_loop = Some(handle);
                self.listener = Some(listener);
                self.stopping = stopping;
                info!("[{}] Started on port {}", MODULE, listener.local_port().unwrap_or(port));
                Ok(())
            }
            Err(e) => {
                listener.close();
                Err(SocketError::ListenFailed(e))
            }
        }
    }

    /// Wake the accept loop and shut down every live connection.
    ///
    /// The listening descriptor is released by the accept loop itself once it
    /// exits, so `wait` after `stop` guarantees the port is free again.
    /// Does not wait for connection threads to finish.
    pub fn stop(&mut self) {
        let listener = match self.listener.take() {
            Some(l) => l,
            None => return,
        };

        self.stopping.store(true, Ordering::SeqCst);
        listener.shutdown();

        let count = self.shared.registry.shutdown_all();
        info!("[{}] Stopped; {} connection(s) signalled", MODULE, count);
    }

    /// Block until the accept loop exits.
    pub fn wait(&mut self) {
        if let Some(handle) = self.accept_loop.take() {
            if handle.join().is_err() {
                error!("[{}] Accept loop panicked", MODULE);
            }
        }
    }

    pub fn local_port(&self) -> Option<u16> {
        self.listener.and_then(|l| l.local_port().ok())
    }

    pub fn active_connections(&self) -> usize {
        self.shared.registry.len()
    }
}


/// Owns `listener` until the loop ends, then closes it.
fn accept_loop(listener: Socket, shared: Arc<Shared>, stopping: Arc<AtomicBool>) {
    info!("[{}] Accepting clients", MODULE);

    while !stopping.load(Ordering::SeqCst) {
        let client = match listener.accept() {
            Ok(client) => client,
            Err(e) => {
                if stopping.load(Ordering::SeqCst) {
                    break;
                }
                error!("[{}] {}", MODULE, e);
                continue;
            }
        };

        let guard = ConnectionGuard::register(client, Arc::clone(&shared));
        if stopping.load(Ordering::SeqCst) {
            break;
        }

        // On spawn failure the closure, and the guard with it, is dropped.
        let spawned = thread::Builder::new()
            .name(format!("octopus-conn-{}", client.as_raw_fd()))
            .spawn(move || handle_connection(guard));
        if let Err(e) = spawned {
            error!("[{}] Could not spawn connection handler: {}", MODULE, e);
        }
    }

    listener.close();
    info!("[{}] Accept loop finished", MODULE);
}


fn handle_connection(guard: ConnectionGuard) {
    let client = guard.socket;
    let shared = &guard.shared;

    let peer = match client.peer_name() {
        Ok(addr) => addr.to_string(),
        Err(e) => {
            debug!("[{}] {}", MODULE, e);
            "unknown".to_string()
        }
    };
    let mut ctx = Context::new(peer);

    let response = match client.read_line() {
        Ok(line) => shared.process(&ctx, &line),
        Err(e) => {
            warn!("[{}] Reading request [qid={}] from {} failed: {}", MODULE, ctx.qid, ctx.peer, e);
            Response::from_error(HttpError::BadRequest, &shared.name)
        }
    };

    if let Err(e) = respond(&client, &mut ctx, &response) {
        error!("[{}] Responding to [qid={}] at {} failed: {}", MODULE, ctx.qid, ctx.peer, e);
    }
}


fn respond(client: &Socket, ctx: &mut Context, response: &Response) -> Result<(), SocketError> {
    let bytes = response.to_bytes();
    let result = client.write_all(&bytes);

    ctx.fix();
    info!("[{}] Respond to [qid={}]: time: {}ms; status: {}; sent: {} bytes",
        MODULE, ctx.qid, ctx.time_ms(), response.status_code, bytes.len());

    result
}
