use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};
use wrmi_cdr::{
    CdrBuffer, MessageHeader, MessageType, ReplyHeader, ReplyStatus, RequestHeader, EYE_CATCHER,
    PROTOCOL_MAJOR,
};
use wrmi_transport::{ByteChannel, ProcessHandle, TransportError};

use crate::adapter::{invoke_servant, ObjectAdapter, AdapterError, Servant};
use crate::error::{OrbError, Result};
use crate::pool::{BufferPool, DEFAULT_BUFFER_CAPACITY};

/// Tunables for an ORB instance.
#[derive(Debug, Clone)]
pub struct OrbConfig {
    /// Bound on header-receive attempts while waiting for one reply.
    pub max_wait_attempts: u32,
    /// Capacity of freshly allocated pool buffers.
    pub buffer_capacity: usize,
    /// Grace period between the SHUTDOWN frame and a forced kill of the
    /// compiler process.
    pub shutdown_grace: Duration,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            max_wait_attempts: 1000,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Reply-routing record, keyed by request id in the waiter table.
#[derive(Default)]
struct Waiter {
    ready: bool,
    status: Option<ReplyStatus>,
    reply: Option<CdrBuffer>,
}

struct OrbInner {
    channel: Box<dyn ByteChannel>,
    pool: BufferPool,
    adapter: ObjectAdapter,
    waiters: HashMap<u32, Waiter>,
    next_request_id: u32,
    shutdown_requested: bool,
    process: Option<Box<dyn ProcessHandle>>,
    config: OrbConfig,
}

/// The object request broker.
///
/// Cheap to clone; all clones share one channel, pool, adapter and waiter
/// table. The ORB is single-threaded and cooperative: whoever waits on a
/// reply drains inbound traffic on their own thread, dispatching any
/// server-initiated requests that arrive in the meantime.
#[derive(Clone)]
pub struct Orb {
    inner: Rc<RefCell<OrbInner>>,
}

impl std::fmt::Debug for Orb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orb").finish_non_exhaustive()
    }
}

impl Orb {
    /// Build an ORB over a connected channel and run the validation
    /// handshake: receive one frame (checking the eye-catcher and major
    /// version), then send a VALIDATE frame of our own.
    pub fn connect(
        channel: Box<dyn ByteChannel>,
        process: Option<Box<dyn ProcessHandle>>,
        config: OrbConfig,
    ) -> Result<Self> {
        let pool = BufferPool::new(config.buffer_capacity);
        let orb = Self {
            inner: Rc::new(RefCell::new(OrbInner {
                channel,
                pool,
                adapter: ObjectAdapter::new(),
                waiters: HashMap::new(),
                next_request_id: 0,
                shutdown_requested: false,
                process,
                config,
            })),
        };
        orb.validate_peer()?;
        Ok(orb)
    }

    fn validate_peer(&self) -> Result<()> {
        let (header, buf) = self.read_frame()?;
        self.release_buffer(buf);
        if header.protocol_major != PROTOCOL_MAJOR {
            return Err(OrbError::Protocol(format!(
                "unsupported protocol version {}.{}",
                header.protocol_major, header.protocol_minor
            )));
        }
        debug!(
            major = header.protocol_major,
            minor = header.protocol_minor,
            "peer validated"
        );
        self.send_control_frame(MessageType::Validate)
    }

    /// Allocate the next request id. Wraps around; the waiter table keys on
    /// the full value.
    pub fn next_request_id(&self) -> u32 {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_request_id;
        inner.next_request_id = inner.next_request_id.wrapping_add(1);
        id
    }

    pub fn acquire_buffer(&self) -> CdrBuffer {
        self.inner.borrow_mut().pool.acquire()
    }

    pub fn release_buffer(&self, buf: CdrBuffer) {
        self.inner.borrow_mut().pool.release(buf);
    }

    /// Pool buffers currently checked out. Zero whenever no operation is in
    /// flight; tests use this as the leak detector.
    pub fn outstanding_buffers(&self) -> usize {
        self.inner.borrow().pool.outstanding()
    }

    pub fn add_servant(&self, servant: Rc<dyn Servant>, identity: &str) -> Result<()> {
        self.inner
            .borrow_mut()
            .adapter
            .add(servant, identity)
            .map_err(OrbError::Adapter)
    }

    pub fn add_servant_with_uuid(&self, servant: Rc<dyn Servant>) -> String {
        self.inner.borrow_mut().adapter.add_with_uuid(servant)
    }

    pub fn remove_servant(&self, identity: &str) -> Result<()> {
        self.inner
            .borrow_mut()
            .adapter
            .remove(identity)
            .map_err(OrbError::Adapter)
    }

    /// Whether a SHUTDOWN has been sent or received.
    pub fn is_shutdown_requested(&self) -> bool {
        self.inner.borrow().shutdown_requested
    }

    /// Finalize the reserved MessageHeader prefix of a request buffer and
    /// send it. The buffer's `position` must sit at the end of the payload.
    pub fn send_request(&self, buf: &mut CdrBuffer, message_type: MessageType) -> Result<()> {
        let end = buf.position();
        if end < MessageHeader::SIZE {
            return Err(OrbError::Protocol(
                "request buffer is missing its header prefix".to_string(),
            ));
        }
        let body_len = (end - MessageHeader::SIZE) as u32;
        buf.set_position(0)?;
        MessageHeader::new(message_type, body_len).write(buf);
        buf.set_position(end)?;
        buf.flip();
        let mut inner = self.inner.borrow_mut();
        inner.channel.send(buf)?;
        Ok(())
    }

    /// Insert a waiter before sending the request it belongs to.
    pub fn register_waiter(&self, request_id: u32) {
        self.inner
            .borrow_mut()
            .waiters
            .insert(request_id, Waiter::default());
    }

    /// Remove a waiter without consuming it, releasing any reply it holds.
    pub fn discard_waiter(&self, request_id: u32) {
        let waiter = self.inner.borrow_mut().waiters.remove(&request_id);
        if let Some(Waiter {
            reply: Some(buf), ..
        }) = waiter
        {
            self.release_buffer(buf);
        }
    }

    /// Drain inbound traffic until the registered waiter is ready, bounded
    /// by `max_wait_attempts`. The waiter is removed on every exit path; on
    /// success the caller owns the reply buffer (positioned past the reply
    /// header).
    pub fn wait_for_reply(&self, request_id: u32) -> Result<(ReplyStatus, CdrBuffer)> {
        let result = self.wait_until_ready(request_id);
        let waiter = self.inner.borrow_mut().waiters.remove(&request_id);
        match result {
            Ok(()) => {
                let waiter = waiter.ok_or_else(|| {
                    OrbError::Protocol(format!("waiter for request {request_id} vanished"))
                })?;
                match (waiter.status, waiter.reply) {
                    (Some(status), Some(reply)) => Ok((status, reply)),
                    _ => Err(OrbError::Protocol(format!(
                        "waiter for request {request_id} woke without a reply"
                    ))),
                }
            }
            Err(err) => {
                if let Some(Waiter {
                    reply: Some(buf), ..
                }) = waiter
                {
                    self.release_buffer(buf);
                }
                Err(err)
            }
        }
    }

    fn wait_until_ready(&self, request_id: u32) -> Result<()> {
        let max_attempts = self.inner.borrow().config.max_wait_attempts;
        for _ in 0..max_attempts {
            if self.waiter_ready(request_id) {
                return Ok(());
            }
            self.wait_for_and_perform_work()?;
        }
        if self.waiter_ready(request_id) {
            return Ok(());
        }
        Err(OrbError::Timeout {
            attempts: max_attempts,
        })
    }

    fn waiter_ready(&self, request_id: u32) -> bool {
        self.inner
            .borrow()
            .waiters
            .get(&request_id)
            .is_some_and(|w| w.ready)
    }

    /// Receive and process exactly one inbound frame.
    ///
    /// REPLY frames wake their waiter; REQUEST and ONEWAY frames are
    /// dispatched to the object adapter (REQUEST producing a reply frame);
    /// SHUTDOWN is acknowledged once; VALIDATE is accepted silently.
    pub fn wait_for_and_perform_work(&self) -> Result<()> {
        self.check_peer_alive()?;
        let (header, buf) = self.read_frame()?;
        match MessageType::from_wire(header.message_type) {
            Some(MessageType::Request) => self.handle_request(&header, buf, true),
            Some(MessageType::Oneway) => self.handle_request(&header, buf, false),
            Some(MessageType::Reply) => self.handle_reply(buf),
            Some(MessageType::Shutdown) => {
                self.release_buffer(buf);
                self.handle_shutdown_frame()
            }
            Some(MessageType::Validate) => {
                self.release_buffer(buf);
                Ok(())
            }
            None => {
                self.release_buffer(buf);
                Err(OrbError::Protocol(format!(
                    "unknown message type {}",
                    header.message_type
                )))
            }
        }
    }

    fn check_peer_alive(&self) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if let Some(process) = inner.process.as_mut() {
            if !process.is_alive() {
                let stderr = process.take_stderr();
                inner.shutdown_requested = true;
                return Err(OrbError::Transport(TransportError::PeerDied { stderr }));
            }
        }
        Ok(())
    }

    /// Read one frame: header, eye-catcher check, then the full body. The
    /// returned buffer is in read mode positioned at the body start.
    fn read_frame(&self) -> Result<(MessageHeader, CdrBuffer)> {
        let mut buf = self.acquire_buffer();
        match self.read_frame_into(&mut buf) {
            Ok(header) => Ok((header, buf)),
            Err(err) => {
                self.release_buffer(buf);
                Err(err)
            }
        }
    }

    fn read_frame_into(&self, buf: &mut CdrBuffer) -> Result<MessageHeader> {
        buf.clear();
        buf.set_limit(MessageHeader::SIZE)?;
        self.inner.borrow_mut().channel.recv(buf)?;
        buf.flip();
        let header = MessageHeader::read(buf)?;
        if header.eye_catcher != EYE_CATCHER {
            return Err(OrbError::Protocol(format!(
                "bad eye-catcher {:#010X}",
                header.eye_catcher
            )));
        }

        let body_len = header.message_length as usize;
        buf.clear();
        buf.reserve(body_len);
        buf.set_limit(body_len)?;
        if body_len > 0 {
            self.inner.borrow_mut().channel.recv(buf)?;
        }
        buf.flip();
        Ok(header)
    }

    fn handle_request(
        &self,
        header: &MessageHeader,
        mut request_buf: CdrBuffer,
        needs_reply: bool,
    ) -> Result<()> {
        let mut reply_buf = self.acquire_buffer();
        let result = self.dispatch_request(header, &mut request_buf, &mut reply_buf, needs_reply);
        self.release_buffer(request_buf);
        self.release_buffer(reply_buf);
        result
    }

    fn dispatch_request(
        &self,
        header: &MessageHeader,
        request_buf: &mut CdrBuffer,
        reply_buf: &mut CdrBuffer,
        needs_reply: bool,
    ) -> Result<()> {
        let request = RequestHeader::read(request_buf)?;
        debug!(
            object = %request.target_object,
            operation = %request.operation,
            request_id = request.request_id,
            needs_reply,
            "inbound request"
        );

        reply_buf.clear();
        reply_buf.set_position(MessageHeader::SIZE + ReplyHeader::SIZE)?;

        // The servant is pulled out before the call so a re-entrant stub
        // invocation inside the dispatcher can borrow the ORB again.
        let servant = {
            let inner = self.inner.borrow();
            inner.adapter.id_to_servant(&request.target_object)
        };
        let status = match servant {
            Ok(servant) => {
                invoke_servant(servant.as_ref(), &request.operation, request_buf, reply_buf)
            }
            Err(err) => {
                warn!(object = %request.target_object, %err, "dispatch to unknown object");
                write_adapter_fault(reply_buf, &err);
                ReplyStatus::SystemException
            }
        };

        if !needs_reply {
            return Ok(());
        }

        let end = reply_buf.position();
        let body_len = (end - MessageHeader::SIZE) as u32;
        reply_buf.set_position(0)?;
        let mut message_header = MessageHeader::new(MessageType::Reply, body_len);
        // Reserved flag bits from the request pass through unchanged.
        message_header.flags = header.flags;
        message_header.write(reply_buf);
        ReplyHeader::new(request.request_id, status).write(reply_buf);
        reply_buf.set_position(end)?;
        reply_buf.flip();
        let mut inner = self.inner.borrow_mut();
        inner.channel.send(reply_buf)?;
        Ok(())
    }

    fn handle_reply(&self, mut buf: CdrBuffer) -> Result<()> {
        let reply = match ReplyHeader::read(&mut buf) {
            Ok(reply) => reply,
            Err(err) => {
                self.release_buffer(buf);
                return Err(err.into());
            }
        };

        {
            let mut inner = self.inner.borrow_mut();
            if let Some(waiter) = inner.waiters.get_mut(&reply.request_id) {
                waiter.status = Some(reply.reply_status);
                waiter.reply = Some(buf);
                waiter.ready = true;
                return Ok(());
            }
        }
        debug!(request_id = reply.request_id, "orphan reply discarded");
        self.release_buffer(buf);
        Ok(())
    }

    fn handle_shutdown_frame(&self) -> Result<()> {
        let already = {
            let inner = self.inner.borrow();
            inner.shutdown_requested
        };
        if !already {
            debug!("peer requested shutdown; acknowledging");
            self.send_control_frame(MessageType::Shutdown)?;
        }
        self.inner.borrow_mut().shutdown_requested = true;
        Ok(())
    }

    /// Send a SHUTDOWN frame and retire the compiler process. Idempotent:
    /// later calls (and a SHUTDOWN already received) send nothing further.
    pub fn shutdown(&self) -> Result<()> {
        let already = {
            let mut inner = self.inner.borrow_mut();
            std::mem::replace(&mut inner.shutdown_requested, true)
        };
        if !already {
            debug!("sending shutdown");
            self.send_control_frame(MessageType::Shutdown)?;
        }

        let (process, grace) = {
            let mut inner = self.inner.borrow_mut();
            (inner.process.take(), inner.config.shutdown_grace)
        };
        if let Some(mut process) = process {
            process.wait_or_kill(grace);
        }
        Ok(())
    }

    fn send_control_frame(&self, message_type: MessageType) -> Result<()> {
        let mut buf = self.acquire_buffer();
        buf.clear();
        MessageHeader::new(message_type, 0).write(&mut buf);
        buf.flip();
        let result = {
            let mut inner = self.inner.borrow_mut();
            inner.channel.send(&buf)
        };
        self.release_buffer(buf);
        result.map_err(Into::into)
    }
}

fn write_adapter_fault(reply: &mut CdrBuffer, err: &AdapterError) {
    reply.write_string(err.type_id());
    reply.write_string(&err.to_string());
}
