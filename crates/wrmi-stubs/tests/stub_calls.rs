//! Stub-level exchanges against a scripted in-memory transport.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use wrmi_cdr::{CdrBuffer, MessageHeader, MessageType, ReplyHeader, ReplyStatus, RequestHeader};
use wrmi_orb::{Orb, OrbConfig, OrbError};
use wrmi_stubs::{ListingPage, LogLine, Session, WpsServer};
use wrmi_transport::{ByteChannel, TransportError};

type SentFrames = Rc<RefCell<Vec<Vec<u8>>>>;

struct ScriptedChannel {
    inbound: VecDeque<u8>,
    sent: SentFrames,
}

impl ByteChannel for ScriptedChannel {
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.sent.borrow_mut().push(bytes.to_vec());
        Ok(())
    }

    fn recv_exact(&mut self, out: &mut [u8]) -> Result<(), TransportError> {
        if self.inbound.len() < out.len() {
            return Err(TransportError::PrematureEof {
                expected: out.len(),
                got: self.inbound.len(),
            });
        }
        for slot in out.iter_mut() {
            *slot = self.inbound.pop_front().unwrap_or_default();
        }
        Ok(())
    }
}

fn frame(message_type: MessageType, write_body: impl FnOnce(&mut CdrBuffer)) -> Vec<u8> {
    let mut body = CdrBuffer::new();
    write_body(&mut body);
    body.flip();

    let mut out = CdrBuffer::new();
    MessageHeader::new(message_type, body.remaining() as u32).write(&mut out);
    out.write_bytes(body.as_slice());
    out.flip();
    out.as_slice().to_vec()
}

fn validate_frame() -> Vec<u8> {
    frame(MessageType::Validate, |_| {})
}

fn reply_frame(
    request_id: u32,
    status: ReplyStatus,
    write_body: impl FnOnce(&mut CdrBuffer),
) -> Vec<u8> {
    frame(MessageType::Reply, |b| {
        ReplyHeader::new(request_id, status).write(b);
        write_body(b);
    })
}

fn ok_reply(request_id: u32, write_body: impl FnOnce(&mut CdrBuffer)) -> Vec<u8> {
    reply_frame(request_id, ReplyStatus::NoException, write_body)
}

/// Connect an ORB whose peer will answer with the given reply frames.
fn scripted_orb(replies: Vec<Vec<u8>>) -> (Orb, SentFrames) {
    let mut inbound = validate_frame();
    for reply in replies {
        inbound.extend(reply);
    }
    let sent = Rc::new(RefCell::new(Vec::new()));
    let channel = ScriptedChannel {
        inbound: inbound.into(),
        sent: Rc::clone(&sent),
    };
    let orb = Orb::connect(Box::new(channel), None, OrbConfig::default()).unwrap();
    (orb, sent)
}

/// Decode the request header of a captured outbound frame.
fn decode_request(bytes: &[u8]) -> (MessageHeader, RequestHeader, CdrBuffer) {
    let mut buf = CdrBuffer::new();
    buf.write_bytes(bytes);
    buf.flip();
    let header = MessageHeader::read(&mut buf).unwrap();
    let request = RequestHeader::read(&mut buf).unwrap();
    (header, request, buf)
}

#[test]
fn create_session_round_trip() {
    let (orb, sent) = scripted_orb(vec![ok_reply(0, |b| b.write_string("sess-1"))]);
    let server = WpsServer::bootstrap(&orb);

    let session = server.create_session().unwrap();
    assert_eq!(session.identity(), "sess-1");

    let frames = sent.borrow();
    let (header, request, _args) = decode_request(&frames[1]);
    assert_eq!(header.message_type, MessageType::Request.as_wire());
    assert_eq!(request.request_id, 0);
    assert_eq!(request.target_object, "wpsserver");
    assert_eq!(request.future, "");
    assert_eq!(request.operation, "createSession");
    assert_eq!(request.flags, 0);

    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn user_exception_reply_decodes_to_typed_error() {
    // Literal reply body: "UserError" then reason "bad".
    let body: &[u8] = &[
        0x00, 0x00, 0x00, 0x09, 0x55, 0x73, 0x65, 0x72, 0x45, 0x72, 0x72, 0x6F, 0x72, 0x00, 0x00,
        0x00, 0x03, 0x62, 0x61, 0x64,
    ];
    let reply = {
        let mut out = CdrBuffer::new();
        let body_len = (ReplyHeader::SIZE + body.len()) as u32;
        MessageHeader::new(MessageType::Reply, body_len).write(&mut out);
        ReplyHeader::new(7, ReplyStatus::UserException).write(&mut out);
        out.write_bytes(body);
        out.flip();
        assert_eq!(body_len, 25);
        out.as_slice().to_vec()
    };

    let (orb, _sent) = scripted_orb(vec![reply]);
    // Burn ids 0..=6 so the next request is id 7.
    for _ in 0..7 {
        orb.next_request_id();
    }

    let server = WpsServer::bootstrap(&orb);
    let err = server.create_session().unwrap_err();
    match err {
        OrbError::User { exception, reason } => {
            assert_eq!(exception, "UserError");
            assert_eq!(reason, "bad");
        }
        other => panic!("expected user exception, got {other:?}"),
    }
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn server_shutdown_is_oneway() {
    let (orb, sent) = scripted_orb(vec![]);
    let server = WpsServer::bootstrap(&orb);

    server.shutdown().unwrap();

    let frames = sent.borrow();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[1][6], MessageType::Oneway.as_wire());
    let (_header, request, _args) = decode_request(&frames[1]);
    assert_eq!(request.operation, "shutdown");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn server_host_queries() {
    let (orb, _sent) = scripted_orb(vec![
        ok_reply(0, |b| b.write_string("stats01.example.com")),
        ok_reply(1, |b| b.write_string("Linux")),
    ]);
    let server = WpsServer::bootstrap(&orb);

    assert_eq!(server.dns_name().unwrap(), "stats01.example.com");
    assert_eq!(server.os_name().unwrap(), "Linux");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn session_init_with_options_marshals_pairs() {
    let (orb, sent) = scripted_orb(vec![ok_reply(0, |_| {})]);
    let session = Session::from_identity(&orb, "sess-1");

    let options = vec![
        ("memsize".to_string(), "2G".to_string()),
        ("encoding".to_string(), "utf-8".to_string()),
    ];
    session.init_with_options(&options).unwrap();

    let frames = sent.borrow();
    let (_header, request, mut args) = decode_request(&frames[1]);
    assert_eq!(request.target_object, "sess-1");
    assert_eq!(request.operation, "initWithOptions");
    assert_eq!(args.read_i32().unwrap(), 2);
    assert_eq!(args.read_string().unwrap(), "memsize");
    assert_eq!(args.read_string().unwrap(), "2G");
    assert_eq!(args.read_string().unwrap(), "encoding");
    assert_eq!(args.read_string().unwrap(), "utf-8");
    assert_eq!(args.remaining(), 0);
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn submit_text_returns_the_return_code() {
    let (orb, sent) = scripted_orb(vec![ok_reply(0, |b| b.write_i32(4))]);
    let session = Session::from_identity(&orb, "sess-1");

    let rc = session.submit_text("data a; x=1; run;").unwrap();
    assert_eq!(rc, 4);

    let (_header, request, mut args) = decode_request(&sent.borrow()[1]);
    assert_eq!(request.operation, "submitText");
    assert_eq!(args.read_string().unwrap(), "data a; x=1; run;");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn submit_lines_joins_with_newlines() {
    let (orb, sent) = scripted_orb(vec![ok_reply(0, |b| b.write_i32(0))]);
    let session = Session::from_identity(&orb, "sess-1");

    session.submit_lines(&["data a;", "x=1;", "run;"]).unwrap();

    let (_header, _request, mut args) = decode_request(&sent.borrow()[1]);
    assert_eq!(args.read_string().unwrap(), "data a;\nx=1;\nrun;");
}

#[test]
fn macro_variable_get_and_set() {
    let (orb, sent) = scripted_orb(vec![
        ok_reply(0, |_| {}),
        ok_reply(1, |b| b.write_string("WIN")),
    ]);
    let session = Session::from_identity(&orb, "sess-1");

    session.set_macro_variable("sysscp", "WIN").unwrap();
    assert_eq!(session.macro_variable("sysscp").unwrap(), "WIN");

    let frames = sent.borrow();
    let (_h, set_req, mut set_args) = decode_request(&frames[1]);
    assert_eq!(set_req.operation, "setMacroVariable");
    assert_eq!(set_args.read_string().unwrap(), "sysscp");
    assert_eq!(set_args.read_string().unwrap(), "WIN");

    let (_h, get_req, mut get_args) = decode_request(&frames[2]);
    assert_eq!(get_req.operation, "getMacroVariable");
    assert_eq!(get_args.read_string().unwrap(), "sysscp");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn libref_lookup_returns_none_for_null_identity() {
    let (orb, _sent) = scripted_orb(vec![
        ok_reply(0, |b| b.write_string("")),
        ok_reply(1, |b| b.write_string("libref-9")),
    ]);
    let session = Session::from_identity(&orb, "sess-1");

    assert!(session.libref("missing").unwrap().is_none());
    let libref = session.libref("work").unwrap().unwrap();
    assert_eq!(libref.identity(), "libref-9");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn assign_libref_marshals_all_three_arguments() {
    let (orb, sent) = scripted_orb(vec![ok_reply(0, |b| b.write_string("libref-2"))]);
    let session = Session::from_identity(&orb, "sess-1");

    let libref = session.assign_libref("mylib", "/data/projects", "wpd").unwrap();
    assert_eq!(libref.identity(), "libref-2");

    let (_h, request, mut args) = decode_request(&sent.borrow()[1]);
    assert_eq!(request.operation, "assignLibref");
    assert_eq!(args.read_string().unwrap(), "mylib");
    assert_eq!(args.read_string().unwrap(), "/data/projects");
    assert_eq!(args.read_string().unwrap(), "wpd");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn member_infos_decode_name_type_pairs() {
    let (orb, _sent) = scripted_orb(vec![ok_reply(0, |b| {
        b.write_i32(2);
        b.write_string("class");
        b.write_string("DATA");
        b.write_string("heights");
        b.write_string("VIEW");
    })]);
    let session_orb = orb.clone();
    let libref = wrmi_stubs::Libref::from_identity(&session_orb, "libref-1");

    let members = libref.member_infos().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].name, "class");
    assert_eq!(members[0].member_type, "DATA");
    assert_eq!(members[1].name, "heights");
    assert_eq!(members[1].member_type, "VIEW");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn dataset_metadata_and_close() {
    let (orb, sent) = scripted_orb(vec![
        ok_reply(0, |b| b.write_string("ds-5")),
        ok_reply(1, |b| b.write_i64(1_000_000)),
        ok_reply(2, |b| b.write_i32(12)),
        ok_reply(3, |_| {}),
    ]);
    let libref = wrmi_stubs::Libref::from_identity(&orb, "libref-1");

    let dataset = libref.open_dataset("class", "r").unwrap();
    assert_eq!(dataset.identity(), "ds-5");
    assert_eq!(dataset.nobs().unwrap(), 1_000_000);
    assert_eq!(dataset.nvars().unwrap(), 12);
    dataset.close().unwrap();

    let frames = sent.borrow();
    let (_h, open_req, mut open_args) = decode_request(&frames[1]);
    assert_eq!(open_req.operation, "openDataset");
    assert_eq!(open_args.read_string().unwrap(), "class");
    assert_eq!(open_args.read_string().unwrap(), "r");
    let (_h, close_req, _args) = decode_request(&frames[4]);
    assert_eq!(close_req.operation, "close");
    assert_eq!(close_req.target_object, "ds-5");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn log_lines_decode_typed_triples() {
    let (orb, sent) = scripted_orb(vec![
        ok_reply(0, |b| b.write_i64(3)),
        ok_reply(1, |b| {
            b.write_i32(0); // result code
            b.write_i32(3);
            for (kind, cc, text) in [
                (1u8, 0u8, "1    data a;"),
                (2, 0, "NOTE: The data set WORK.A has 1 observations."),
                (3, 1, "WARNING: Variable X is uninitialized."),
            ] {
                b.write_u8(kind);
                b.write_u8(cc);
                b.write_string(text);
            }
        }),
    ]);
    let log = wrmi_stubs::LogFile::from_identity(&orb, "log-1");

    assert_eq!(log.line_count().unwrap(), 3);
    let (rc, lines) = log.lines(0, 100).unwrap();
    assert_eq!(rc, 0);
    assert_eq!(
        lines[1],
        LogLine {
            kind: 2,
            carriage_control: 0,
            text: "NOTE: The data set WORK.A has 1 observations.".to_string(),
        }
    );

    let (_h, req, mut args) = decode_request(&sent.borrow()[2]);
    assert_eq!(req.operation, "getLines");
    assert_eq!(args.read_i64().unwrap(), 0);
    assert_eq!(args.read_i32().unwrap(), 100);
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn all_lines_pages_through_the_log() {
    let (orb, _sent) = scripted_orb(vec![
        ok_reply(0, |b| b.write_i64(2)),
        ok_reply(1, |b| {
            b.write_i32(0);
            b.write_i32(1);
            b.write_u8(1);
            b.write_u8(0);
            b.write_string("line one");
        }),
        ok_reply(2, |b| {
            b.write_i32(0);
            b.write_i32(1);
            b.write_u8(1);
            b.write_u8(0);
            b.write_string("line two");
        }),
    ]);
    let log = wrmi_stubs::LogFile::from_identity(&orb, "log-1");

    // Each getLines reply returns a single line, forcing a second fetch.
    let lines = log.all_lines().unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].text, "line one");
    assert_eq!(lines[1].text, "line two");
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn listing_page_decodes_or_reports_absent() {
    let (orb, sent) = scripted_orb(vec![
        ok_reply(0, |b| b.write_i64(1)),
        ok_reply(1, |b| {
            b.write_bool(true);
            b.write_i64(3);
            b.write_i32(2);
            b.write_string("The MEANS Procedure");
            b.write_string("  N   Mean   Std Dev");
        }),
        ok_reply(2, |b| b.write_bool(false)),
    ]);
    let listing = wrmi_stubs::ListingFile::from_identity(&orb, "listing-1");

    assert_eq!(listing.page_count().unwrap(), 1);
    let page = listing.page(0).unwrap();
    assert_eq!(
        page,
        Some(ListingPage {
            geometry_index: 3,
            lines: vec![
                "The MEANS Procedure".to_string(),
                "  N   Mean   Std Dev".to_string(),
            ],
        })
    );
    assert_eq!(listing.page(5).unwrap(), None);

    let (_h, req, mut args) = decode_request(&sent.borrow()[2]);
    assert_eq!(req.operation, "getPage");
    assert_eq!(args.read_i64().unwrap(), 0);
    assert_eq!(orb.outstanding_buffers(), 0);
}

#[test]
fn session_lifecycle_operations_target_the_session_identity() {
    let (orb, sent) = scripted_orb(vec![
        ok_reply(0, |_| {}),
        ok_reply(1, |b| b.write_string("log-1")),
        ok_reply(2, |b| b.write_string("listing-1")),
        ok_reply(3, |_| {}),
    ]);
    let session = Session::from_identity(&orb, "sess-1");

    session.init().unwrap();
    let log = session.open_log().unwrap();
    let listing = session.open_listing().unwrap();
    session.clear_listing_file().unwrap();

    assert_eq!(log.identity(), "log-1");
    assert_eq!(listing.identity(), "listing-1");

    let frames = sent.borrow();
    for (index, operation) in [
        (1, "init"),
        (2, "openLog"),
        (3, "openListing"),
        (4, "clearListingFile"),
    ] {
        let (_h, request, _args) = decode_request(&frames[index]);
        assert_eq!(request.target_object, "sess-1");
        assert_eq!(request.operation, operation);
    }
    assert_eq!(orb.outstanding_buffers(), 0);
}
