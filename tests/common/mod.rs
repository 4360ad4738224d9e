//! Shared test infrastructure for catalog and loopback integration tests.

#![allow(dead_code)]

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{Catalog, MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use tailnet_dns::config::DnsConfig;
use tailnet_dns::directory::DeviceRecord;
use tailnet_dns::registry::{Registry, RegistryStore};
use tailnet_dns::server::build_catalog;

// --- Constants ---

pub const DOMAIN: &str = "ts.example.com";
pub const ALIAS_PREFIX: &str = "cname-";
pub const TTL: u32 = 60;

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
///
/// The response is serialized via `MessageResponse::destructive_emit()` and
/// stored as raw wire-format bytes, then parsed back with `Message::from_vec()`.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message` for assertions.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        let info = response
            .destructive_emit(&mut encoder)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        Ok(info)
    }
}

// --- Config and registry builders ---

pub fn test_dns_config() -> DnsConfig {
    DnsConfig {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        domain: DOMAIN.to_string(),
        ttl: TTL,
    }
}

/// Accumulates directory devices in order, then installs them.
pub struct TestDirectory {
    devices: Vec<DeviceRecord>,
}

impl TestDirectory {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
        }
    }

    /// Add a device with the given addresses and tags.
    pub fn device(mut self, name: &str, addresses: &[&str], tags: &[&str]) -> Self {
        self.devices.push(DeviceRecord::new(
            name,
            addresses.iter().copied(),
            tags.iter().copied(),
        ));
        self
    }

    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.devices.clone()
    }

    /// Build and install into a fresh store.
    pub fn install(self) -> RegistryStore {
        let store = RegistryStore::new();
        store.install(Registry::build(&self.devices, ALIAS_PREFIX));
        store
    }
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Build a full `Request` as if it arrived over UDP.
pub fn build_request(name: &str, record_type: RecordType, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let mut decoder = BinDecoder::new(&bytes);
    let msg = MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest");
    let src: SocketAddr = "100.64.0.9:12345".parse().unwrap();
    Request::new(msg, src, Protocol::Udp)
}

pub fn catalog_for(store: RegistryStore) -> Catalog {
    build_catalog(test_dns_config(), store).expect("failed to build catalog")
}

// --- Response helpers ---

/// Execute a query through the catalog and return the parsed response.
pub async fn execute_query(
    catalog: &Catalog,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, id);
    let handler = TestResponseHandler::new();
    catalog.handle_request(&request, handler.clone()).await;
    handler.into_message()
}

pub fn fqdn(short: &str) -> Name {
    Name::from_ascii(format!("{}.{}.", short, DOMAIN)).unwrap()
}

pub fn extract_a(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(Ipv4Addr::from(*a)),
            _ => None,
        })
        .collect()
}

pub fn extract_aaaa(msg: &Message) -> Vec<Ipv6Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::AAAA(aaaa) => Some(Ipv6Addr::from(*aaaa)),
            _ => None,
        })
        .collect()
}

pub fn extract_cname(msg: &Message) -> Vec<Name> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::CNAME(cname) => Some(cname.0.clone()),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}
