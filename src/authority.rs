//! Hickory DNS authority backed by the device registry.

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, AAAA, CNAME};
use hickory_proto::rr::{DNSClass, LowerName, Name, RData, Record, RecordSet, RecordType};
use hickory_server::authority::{
    Authority, LookupControlFlow, LookupError, LookupOptions, LookupRecords, MessageRequest,
    UpdateResult, ZoneType,
};
use hickory_server::server::RequestInfo;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::DnsConfig;
use crate::metrics::{self, QueryResult, Timer};
use crate::registry::RegistryStore;
use crate::resolver::{self, Answer, AnswerRecord, QueryType, RecordData};

impl From<RecordType> for QueryType {
    fn from(rtype: RecordType) -> Self {
        match rtype {
            RecordType::A => QueryType::A,
            RecordType::AAAA => QueryType::Aaaa,
            RecordType::CNAME => QueryType::Cname,
            _ => QueryType::Other,
        }
    }
}

/// Authority for the served domain, answering from the active registry.
pub struct TailnetAuthority {
    origin: LowerName,
    store: RegistryStore,
    config: Arc<DnsConfig>,
}

impl TailnetAuthority {
    /// Create a new authority for the given configuration and store.
    pub fn new(config: DnsConfig, store: RegistryStore) -> Result<Self, hickory_proto::ProtoError> {
        let origin = Name::from_ascii(format!("{}.", config.zone()))?.into();

        Ok(Self {
            origin,
            store,
            config: Arc::new(config),
        })
    }

    /// Convert resolver records into one record set per answer record,
    /// preserving order.
    fn build_record_sets(
        &self,
        records: &[AnswerRecord],
    ) -> Result<Vec<Arc<RecordSet>>, hickory_proto::ProtoError> {
        let mut sets = Vec::with_capacity(records.len());

        for answer in records {
            let name = Name::from_ascii(&answer.name)?;
            let rdata = match &answer.data {
                RecordData::A(ip) => RData::A(A::from(*ip)),
                RecordData::Aaaa(ip) => RData::AAAA(AAAA::from(*ip)),
                RecordData::Cname(target) => RData::CNAME(CNAME(Name::from_ascii(target)?)),
            };
            let rtype = rdata.record_type();

            let mut record = Record::from_rdata(name.clone(), answer.ttl, rdata);
            record.set_dns_class(DNSClass::IN);

            let mut record_set = RecordSet::new(name, rtype, 0);
            record_set.insert(record, 0);
            sets.push(Arc::new(record_set));
        }

        Ok(sets)
    }
}

#[async_trait]
impl Authority for TailnetAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        // The catalog asks for apex SOA/NS while assembling every response;
        // the zone publishes neither.
        if name == &self.origin && matches!(rtype, RecordType::SOA | RecordType::NS) {
            trace!(rtype = ?rtype, "apex lookup: not served");
            return LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)));
        }

        let timer = Timer::start();
        let rtype_str = format!("{:?}", rtype);
        let query_name = name.to_string();

        trace!(name = %query_name, rtype = ?rtype, "DNS lookup");

        let registry = self.store.snapshot();
        let answer = resolver::resolve(
            &registry,
            &query_name,
            QueryType::from(rtype),
            self.config.zone(),
            self.config.ttl,
        );

        let records = match answer {
            Answer::NxDomain => {
                debug!(name = %query_name, "lookup: name not in registry");
                metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
                return LookupControlFlow::Break(Err(LookupError::ResponseCode(
                    ResponseCode::NXDomain,
                )));
            }
            Answer::Records(records) if records.is_empty() => {
                debug!(name = %query_name, rtype = ?rtype, "lookup: no records of this type");
                metrics::record_query(&rtype_str, QueryResult::Empty, timer.elapsed());
                return LookupControlFlow::Break(Err(LookupError::ResponseCode(
                    ResponseCode::NoError,
                )));
            }
            Answer::Records(records) => records,
        };

        match self.build_record_sets(&records) {
            Ok(sets) => {
                debug!(name = %query_name, rtype = ?rtype, count = sets.len(), "lookup: returning records");
                metrics::record_query(&rtype_str, QueryResult::Success, timer.elapsed());
                LookupControlFlow::Break(Ok(LookupRecords::many(lookup_options, sets)))
            }
            Err(e) => {
                warn!(name = %query_name, error = %e, "lookup: registry name is not a valid DNS name");
                metrics::record_query(&rtype_str, QueryResult::Error, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::ServFail)))
            }
        }
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        self.lookup(
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        // DNSSEC not supported
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        // Dynamic updates not supported
        Err(ResponseCode::NotImp)
    }
}
