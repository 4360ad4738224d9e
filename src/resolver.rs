//! Query resolution against a registry snapshot.
//!
//! Resolution is a pure function of the query and one [`Registry`]; it
//! knows nothing about the wire format. The authority converts the
//! resulting [`Answer`] into DNS records.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::registry::{NameEntry, Registry};

/// Query types the resolver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    /// IPv4 address.
    A,
    /// IPv6 address.
    Aaaa,
    /// Canonical name.
    Cname,
    /// Anything else; answered with an empty record set.
    Other,
}

/// Record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    /// IPv4 address record.
    A(Ipv4Addr),
    /// IPv6 address record.
    Aaaa(Ipv6Addr),
    /// Canonical name record; the target is fully qualified.
    Cname(String),
}

/// A single answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    /// Owner name, fully qualified.
    pub name: String,
    /// Time to live in seconds.
    pub ttl: u32,
    /// Record payload.
    pub data: RecordData,
}

/// Outcome of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// The name is not in the registry.
    NxDomain,
    /// The name exists; records may be empty.
    Records(Vec<AnswerRecord>),
}

impl Answer {
    /// Records in answer order (empty for NXDOMAIN).
    pub fn records(&self) -> &[AnswerRecord] {
        match self {
            Answer::NxDomain => &[],
            Answer::Records(records) => records,
        }
    }
}

/// Resolve `query_name` against `registry`.
///
/// Only the first label of `query_name` is used as the lookup key. Alias
/// entries are followed one hop: A/AAAA queries get the CNAME plus the
/// target's address, when the target is a host with that family.
pub fn resolve(
    registry: &Registry,
    query_name: &str,
    query_type: QueryType,
    domain: &str,
    ttl: u32,
) -> Answer {
    let short = query_name.split('.').next().unwrap_or_default();
    let short = short.to_ascii_lowercase();

    let Some(entry) = registry.get(&short) else {
        return Answer::NxDomain;
    };

    let mut records = Vec::with_capacity(2);
    match (entry, query_type) {
        (_, QueryType::Other) => {}

        (NameEntry::Alias { target }, qtype) => {
            let target_name = fqdn(target, domain);
            records.push(AnswerRecord {
                name: fqdn_query(query_name),
                ttl,
                data: RecordData::Cname(target_name.clone()),
            });

            // no second hop: the target must be a host to contribute an address
            if let Some(NameEntry::Host { ipv4, ipv6 }) = registry.get(target) {
                if let Some(data) = address_data(qtype, *ipv4, *ipv6) {
                    records.push(AnswerRecord {
                        name: target_name,
                        ttl,
                        data,
                    });
                }
            }
        }

        (NameEntry::Host { .. }, QueryType::Cname) => {}

        (NameEntry::Host { ipv4, ipv6 }, qtype) => {
            if let Some(data) = address_data(qtype, *ipv4, *ipv6) {
                records.push(AnswerRecord {
                    name: fqdn_query(query_name),
                    ttl,
                    data,
                });
            }
        }
    }

    Answer::Records(records)
}

fn address_data(
    query_type: QueryType,
    ipv4: Option<Ipv4Addr>,
    ipv6: Option<Ipv6Addr>,
) -> Option<RecordData> {
    match query_type {
        QueryType::A => ipv4.map(RecordData::A),
        QueryType::Aaaa => ipv6.map(RecordData::Aaaa),
        QueryType::Cname | QueryType::Other => None,
    }
}

fn fqdn(short: &str, domain: &str) -> String {
    format!("{}.{}.", short, domain.trim_matches('.'))
}

fn fqdn_query(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::DeviceRecord;

    const DOMAIN: &str = "ts.example.com";
    const TTL: u32 = 60;

    fn registry() -> Registry {
        let none: Vec<String> = Vec::new();
        Registry::build(
            &[
                DeviceRecord::new("host1.tailnetx", ["10.0.0.1", "fd00::1"], ["tag:cname-api"]),
                DeviceRecord::new("v6only.tailnetx", ["fd00::2"], ["tag:cname-six"]),
                DeviceRecord::new("v4only.tailnetx", ["10.0.0.3"], none.clone()),
            ],
            "cname-",
        )
    }

    fn a(name: &str, ip: &str) -> AnswerRecord {
        AnswerRecord {
            name: name.to_string(),
            ttl: TTL,
            data: RecordData::A(ip.parse().unwrap()),
        }
    }

    fn aaaa(name: &str, ip: &str) -> AnswerRecord {
        AnswerRecord {
            name: name.to_string(),
            ttl: TTL,
            data: RecordData::Aaaa(ip.parse().unwrap()),
        }
    }

    fn cname(name: &str, target: &str) -> AnswerRecord {
        AnswerRecord {
            name: name.to_string(),
            ttl: TTL,
            data: RecordData::Cname(target.to_string()),
        }
    }

    #[test]
    fn test_host_a() {
        let answer = resolve(&registry(), "host1.ts.example.com.", QueryType::A, DOMAIN, TTL);
        assert_eq!(
            answer,
            Answer::Records(vec![a("host1.ts.example.com.", "10.0.0.1")])
        );
    }

    #[test]
    fn test_host_aaaa() {
        let answer = resolve(&registry(), "host1.ts.example.com.", QueryType::Aaaa, DOMAIN, TTL);
        assert_eq!(
            answer,
            Answer::Records(vec![aaaa("host1.ts.example.com.", "fd00::1")])
        );
    }

    #[test]
    fn test_host_missing_family_is_empty_not_nxdomain() {
        let answer = resolve(&registry(), "v6only.ts.example.com.", QueryType::A, DOMAIN, TTL);
        assert_eq!(answer, Answer::Records(vec![]));

        let answer = resolve(&registry(), "v4only.ts.example.com.", QueryType::Aaaa, DOMAIN, TTL);
        assert_eq!(answer, Answer::Records(vec![]));
    }

    #[test]
    fn test_alias_a_returns_cname_and_address() {
        let answer = resolve(&registry(), "api.ts.example.com.", QueryType::A, DOMAIN, TTL);
        assert_eq!(
            answer,
            Answer::Records(vec![
                cname("api.ts.example.com.", "host1.ts.example.com."),
                a("host1.ts.example.com.", "10.0.0.1"),
            ])
        );
    }

    #[test]
    fn test_alias_aaaa_returns_cname_and_address() {
        let answer = resolve(&registry(), "api.ts.example.com.", QueryType::Aaaa, DOMAIN, TTL);
        assert_eq!(
            answer,
            Answer::Records(vec![
                cname("api.ts.example.com.", "host1.ts.example.com."),
                aaaa("host1.ts.example.com.", "fd00::1"),
            ])
        );
    }

    #[test]
    fn test_alias_to_target_without_family_is_cname_only() {
        let answer = resolve(&registry(), "six.ts.example.com.", QueryType::A, DOMAIN, TTL);
        assert_eq!(
            answer,
            Answer::Records(vec![cname("six.ts.example.com.", "v6only.ts.example.com.")])
        );
    }

    #[test]
    fn test_alias_cname_query() {
        let answer = resolve(&registry(), "api.ts.example.com.", QueryType::Cname, DOMAIN, TTL);
        assert_eq!(
            answer,
            Answer::Records(vec![cname("api.ts.example.com.", "host1.ts.example.com.")])
        );
    }

    #[test]
    fn test_cname_query_on_host_is_empty() {
        let answer = resolve(&registry(), "host1.ts.example.com.", QueryType::Cname, DOMAIN, TTL);
        assert_eq!(answer, Answer::Records(vec![]));
    }

    #[test]
    fn test_other_type_is_empty() {
        let answer = resolve(&registry(), "host1.ts.example.com.", QueryType::Other, DOMAIN, TTL);
        assert_eq!(answer, Answer::Records(vec![]));
        let answer = resolve(&registry(), "api.ts.example.com.", QueryType::Other, DOMAIN, TTL);
        assert_eq!(answer, Answer::Records(vec![]));
    }

    #[test]
    fn test_missing_name_is_nxdomain_for_every_type() {
        for qtype in [QueryType::A, QueryType::Aaaa, QueryType::Cname, QueryType::Other] {
            let answer = resolve(&registry(), "missing.ts.example.com.", qtype, DOMAIN, TTL);
            assert_eq!(answer, Answer::NxDomain, "{:?}", qtype);
        }
    }

    #[test]
    fn test_only_first_label_is_used() {
        let answer = resolve(&registry(), "host1.anything.else", QueryType::A, DOMAIN, TTL);
        assert_eq!(answer, Answer::Records(vec![a("host1.anything.else.", "10.0.0.1")]));
    }

    #[test]
    fn test_query_name_case_insensitive() {
        let answer = resolve(&registry(), "HOST1.ts.example.com.", QueryType::A, DOMAIN, TTL);
        assert_eq!(answer.records().len(), 1);
    }

    #[test]
    fn test_alias_does_not_follow_second_hop() {
        // "x" aliases host "a", then a later tag turns "a" into an alias of "b".
        let none: Vec<String> = Vec::new();
        let registry = Registry::build(
            &[
                DeviceRecord::new("a", ["10.0.0.1"], ["tag:cname-x"]),
                DeviceRecord::new("b", ["10.0.0.2"], ["tag:cname-a"]),
                DeviceRecord::new("c", ["10.0.0.3"], none),
            ],
            "cname-",
        );

        let answer = resolve(&registry, "x.ts.example.com.", QueryType::A, DOMAIN, TTL);
        assert_eq!(
            answer,
            Answer::Records(vec![cname("x.ts.example.com.", "a.ts.example.com.")])
        );
    }

    #[test]
    fn test_empty_registry_is_nxdomain() {
        let answer = resolve(&Registry::default(), "host1.ts.example.com.", QueryType::A, DOMAIN, TTL);
        assert_eq!(answer, Answer::NxDomain);
    }
}
