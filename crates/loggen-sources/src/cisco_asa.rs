//! Cisco ASA firewall syslog generator.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use loggen_core::catalog::{EventGenerator, GeneratorError};
use loggen_core::types::Event;

use crate::common::{base_doc, extend, pick, pick_weighted, random_private_ip, random_public_ip};

pub const DATA_STREAM: &str = "logs-cisco_asa.log-default";

struct AsaMessage {
    id: &'static str,
    severity: u8,
    weight: u32,
    kind: &'static str,
    action: &'static str,
}

const ASA_MESSAGES: &[AsaMessage] = &[
    AsaMessage { id: "106001", severity: 2, weight: 5, kind: "Inbound TCP connection denied", action: "denied" },
    AsaMessage { id: "106006", severity: 2, weight: 5, kind: "Deny inbound UDP", action: "denied" },
    AsaMessage { id: "106007", severity: 2, weight: 3, kind: "Deny inbound UDP due to DNS", action: "denied" },
    AsaMessage { id: "106014", severity: 3, weight: 5, kind: "Deny inbound icmp", action: "denied" },
    AsaMessage { id: "106015", severity: 6, weight: 3, kind: "Deny TCP (no connection)", action: "denied" },
    AsaMessage { id: "106023", severity: 4, weight: 8, kind: "Deny by access-group", action: "denied" },
    AsaMessage { id: "106100", severity: 6, weight: 15, kind: "access-list permitted/denied", action: "allowed" },
    AsaMessage { id: "302013", severity: 6, weight: 20, kind: "Built inbound TCP connection", action: "allowed" },
    AsaMessage { id: "302014", severity: 6, weight: 10, kind: "Teardown TCP connection", action: "allowed" },
    AsaMessage { id: "302015", severity: 6, weight: 15, kind: "Built inbound UDP connection", action: "allowed" },
    AsaMessage { id: "302016", severity: 6, weight: 8, kind: "Teardown UDP connection", action: "allowed" },
    AsaMessage { id: "302020", severity: 6, weight: 3, kind: "Built inbound ICMP connection", action: "allowed" },
    AsaMessage { id: "302021", severity: 6, weight: 2, kind: "Teardown ICMP connection", action: "allowed" },
    AsaMessage { id: "305011", severity: 6, weight: 10, kind: "Built dynamic translation", action: "allowed" },
    AsaMessage { id: "305012", severity: 6, weight: 5, kind: "Teardown dynamic translation", action: "allowed" },
    AsaMessage { id: "313001", severity: 3, weight: 3, kind: "Denied ICMP type", action: "denied" },
    AsaMessage { id: "710003", severity: 6, weight: 5, kind: "TCP access permitted", action: "allowed" },
    AsaMessage { id: "733100", severity: 4, weight: 2, kind: "Threat detection rate exceeded", action: "alert" },
];

const INTERFACES: &[&str] = &["outside", "inside", "dmz", "management", "guest"];

const PROTOCOLS: &[&str] = &["TCP", "UDP", "ICMP", "GRE", "ESP"];

const FIREWALL_NAMES: &[&str] = &["ASA-FW-01", "ASA-FW-02", "ASA-EDGE-01", "ASA-CORE-01"];

const ACCESS_LISTS: &[&str] = &[
    "outside_access_in",
    "inside_access_out",
    "dmz_access_in",
    "global_policy",
];

// Destination ports grouped by traffic category.
const COMMON_PORTS: &[&[u16]] = &[
    &[80, 443, 8080, 8443],
    &[25, 110, 143, 465, 587, 993, 995],
    &[53],
    &[22],
    &[3389],
    &[1433, 1521, 3306, 5432, 27017],
    &[21, 23, 135, 139, 445, 389, 636, 88],
];

fn severity_name(code: u8) -> &'static str {
    match code {
        0 => "emergencies",
        1 => "alerts",
        2 => "critical",
        3 => "errors",
        4 => "warnings",
        5 => "notifications",
        6 => "informational",
        7 => "debugging",
        _ => "informational",
    }
}

pub struct CiscoAsa {
    rng: SmallRng,
}

pub fn new_log() -> Box<dyn EventGenerator> {
    Box::new(CiscoAsa {
        rng: SmallRng::from_entropy(),
    })
}

struct Connection {
    src_ip: String,
    src_port: u16,
    dst_ip: String,
    dst_port: u16,
    src_interface: &'static str,
    dst_interface: &'static str,
    protocol: &'static str,
}

impl CiscoAsa {
    fn sample_connection(
        rng: &mut SmallRng,
        msg: &AsaMessage,
    ) -> Result<Connection, GeneratorError> {
        let mut src_ip = random_public_ip(rng);
        let mut dst_ip = random_private_ip(rng);
        // Roughly a third of the traffic is outbound.
        if rng.gen_bool(0.3) {
            std::mem::swap(&mut src_ip, &mut dst_ip);
        }

        let category = *pick(rng, COMMON_PORTS)?;
        let dst_port = *pick(rng, category)?;
        let src_port = rng.gen_range(1024..=65535);

        let protocol = if msg.id.starts_with("302") {
            *pick(rng, &["TCP", "UDP"])?
        } else {
            *pick(rng, PROTOCOLS)?
        };

        let src_interface = *pick(rng, INTERFACES)?;
        let others: Vec<&'static str> = INTERFACES
            .iter()
            .copied()
            .filter(|i| *i != src_interface)
            .collect();
        let dst_interface = *pick(rng, &others)?;

        Ok(Connection {
            src_ip,
            src_port,
            dst_ip,
            dst_port,
            src_interface,
            dst_interface,
            protocol,
        })
    }

    fn build_message(rng: &mut SmallRng, msg: &AsaMessage, conn: &Connection) -> Result<String, GeneratorError> {
        let Connection {
            src_ip,
            src_port,
            dst_ip,
            dst_port,
            src_interface,
            dst_interface,
            protocol,
        } = conn;

        let text = match msg.id {
            "302013" | "302015" | "302020" => {
                let conn_id: u32 = rng.gen_range(100_000..=9_999_999);
                let direction = if *src_interface == "outside" { "inbound" } else { "outbound" };
                format!(
                    "%ASA-6-{}: Built {direction} {protocol} connection {conn_id} for \
                     {src_interface}:{src_ip}/{src_port} to {dst_interface}:{dst_ip}/{dst_port}",
                    msg.id
                )
            }
            "302014" | "302016" | "302021" => {
                let conn_id: u32 = rng.gen_range(100_000..=9_999_999);
                let duration = format!(
                    "{:02}:{:02}:{:02}",
                    rng.gen_range(0..24),
                    rng.gen_range(0..60),
                    rng.gen_range(0..60)
                );
                let bytes: u32 = rng.gen_range(100..=1_000_000);
                format!(
                    "%ASA-6-{}: Teardown {protocol} connection {conn_id} for \
                     {src_interface}:{src_ip}/{src_port} to {dst_interface}:{dst_ip}/{dst_port} \
                     duration {duration} bytes {bytes}",
                    msg.id
                )
            }
            "106023" => {
                let acl = *pick(rng, ACCESS_LISTS)?;
                format!(
                    "%ASA-4-{}: Deny {protocol} src {src_interface}:{src_ip}/{src_port} \
                     dst {dst_interface}:{dst_ip}/{dst_port} by access-group \"{acl}\"",
                    msg.id
                )
            }
            "106100" => {
                let acl = *pick(rng, ACCESS_LISTS)?;
                let verdict = if msg.action == "allowed" { "permitted" } else { "denied" };
                let hit_cnt: u32 = rng.gen_range(1..=1_000);
                format!(
                    "%ASA-6-{}: access-list {acl} {verdict} {protocol} \
                     {src_interface}/{src_ip}({src_port}) -> {dst_interface}/{dst_ip}({dst_port}) \
                     hit-cnt {hit_cnt}",
                    msg.id
                )
            }
            "305011" | "305012" => {
                let verb = if msg.id == "305011" { "Built" } else { "Teardown" };
                let global_ip = random_public_ip(rng);
                let global_port: u16 = rng.gen_range(1024..=65535);
                format!(
                    "%ASA-6-{}: {verb} dynamic {protocol} translation from \
                     {src_interface}:{src_ip}/{src_port} to {dst_interface}:{global_ip}/{global_port}",
                    msg.id
                )
            }
            "733100" => {
                let rate: u32 = rng.gen_range(100..=5_000);
                format!(
                    "%ASA-4-{}: [{}] drop rate exceeded. Current rate: {rate}/sec, trigger rate: 100/sec",
                    msg.id, msg.kind
                )
            }
            "710003" => format!(
                "%ASA-6-{}: {protocol} access permitted from {src_ip}/{src_port} \
                 to {dst_interface}:{dst_ip}/{dst_port}",
                msg.id
            ),
            _ => format!(
                "%ASA-{}-{}: {} from {src_ip} to {dst_ip} on interface {src_interface}",
                msg.severity, msg.id, msg.kind
            ),
        };
        Ok(text)
    }
}

impl EventGenerator for CiscoAsa {
    fn generate(&mut self) -> Result<Event, GeneratorError> {
        let rng = &mut self.rng;
        let msg = pick_weighted(rng, ASA_MESSAGES, |m| m.weight)?;
        let firewall = *pick(rng, FIREWALL_NAMES)?;
        let conn = Self::sample_connection(rng, msg)?;
        let message = Self::build_message(rng, msg, &conn)?;

        let transport_protocol = matches!(conn.protocol, "TCP" | "UDP");
        let mut doc = base_doc("cisco_asa.log", "cisco_asa");
        extend(
            &mut doc,
            json!({
                "host": { "name": firewall, "hostname": firewall },
                "observer": {
                    "name": firewall,
                    "product": "ASA",
                    "vendor": "Cisco",
                    "type": "firewall",
                },
                "source": {
                    "ip": &conn.src_ip,
                    "port": conn.src_port,
                    "address": &conn.src_ip,
                },
                "destination": {
                    "ip": &conn.dst_ip,
                    "port": conn.dst_port,
                    "address": &conn.dst_ip,
                },
                "network": {
                    "protocol": conn.protocol.to_lowercase(),
                    "transport": if transport_protocol { conn.protocol.to_lowercase() } else { "ip".to_string() },
                    "direction": if conn.src_interface == "outside" { "inbound" } else { "outbound" },
                },
                "event": {
                    "code": msg.id,
                    "action": msg.action,
                    "category": ["network"],
                    "type": ["connection", if msg.action == "allowed" { "allowed" } else { "denied" }],
                    "outcome": if msg.action == "allowed" { "success" } else { "failure" },
                    "severity": msg.severity,
                },
                "log": {
                    "level": severity_name(msg.severity),
                    "syslog": {
                        "severity": {
                            "code": msg.severity,
                            "name": severity_name(msg.severity),
                        },
                        "facility": { "code": 20, "name": "local4" },
                    },
                },
                "cisco": {
                    "asa": {
                        "message_id": msg.id,
                        "source_interface": conn.src_interface,
                        "destination_interface": conn.dst_interface,
                    },
                },
                "message": message,
            }),
        );

        Ok(Event::new(doc, DATA_STREAM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_the_asa_prefix_and_matching_code() {
        let mut generator = CiscoAsa {
            rng: SmallRng::seed_from_u64(23),
        };
        for _ in 0..100 {
            let event = generator.generate().unwrap();
            let doc = &event.doc;
            let code = doc["event"]["code"].as_str().unwrap();
            let message = doc["message"].as_str().unwrap();
            assert!(message.starts_with("%ASA-"), "{message}");
            assert!(message.contains(code), "{message} missing {code}");
        }
    }

    #[test]
    fn interfaces_are_always_distinct() {
        let mut generator = CiscoAsa {
            rng: SmallRng::seed_from_u64(23),
        };
        for _ in 0..100 {
            let event = generator.generate().unwrap();
            let asa = &event.doc["cisco"]["asa"];
            assert_ne!(asa["source_interface"], asa["destination_interface"]);
        }
    }

    #[test]
    fn denied_traffic_maps_to_a_failure_outcome() {
        let mut generator = CiscoAsa {
            rng: SmallRng::seed_from_u64(23),
        };
        for _ in 0..100 {
            let event = generator.generate().unwrap();
            let doc = &event.doc;
            let action = doc["event"]["action"].as_str().unwrap();
            let outcome = doc["event"]["outcome"].as_str().unwrap();
            assert_eq!(outcome == "success", action == "allowed");
        }
    }
}
