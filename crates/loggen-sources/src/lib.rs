//! Built-in event generators for the supported log sources.
//!
//! Each module holds the weighted sample tables and document builders for one
//! source family; [`builtin_catalog`] wires them into the catalog the runtime
//! resolves `(source, dataset)` pairs against.

#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

pub mod cisco_asa;
mod common;
pub mod nginx;
pub mod windows;

use loggen_core::catalog::{Catalog, DatasetSpec, SourceSpec};

/// All sources and datasets this build knows how to generate.
pub fn builtin_catalog() -> Catalog {
    Catalog::new(vec![
        SourceSpec {
            source: "nginx",
            description: "NGINX web server access and error logs",
            datasets: vec![
                DatasetSpec {
                    dataset: "access",
                    description: "HTTP access logs in combined format",
                    data_stream: nginx::ACCESS_DATA_STREAM,
                    factory: nginx::new_access,
                },
                DatasetSpec {
                    dataset: "error",
                    description: "NGINX error log entries",
                    data_stream: nginx::ERROR_DATA_STREAM,
                    factory: nginx::new_error,
                },
            ],
        },
        SourceSpec {
            source: "windows",
            description: "Windows Event Log channels",
            datasets: vec![
                DatasetSpec {
                    dataset: "security",
                    description: "Security channel audit events",
                    data_stream: windows::SECURITY_DATA_STREAM,
                    factory: windows::new_security,
                },
                DatasetSpec {
                    dataset: "system",
                    description: "System channel service events",
                    data_stream: windows::SYSTEM_DATA_STREAM,
                    factory: windows::new_system,
                },
                DatasetSpec {
                    dataset: "application",
                    description: "Application channel crash and install events",
                    data_stream: windows::APPLICATION_DATA_STREAM,
                    factory: windows::new_application,
                },
            ],
        },
        SourceSpec {
            source: "cisco_asa",
            description: "Cisco ASA firewall syslog",
            datasets: vec![DatasetSpec {
                dataset: "log",
                description: "ASA connection and deny events",
                data_stream: cisco_asa::DATA_STREAM,
                factory: cisco_asa::new_log,
            }],
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_resolves_every_builtin_pair() {
        let catalog = builtin_catalog();
        assert_eq!(catalog.dataset_count(), 6);
        for (source, dataset) in [
            ("nginx", "access"),
            ("nginx", "error"),
            ("windows", "security"),
            ("windows", "system"),
            ("windows", "application"),
            ("cisco_asa", "log"),
        ] {
            let spec = catalog.resolve(source, dataset).unwrap();
            assert_eq!(
                spec.data_stream,
                format!("logs-{source}.{dataset}-default"),
                "{source}:{dataset}"
            );
        }
        assert!(catalog.resolve("nginx", "nope").is_none());
    }

    #[test]
    fn every_factory_produces_a_well_formed_document() {
        let catalog = builtin_catalog();
        for source in catalog.sources() {
            for dataset in &source.datasets {
                let mut generator = (dataset.factory)();
                let event = generator.generate().unwrap();
                assert_eq!(event.data_stream, dataset.data_stream);
                let doc = event.doc.as_object().unwrap();
                assert!(doc.contains_key("@timestamp"));
                assert!(doc["message"].as_str().is_some_and(|m| !m.is_empty()));
                assert_eq!(
                    doc["event"]["dataset"].as_str().unwrap(),
                    format!("{}.{}", source.source, dataset.dataset)
                );
                assert_eq!(doc["labels"]["synthetic"], true);
            }
        }
    }
}
