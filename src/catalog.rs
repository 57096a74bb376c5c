// Copyright (c) 2025 - Cowboy AI, Inc.

//! Resource Catalog Builder
//!
//! Produces the desired connection set for one cycle:
//!
//! ```text
//! computers ──► auto_template + hostname ──┐
//!                                          ├──► admit() ──► definitions
//! manual.connections (+ manual.defaults) ──┘       │
//!                                                  └──► anomalies
//! ```
//!
//! `admit()` enforces unique names (first definition wins, auto before
//! manual) and the presence of a `protocol` attribute. Attributes are put
//! in the form the store reads them back in, so an applied definition
//! compares equal to its stored row.
//!
//! Naming follows the DNS policy:
//!
//! | Policy        | Connection name       | `hostname` parameter |
//! |---------------|-----------------------|----------------------|
//! | `passthrough` | `dNSHostName`         | `dNSHostName`        |
//! | `resolve`     | `"{cn} - {ip}"`       | `ip`                 |

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::config::{DnsPolicy, ResourceRules};
use crate::domain::{
    canonical_attributes, DirectoryComputer, ResourceDefinition, ResourceId, ResourceSource, ResourceTemplate,
    HOSTNAME_PARAMETER, PROTOCOL_ATTRIBUTE,
};
use crate::errors::Anomaly;
use crate::inventory::DNS_HOSTNAME_ATTRIBUTE;
use crate::resolver::{HostResolver, ResolveError};

/// Resource name → destination id, read fresh from the store each cycle
pub type ResourceCatalog = BTreeMap<String, ResourceId>;

/// Output of one catalog build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogBuild {
    pub definitions: Vec<ResourceDefinition>,
    pub anomalies: Vec<Anomaly>,
}

impl CatalogBuild {
    fn admit(&mut self, seen: &mut BTreeSet<String>, definition: ResourceDefinition) {
        if definition.protocol().is_none() {
            self.anomalies.push(Anomaly::MissingAttribute {
                entity: definition.name,
                attribute: PROTOCOL_ATTRIBUTE.to_string(),
            });
            return;
        }
        if !seen.insert(definition.name.clone()) {
            self.anomalies.push(Anomaly::DuplicateResource {
                name: definition.name,
            });
            return;
        }
        self.definitions.push(definition);
    }

    /// Connection names in catalog order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }
}

/// Build the desired connection set
///
/// Only a nameserver transport failure aborts the build; every other problem
/// skips the affected computer or connection and is reported as an anomaly.
pub async fn build_catalog(
    computers: &[DirectoryComputer],
    rules: &ResourceRules,
    resolver: &dyn HostResolver,
) -> Result<CatalogBuild, ResolveError> {
    let mut build = CatalogBuild::default();
    let mut seen = BTreeSet::new();

    for computer in computers {
        let target = match &rules.dns_policy {
            DnsPolicy::Passthrough => passthrough_target(computer),
            DnsPolicy::Resolve { .. } => resolved_target(computer, resolver).await?,
        };
        match target {
            Ok((name, host)) => {
                let definition = auto_definition(computer, &rules.auto_template, name, host);
                build.admit(&mut seen, definition);
            }
            Err(anomaly) => build.anomalies.push(anomaly),
        }
    }

    for manual in &rules.manual.connections {
        let settings = if manual.use_defaults {
            rules.manual.defaults.merged_with(&manual.settings)
        } else {
            manual.settings.clone()
        };
        build.admit(
            &mut seen,
            ResourceDefinition {
                name: manual.name.clone(),
                source: ResourceSource::Manual,
                attributes: canonical_attributes(&settings.attributes),
                parameters: settings.parameters,
            },
        );
    }

    debug!(
        definitions = build.definitions.len(),
        anomalies = build.anomalies.len(),
        "Catalog built"
    );
    Ok(build)
}

fn passthrough_target(computer: &DirectoryComputer) -> Result<(String, String), Anomaly> {
    match &computer.dns_hostname {
        Some(host) => Ok((host.to_string(), host.to_string())),
        None => Err(Anomaly::MissingAttribute {
            entity: computer.dn.to_string(),
            attribute: DNS_HOSTNAME_ATTRIBUTE.to_string(),
        }),
    }
}

async fn resolved_target(
    computer: &DirectoryComputer,
    resolver: &dyn HostResolver,
) -> Result<Result<(String, String), Anomaly>, ResolveError> {
    let host = computer
        .dns_hostname
        .as_ref()
        .map(|h| h.as_str())
        .unwrap_or(computer.cn.as_str());

    match resolver.resolve_ipv4(host).await {
        Ok(ip) => Ok(Ok((format!("{} - {}", computer.cn, ip), ip.to_string()))),
        Err(e @ ResolveError::NotFound(_)) => Ok(Err(Anomaly::Unresolvable {
            host: host.to_string(),
            reason: e.to_string(),
        })),
        Err(e) => Err(e),
    }
}

fn auto_definition(
    computer: &DirectoryComputer,
    template: &ResourceTemplate,
    name: String,
    host: String,
) -> ResourceDefinition {
    let mut parameters = template.parameters.clone();
    parameters.insert(HOSTNAME_PARAMETER.to_string(), host);
    ResourceDefinition {
        name,
        source: ResourceSource::Auto {
            computer: computer.dn.clone(),
        },
        attributes: canonical_attributes(&template.attributes),
        parameters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManualResources;
    use crate::domain::{Hostname, ManualResource, SettingMap};
    use crate::reconcile::plan_resources;
    use crate::resolver::StaticResolver;
    use crate::store::StoredResource;
    use pretty_assertions::assert_eq;
    use std::net::Ipv4Addr;

    fn settings(pairs: &[(&str, &str)]) -> SettingMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn computer(cn: &str, host: Option<&str>) -> DirectoryComputer {
        DirectoryComputer::new(
            format!("CN={cn},OU=Servers,DC=corp"),
            cn,
            host.map(|h| Hostname::new(h).unwrap()),
        )
    }

    fn rules() -> ResourceRules {
        ResourceRules {
            auto_template: ResourceTemplate {
                attributes: settings(&[("protocol", "rdp")]),
                parameters: settings(&[("port", "3389"), ("security", "nla")]),
            },
            dns_policy: DnsPolicy::Passthrough,
            manual: ManualResources::default(),
        }
    }

    fn manual(name: &str, protocol: Option<&str>, use_defaults: bool) -> ManualResource {
        ManualResource {
            name: name.into(),
            use_defaults,
            settings: ResourceTemplate {
                attributes: protocol
                    .map(|p| settings(&[("protocol", p)]))
                    .unwrap_or_default(),
                parameters: settings(&[("hostname", "10.1.1.1")]),
            },
        }
    }

    #[tokio::test]
    async fn passthrough_names_connection_after_dns_hostname() {
        let build = build_catalog(
            &[computer("HOST1", Some("host1.example.com"))],
            &rules(),
            &StaticResolver::new(),
        )
        .await
        .unwrap();

        assert_eq!(build.definitions.len(), 1);
        let definition = &build.definitions[0];
        assert_eq!(definition.name, "host1.example.com");
        assert!(definition.is_auto());
        assert_eq!(
            definition.parameters,
            settings(&[
                ("hostname", "host1.example.com"),
                ("port", "3389"),
                ("security", "nla"),
            ])
        );
    }

    #[tokio::test]
    async fn passthrough_skips_computer_without_hostname() {
        let build = build_catalog(&[computer("NODNS", None)], &rules(), &StaticResolver::new())
            .await
            .unwrap();

        assert!(build.definitions.is_empty());
        assert_eq!(build.anomalies[0].kind(), "missing_attribute");
    }

    #[tokio::test]
    async fn resolve_policy_names_connection_after_cn_and_address() {
        let mut rules = rules();
        rules.dns_policy = DnsPolicy::Resolve {
            nameserver: "10.0.0.53".parse().unwrap(),
        };
        let resolver = StaticResolver::new()
            .with("host1.example.com", Ipv4Addr::new(10, 0, 0, 5))
            .with("NODNS", Ipv4Addr::new(10, 0, 0, 6));

        let build = build_catalog(
            &[
                computer("HOST1", Some("host1.example.com")),
                computer("NODNS", None),
                computer("GHOST", Some("ghost.example.com")),
            ],
            &rules,
            &resolver,
        )
        .await
        .unwrap();

        let names: Vec<_> = build.names().collect();
        assert_eq!(names, vec!["HOST1 - 10.0.0.5", "NODNS - 10.0.0.6"]);
        assert_eq!(build.definitions[0].parameters["hostname"], "10.0.0.5");
        assert_eq!(build.anomalies.len(), 1);
        assert_eq!(build.anomalies[0].kind(), "unresolvable");
    }

    #[tokio::test]
    async fn manual_connections_merge_defaults_unless_opted_out() {
        let mut rules = rules();
        rules.manual.defaults = ResourceTemplate {
            attributes: settings(&[("protocol", "ssh")]),
            parameters: settings(&[("port", "22")]),
        };
        rules.manual.connections = vec![
            manual("jump", None, true),
            manual("printer", Some("vnc"), false),
        ];

        let build = build_catalog(&[], &rules, &StaticResolver::new())
            .await
            .unwrap();

        assert_eq!(build.definitions.len(), 2);
        assert_eq!(build.definitions[0].protocol(), Some("ssh"));
        assert_eq!(build.definitions[0].parameters["port"], "22");
        assert_eq!(build.definitions[1].protocol(), Some("vnc"));
        assert!(!build.definitions[1].parameters.contains_key("port"));
    }

    #[tokio::test]
    async fn first_definition_wins_and_protocol_is_required() {
        let mut rules = rules();
        rules.manual.connections = vec![
            manual("host1.example.com", Some("ssh"), false),
            manual("noproto", None, false),
        ];

        let build = build_catalog(
            &[computer("HOST1", Some("host1.example.com"))],
            &rules,
            &StaticResolver::new(),
        )
        .await
        .unwrap();

        assert_eq!(build.definitions.len(), 1);
        assert!(build.definitions[0].is_auto());
        let kinds: Vec<_> = build.anomalies.iter().map(Anomaly::kind).collect();
        assert_eq!(kinds, vec!["duplicate_resource", "missing_attribute"]);
    }

    #[tokio::test]
    async fn identical_inputs_build_identical_catalogs() {
        let computers = [
            computer("HOST1", Some("host1.example.com")),
            computer("HOST2", Some("host2.example.com")),
        ];
        let first = build_catalog(&computers, &rules(), &StaticResolver::new())
            .await
            .unwrap();
        let second = build_catalog(&computers, &rules(), &StaticResolver::new())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn applied_attributes_plan_nothing_against_their_stored_row() {
        let mut rules = rules();
        rules.auto_template.attributes = settings(&[
            ("protocol", "rdp"),
            ("failover_only", "false"),
            ("proxy_encryption_method", "none"),
            ("max_connections", "04"),
        ]);
        let build = build_catalog(
            &[computer("HOST1", Some("host1.example.com"))],
            &rules,
            &StaticResolver::new(),
        )
        .await
        .unwrap();

        let stored = StoredResource {
            id: ResourceId(1),
            name: "host1.example.com".into(),
            attributes: settings(&[
                ("max_connections", "4"),
                ("protocol", "rdp"),
                ("proxy_encryption_method", "NONE"),
            ]),
            parameters: build.definitions[0].parameters.clone(),
        };

        assert_eq!(plan_resources(&build.definitions, &[stored]), vec![]);
    }
}
